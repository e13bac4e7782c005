//! Deterministic stand-in for the simulator.
//!
//! The robot stands until `fall_tick`, then lands according to the scenario.
//! Get-up clips put it back on its feet two thirds of the way through, and a pushed-out
//! shoulder rolls a robot lying on its side onto its back.

use std::collections::{BTreeMap, HashMap};

use biped_lib::{ControlError, JointActuator, LegSide, MotionPlayer, Result, SensorSource};
use clap::ValueEnum;
use nalgebra::Vector3;
use tracing::debug;

const GRAVITY: f64 = 9.81;
const ROBOT_MASS: f64 = 5.305;
/// Ticks between the shoulder push and the robot landing on its back.
const ROLL_OVER_TICKS: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Walk,
    FrontFall,
    BackFall,
    SideFall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Posture {
    Upright,
    OnFront,
    OnBack,
    OnLeftSide,
}

#[derive(Debug, Clone)]
struct Clip {
    length: u64,
    looped: bool,
    elapsed: Option<u64>,
    over: bool,
}

impl Clip {
    fn new(length: u64) -> Self {
        Self {
            length,
            looped: false,
            elapsed: None,
            over: false,
        }
    }
}

pub struct ScriptedRobot {
    scenario: Scenario,
    fall_tick: u64,
    tick: u64,
    posture: Posture,
    pushed_at: Option<u64>,
    clips: HashMap<String, Clip>,
    joints: BTreeMap<String, f64>,
}

impl ScriptedRobot {
    pub fn new(scenario: Scenario, fall_tick: u64) -> Result<Self> {
        let mut robot = Self {
            scenario,
            fall_tick,
            tick: 0,
            posture: Posture::Upright,
            pushed_at: None,
            clips: HashMap::new(),
            joints: BTreeMap::new(),
        };
        for (name, length) in [("GetUpFront", 90), ("GetUpBack", 110), ("Stand", 30), ("ForwardLoop", 40)] {
            robot.clips.insert(name.to_string(), Clip::new(length));
            // Clips named *Loop repeat until stopped
            robot.set_loop(name, name.ends_with("Loop"))?;
        }
        Ok(robot)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Last position commanded to every joint.
    pub fn joints(&self) -> &BTreeMap<String, f64> {
        &self.joints
    }

    /// Advances the world by one control tick.
    pub fn step(&mut self) {
        self.tick += 1;

        if self.tick == self.fall_tick {
            self.posture = match self.scenario {
                Scenario::Walk => Posture::Upright,
                Scenario::FrontFall => Posture::OnFront,
                Scenario::BackFall => Posture::OnBack,
                Scenario::SideFall => Posture::OnLeftSide,
            };
            debug!("Scripted robot now {:?}", self.posture);
        }

        if let Some(pushed) = self.pushed_at {
            if self.posture == Posture::OnLeftSide && self.tick >= pushed + ROLL_OVER_TICKS {
                self.posture = Posture::OnBack;
                self.pushed_at = None;
                debug!("Scripted robot rolled onto its back");
            }
        }

        let mut standing_up = false;
        for (name, clip) in &mut self.clips {
            let Some(elapsed) = clip.elapsed.as_mut() else {
                continue;
            };
            *elapsed += 1;
            // The body is upright well before a get-up clip ends
            if name.starts_with("GetUp") && *elapsed * 3 >= clip.length * 2 {
                standing_up = true;
            }
            if *elapsed >= clip.length {
                if clip.looped {
                    *elapsed = 0;
                } else {
                    clip.elapsed = None;
                    clip.over = true;
                }
            }
        }
        if standing_up && self.posture != Posture::Upright {
            debug!("Scripted robot back on its feet");
            self.posture = Posture::Upright;
        }
    }
}

impl SensorSource for ScriptedRobot {
    fn accelerometer(&self) -> Vector3<f64> {
        // Raw frame: the sensor is mounted upside down about x
        match self.posture {
            Posture::Upright => Vector3::new(0.0, 0.0, -GRAVITY),
            Posture::OnFront => Vector3::new(-GRAVITY, 0.0, 0.0),
            Posture::OnBack => Vector3::new(GRAVITY, 0.0, 0.0),
            Posture::OnLeftSide => Vector3::new(0.0, GRAVITY, 0.0),
        }
    }

    fn gyroscope(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn foot_force(&self, _side: LegSide) -> Vector3<f64> {
        match self.posture {
            Posture::Upright => Vector3::new(0.0, 0.0, ROBOT_MASS * GRAVITY / 2.0),
            _ => Vector3::zeros(),
        }
    }
}

impl JointActuator for ScriptedRobot {
    fn set_position(&mut self, joint: &str, angle: f64) {
        if joint.ends_with("ShoulderRoll") && self.pushed_at.is_none() {
            self.pushed_at = Some(self.tick);
        }
        self.joints.insert(joint.to_string(), angle);
    }
}

impl MotionPlayer for ScriptedRobot {
    fn play(&mut self, clip: &str) -> Result<()> {
        let state = self.clip_mut(clip)?;
        state.elapsed = Some(0);
        state.over = false;
        Ok(())
    }

    fn stop(&mut self, clip: &str) -> Result<()> {
        self.clip_mut(clip)?.elapsed = None;
        Ok(())
    }

    fn set_loop(&mut self, clip: &str, looped: bool) -> Result<()> {
        self.clip_mut(clip)?.looped = looped;
        Ok(())
    }

    fn is_over(&self, clip: &str) -> Result<bool> {
        self.clips
            .get(clip)
            .map(|state| state.over)
            .ok_or_else(|| ControlError::UnknownClip(clip.to_string()))
    }
}

impl ScriptedRobot {
    fn clip_mut(&mut self, clip: &str) -> Result<&mut Clip> {
        self.clips
            .get_mut(clip)
            .ok_or_else(|| ControlError::UnknownClip(clip.to_string()))
    }
}
