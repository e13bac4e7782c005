//! Fall detection and recovery.
//!
//! The detector watches the smoothed accelerometer. A sustained reading past
//! the threshold on the forward axis means the robot lies on its front or
//! back and a get-up clip is started. A lateral reading means it lies on its
//! side; the matching shoulder is pushed out so the robot rolls onto its
//! back, after which the forward axis takes over.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::control::CurrentMotion;
use crate::error::{ControlError, Result};
use crate::types::{FallDetectionConfig, JointActuator, MotionPlayer, Smoothing};
use crate::utils::{LowPassFilter, VectorAverage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallState {
    NoFall,
    /// A recovery clip owns the body.
    BlockingMotion,
    FrontFall,
    BackFall,
    SideFall,
}

impl FallState {
    pub const ALL: [FallState; 5] = [
        FallState::NoFall,
        FallState::BlockingMotion,
        FallState::FrontFall,
        FallState::BackFall,
        FallState::SideFall,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::NoFall => "NO_FALL",
            Self::BlockingMotion => "BLOCKING_MOTION",
            Self::FrontFall => "FRONT_FALL",
            Self::BackFall => "BACK_FALL",
            Self::SideFall => "SIDE_FALL",
        }
    }
}

impl fmt::Display for FallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FallState {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.label() == s)
            .ok_or_else(|| ControlError::UnknownState(s.to_string()))
    }
}

enum AccelerationFilter {
    LowPass(LowPassFilter<Vector3<f64>>),
    Window(VectorAverage),
}

impl AccelerationFilter {
    fn new(smoothing: &Smoothing) -> Self {
        match *smoothing {
            Smoothing::LowPass { retain } => Self::LowPass(LowPassFilter::new(retain)),
            Smoothing::Window { steps } => Self::Window(VectorAverage::new(steps)),
        }
    }

    fn update(&mut self, sample: Vector3<f64>) -> Vector3<f64> {
        match self {
            Self::LowPass(filter) => filter.update(sample),
            Self::Window(average) => average.update(sample),
        }
    }
}

pub struct FallDetector {
    config: FallDetectionConfig,
    filter: AccelerationFilter,
    state: FallState,
    smoothed: Vector3<f64>,
    motion: CurrentMotion,
}

impl FallDetector {
    pub fn new(config: FallDetectionConfig) -> Self {
        let filter = AccelerationFilter::new(&config.smoothing);
        Self {
            config,
            filter,
            state: FallState::NoFall,
            smoothed: Vector3::zeros(),
            motion: CurrentMotion::new(),
        }
    }

    pub fn state(&self) -> FallState {
        self.state
    }

    /// Smoothed accelerometer reading used by the last update.
    pub fn smoothed(&self) -> &Vector3<f64> {
        &self.smoothed
    }

    pub fn current_motion(&self) -> &CurrentMotion {
        &self.motion
    }

    /// Runs one tick of the detector and returns the resulting state.
    ///
    /// Never blocks: while a recovery clip plays, each call only checks
    /// whether it has finished.
    pub fn update<R>(&mut self, acceleration: Vector3<f64>, robot: &mut R) -> Result<FallState>
    where
        R: JointActuator + MotionPlayer + ?Sized,
    {
        self.smoothed = self.filter.update(acceleration);

        match self.state {
            FallState::NoFall => self.detect(robot),
            FallState::FrontFall => {
                let clip = self.config.front_recovery_clip.clone();
                self.start_recovery(&clip, robot)?;
            }
            FallState::BackFall => {
                let clip = self.config.back_recovery_clip.clone();
                self.start_recovery(&clip, robot)?;
            }
            FallState::SideFall => match self.config.side_fall_clip.clone() {
                Some(clip) => self.start_recovery(&clip, robot)?,
                None => self.detect(robot),
            },
            FallState::BlockingMotion => {
                if self.motion.is_over(robot)? {
                    let stand = self.config.stand_clip.clone();
                    self.motion.set(&stand, robot)?;
                    self.transition_to(FallState::NoFall);
                }
            }
        }

        Ok(self.state)
    }

    fn detect<R: JointActuator + ?Sized>(&mut self, actuator: &mut R) {
        let threshold = self.config.threshold;
        let push = self.config.shoulder_push_angle;
        let (x, y) = (self.smoothed.x, self.smoothed.y);

        if x < -threshold {
            self.transition_to(FallState::FrontFall);
        } else if x > threshold {
            self.transition_to(FallState::BackFall);
        }

        // Lying on a side: push with the lower shoulder to roll onto the back
        if y < -threshold {
            actuator.set_position("RShoulderRoll", -push);
            self.transition_to(FallState::SideFall);
        } else if y > threshold {
            actuator.set_position("LShoulderRoll", push);
            self.transition_to(FallState::SideFall);
        }
    }

    fn start_recovery<P: MotionPlayer + ?Sized>(&mut self, clip: &str, player: &mut P) -> Result<()> {
        self.motion.set(clip, player)?;
        self.transition_to(FallState::BlockingMotion);
        Ok(())
    }

    fn transition_to(&mut self, next: FallState) {
        if next == self.state {
            return;
        }
        if next == FallState::NoFall || self.state == FallState::NoFall {
            info!("Fall state {} -> {}", self.state, next);
        } else {
            debug!("Fall state {} -> {}", self.state, next);
        }
        self.state = next;
    }
}
