//! Whole-controller scenarios against a mock robot.

use std::collections::HashMap;

use biped_lib::{
    ControlError, Controller, ControllerConfig, FallState, JointActuator, LegSide, MotionPlayer,
    Result, SensorSource, Smoothing, TickOutcome,
};
use nalgebra::Vector3;

const UPRIGHT: [f64; 3] = [0.0, 0.0, -9.81];
const ON_FRONT: [f64; 3] = [-9.81, 0.0, 0.0];

#[derive(Default)]
struct MockRobot {
    acceleration: Vector3<f64>,
    leg_commands: usize,
    positions: HashMap<String, f64>,
    played: Vec<String>,
    /// Ticks left in the playing clip.
    remaining: HashMap<String, u32>,
    clip_length: u32,
}

impl MockRobot {
    fn new(clip_length: u32) -> Self {
        Self {
            acceleration: Vector3::from(UPRIGHT),
            clip_length,
            ..Default::default()
        }
    }

    fn advance_clips(&mut self) {
        for ticks in self.remaining.values_mut() {
            *ticks = ticks.saturating_sub(1);
        }
    }
}

impl SensorSource for MockRobot {
    fn accelerometer(&self) -> Vector3<f64> {
        self.acceleration
    }

    fn gyroscope(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn foot_force(&self, _side: LegSide) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, 25.0)
    }
}

impl JointActuator for MockRobot {
    fn set_position(&mut self, joint: &str, angle: f64) {
        if !joint.contains("Shoulder") {
            self.leg_commands += 1;
        }
        self.positions.insert(joint.to_string(), angle);
    }
}

impl MotionPlayer for MockRobot {
    fn play(&mut self, clip: &str) -> Result<()> {
        if !["GetUpFront", "GetUpBack", "Stand"].contains(&clip) {
            return Err(ControlError::UnknownClip(clip.to_string()));
        }
        self.played.push(clip.to_string());
        self.remaining.insert(clip.to_string(), self.clip_length);
        Ok(())
    }

    fn stop(&mut self, _clip: &str) -> Result<()> {
        Ok(())
    }

    fn set_loop(&mut self, _clip: &str, _looped: bool) -> Result<()> {
        Ok(())
    }

    fn is_over(&self, clip: &str) -> Result<bool> {
        self.remaining
            .get(clip)
            .map(|ticks| *ticks == 0)
            .ok_or_else(|| ControlError::UnknownClip(clip.to_string()))
    }
}

fn window_config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.fall_detection.smoothing = Smoothing::Window { steps: 1 };
    config
}

#[test]
fn front_fall_recovers_through_get_up_front() {
    let mut controller = Controller::new(&window_config()).unwrap();
    let mut robot = MockRobot::new(5);
    let dt = 0.016;

    assert_eq!(controller.tick(&mut robot, 0.0).unwrap(), TickOutcome::Walking);

    robot.acceleration = Vector3::from(ON_FRONT);
    assert_eq!(
        controller.tick(&mut robot, dt).unwrap(),
        TickOutcome::Recovering(FallState::FrontFall)
    );
    assert_eq!(
        controller.tick(&mut robot, 2.0 * dt).unwrap(),
        TickOutcome::Recovering(FallState::BlockingMotion)
    );
    assert_eq!(robot.played, ["GetUpFront"]);

    let mut tick = 3;
    while controller.fall_state() != FallState::NoFall {
        robot.advance_clips();
        controller.tick(&mut robot, tick as f64 * dt).unwrap();
        tick += 1;
        assert!(tick < 20, "recovery never finished");
    }

    assert_eq!(robot.played.last().map(String::as_str), Some("Stand"));
    // GetUpFront was played once more to clear its completion flag
    assert_eq!(robot.played, ["GetUpFront", "GetUpFront", "Stand"]);
}

#[test]
fn legs_are_left_alone_while_recovering() {
    let mut controller = Controller::new(&window_config()).unwrap();
    let mut robot = MockRobot::new(1000);
    let dt = 0.016;

    controller.tick(&mut robot, 0.0).unwrap();
    let walking_commands = robot.leg_commands;
    assert_eq!(walking_commands, 12);

    robot.acceleration = Vector3::from(ON_FRONT);
    for tick in 1..50 {
        let outcome = controller.tick(&mut robot, tick as f64 * dt).unwrap();
        assert!(matches!(outcome, TickOutcome::Recovering(_)));
    }
    assert_eq!(robot.leg_commands, walking_commands);
}

#[test]
fn side_fall_pushes_the_shoulder_and_waits() {
    let mut controller = Controller::new(&window_config()).unwrap();
    let mut robot = MockRobot::new(3);

    robot.acceleration = Vector3::new(0.0, 9.81, 0.0);
    for tick in 0..10 {
        let outcome = controller.tick(&mut robot, tick as f64 * 0.016).unwrap();
        assert_eq!(outcome, TickOutcome::Recovering(FallState::SideFall));
    }
    assert_eq!(robot.positions.get("LShoulderRoll"), Some(&1.2));
    assert!(robot.played.is_empty());

    // Rolled onto its back
    robot.acceleration = Vector3::new(9.81, 0.0, 0.0);
    controller.tick(&mut robot, 0.2).unwrap();
    controller.tick(&mut robot, 0.216).unwrap();
    assert_eq!(robot.played, ["GetUpBack"]);
}

#[test]
fn missing_side_clip_is_an_error() {
    let mut config = window_config();
    config.fall_detection.side_fall_clip = Some("GetUpSide".to_string());
    let mut controller = Controller::new(&config).unwrap();
    let mut robot = MockRobot::new(3);

    robot.acceleration = Vector3::new(0.0, -9.81, 0.0);
    controller.tick(&mut robot, 0.0).unwrap();
    let err = controller.tick(&mut robot, 0.016).unwrap_err();
    assert_eq!(err, ControlError::UnknownClip("GetUpSide".to_string()));
}
