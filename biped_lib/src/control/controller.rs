//! The per-tick control loop.

use nalgebra::Vector3;
use serde::Serialize;
use tracing::{debug, info};

use crate::control::{EllipsoidGait, FallDetector, FallState, GaitFeedback, GaitManager, PoseEstimator};
use crate::error::Result;
use crate::types::{ControllerConfig, JointCommand, LegSide, RobotInterface, WalkConfig};
use crate::utils::LegKinematics;

/// Walking parameters held between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WalkCommand {
    /// Turn radius (m), positive turns right. `None` walks straight.
    pub turn_radius: Option<f64>,
    /// Heading offset (rad), positive turns left.
    pub heading: f64,
}

impl From<&WalkConfig> for WalkCommand {
    fn from(config: &WalkConfig) -> Self {
        Self {
            turn_radius: config.turn_radius,
            heading: config.heading,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Gait commands were sent to the legs.
    Walking,
    /// The fall detector owns the body; the legs were left alone.
    Recovering(FallState),
}

/// Snapshot of one tick, serialized for logs.
#[derive(Debug, Clone, Serialize)]
pub struct TickTelemetry {
    pub time: f64,
    pub fall_state: &'static str,
    pub roll_pitch_yaw: [f64; 3],
    pub smoothed_acceleration: [f64; 3],
    pub commands: Vec<JointCommand>,
}

pub struct Controller {
    gait: GaitManager,
    fall: FallDetector,
    pose: PoseEstimator,
    walk: WalkCommand,
    last_commands: Vec<JointCommand>,
}

impl Controller {
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let pose = PoseEstimator::new(&config.pose_estimator, config.time_step_s())?;
        let gait = GaitManager::new(
            EllipsoidGait::new(config.gait.clone()),
            LegKinematics::new(&config.kinematics),
        );
        info!(
            "Controller '{}' ready: {} estimator, {} ms ticks",
            config.name,
            pose.algorithm(),
            config.time_step_ms
        );

        Ok(Self {
            gait,
            fall: FallDetector::new(config.fall_detection.clone()),
            pose,
            walk: WalkCommand::from(&config.walk),
            last_commands: Vec::new(),
        })
    }

    pub fn set_walk(&mut self, walk: WalkCommand) {
        debug!("Walk command changed to {:?}", walk);
        self.walk = walk;
    }

    pub fn walk(&self) -> WalkCommand {
        self.walk
    }

    pub fn fall_state(&self) -> FallState {
        self.fall.state()
    }

    pub fn pose_estimator(&self) -> &PoseEstimator {
        &self.pose
    }

    pub fn gait_manager(&self) -> &GaitManager {
        &self.gait
    }

    /// Commands sent on the last walking tick.
    pub fn last_commands(&self) -> &[JointCommand] {
        &self.last_commands
    }

    /// Runs one control tick at simulated `time` (s).
    pub fn tick<R: RobotInterface + ?Sized>(&mut self, robot: &mut R, time: f64) -> Result<TickOutcome> {
        let acceleration = robot.accelerometer();
        let roll_pitch_yaw = self.pose.update(acceleration, robot.gyroscope());

        let state = self.fall.update(acceleration, robot)?;
        if state != FallState::NoFall {
            return Ok(TickOutcome::Recovering(state));
        }

        let left = GaitFeedback::new(roll_pitch_yaw.x, robot.foot_force(LegSide::Left));
        let right = GaitFeedback::new(roll_pitch_yaw.x, robot.foot_force(LegSide::Right));
        let commands = self
            .gait
            .command(time, self.walk.turn_radius, self.walk.heading, &left, &right);

        for command in &commands {
            robot.set_position(command.joint, command.angle);
        }
        self.last_commands.clear();
        self.last_commands.extend_from_slice(&commands);

        Ok(TickOutcome::Walking)
    }

    pub fn telemetry(&self, time: f64) -> TickTelemetry {
        TickTelemetry {
            time,
            fall_state: self.fall.state().label(),
            roll_pitch_yaw: to_array(&self.pose.roll_pitch_yaw()),
            smoothed_acceleration: to_array(self.fall.smoothed()),
            commands: self.last_commands.clone(),
        }
    }
}

fn to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JointActuator, MotionPlayer, SensorSource};

    struct StillRobot {
        acceleration: Vector3<f64>,
        commanded: usize,
    }

    impl SensorSource for StillRobot {
        fn accelerometer(&self) -> Vector3<f64> {
            self.acceleration
        }

        fn gyroscope(&self) -> Vector3<f64> {
            Vector3::zeros()
        }

        fn foot_force(&self, _side: LegSide) -> Vector3<f64> {
            Vector3::new(0.0, 0.0, 26.0)
        }
    }

    impl JointActuator for StillRobot {
        fn set_position(&mut self, _joint: &str, _angle: f64) {
            self.commanded += 1;
        }
    }

    impl MotionPlayer for StillRobot {
        fn play(&mut self, _clip: &str) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self, _clip: &str) -> Result<()> {
            Ok(())
        }

        fn set_loop(&mut self, _clip: &str, _looped: bool) -> Result<()> {
            Ok(())
        }

        fn is_over(&self, _clip: &str) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn upright_robot_walks() {
        let mut controller = Controller::new(&ControllerConfig::default()).unwrap();
        let mut robot = StillRobot {
            acceleration: Vector3::new(0.0, 0.0, -9.81),
            commanded: 0,
        };

        for tick in 0..10 {
            let outcome = controller.tick(&mut robot, tick as f64 * 0.016).unwrap();
            assert_eq!(outcome, TickOutcome::Walking);
        }
        assert_eq!(robot.commanded, 10 * 12);
        assert_eq!(controller.last_commands().len(), 12);

        let telemetry = serde_json::to_value(controller.telemetry(0.144)).unwrap();
        assert_eq!(telemetry["fall_state"], "NO_FALL");
        assert_eq!(telemetry["commands"][0]["joint"], "LHipYawPitch");
    }

    #[test]
    fn unknown_estimator_fails_construction() {
        let mut config = ControllerConfig::default();
        config.pose_estimator.algorithm = "kalman".to_string();
        assert!(Controller::new(&config).is_err());
    }

    #[test]
    fn walk_command_comes_from_config() {
        let mut config = ControllerConfig::default();
        config.walk.turn_radius = Some(0.8);
        let controller = Controller::new(&config).unwrap();
        assert_eq!(controller.walk().turn_radius, Some(0.8));
    }
}
