//! Seams to the robot's devices.
//!
//! The control core never talks to a simulator directly. Sensors, motors and
//! the motion-clip player are reached through these traits, implemented by
//! the simulator bridge in production and by scripted robots in tests.

use nalgebra::Vector3;

use crate::error::Result;
use crate::types::LegSide;

/// Sensor readings for the current tick.
pub trait SensorSource {
    /// Raw accelerometer vector (m/s^2), in the device's mounting frame.
    fn accelerometer(&self) -> Vector3<f64>;

    /// Gyroscope rates (rad/s).
    fn gyroscope(&self) -> Vector3<f64>;

    /// Force vector (N) measured under the given foot.
    fn foot_force(&self, side: LegSide) -> Vector3<f64>;
}

/// Position-controlled motors. Fire-and-forget, one target per tick.
pub trait JointActuator {
    fn set_position(&mut self, joint: &str, angle: f64);
}

/// Name-addressed pre-recorded motion clips.
///
/// A finished clip keeps reporting `is_over() == true` until it is played
/// and stopped again.
pub trait MotionPlayer {
    fn play(&mut self, clip: &str) -> Result<()>;

    fn stop(&mut self, clip: &str) -> Result<()>;

    fn set_loop(&mut self, clip: &str, looped: bool) -> Result<()>;

    fn is_over(&self, clip: &str) -> Result<bool>;
}

/// Everything the controller needs from one robot.
pub trait RobotInterface: SensorSource + JointActuator + MotionPlayer {}

impl<T> RobotInterface for T where T: SensorSource + JointActuator + MotionPlayer {}
