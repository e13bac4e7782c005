//! # Biped Library
//!
//! Control core for a NAO-class biped: analytic leg kinematics, the
//! ellipsoid gait, fall detection and recovery, and IMU pose estimation.
//! Robot devices are reached only through the traits in [`types::devices`],
//! so the same core runs against a simulator bridge or a scripted robot.

pub mod control;
pub mod error;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use control::*;
pub use error::*;
pub use types::*;
pub use utils::*;
