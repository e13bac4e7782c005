pub mod controller;
pub mod fall_detection;
pub mod gait;
pub mod motion;
pub mod pose_estimator;

pub use self::controller::*;
pub use self::fall_detection::*;
pub use self::gait::*;
pub use self::motion::*;
pub use self::pose_estimator::*;
