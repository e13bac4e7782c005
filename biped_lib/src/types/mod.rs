pub mod config;
pub mod devices;
pub mod foot_pose;
pub mod joint_state;

pub use config::*;
pub use devices::*;
pub use foot_pose::*;
pub use joint_state::*;
