pub mod kinematics;
pub mod kinematics_constants;
pub mod running_average;
pub mod solution_tree;
pub mod tracing;

pub use self::kinematics::*;
pub use self::kinematics_constants::*;
pub use self::running_average::*;
pub use self::solution_tree::*;
pub use self::tracing::*;
