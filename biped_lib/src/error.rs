use thiserror::Error;

use crate::types::LegSide;

/// Errors raised by the control core.
///
/// Runtime conditions (sensor noise, unreachable foot targets) are absorbed
/// by the components themselves; these variants cover programming and
/// configuration mistakes that should stop the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Unknown orientation estimation algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Invalid fall state: {0}")]
    UnknownState(String),
    #[error("Motion clip not found: {0}")]
    UnknownClip(String),
    #[error("{side:?} leg joint {joint} = {angle:.4} rad is outside ({low:.4}, {high:.4})")]
    JointOutOfRange {
        side: LegSide,
        joint: &'static str,
        angle: f64,
        low: f64,
        high: f64,
    },
}

pub type Result<T> = std::result::Result<T, ControlError>;
