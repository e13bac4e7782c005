use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::utils::kinematics_constants as nao;

/// Number of actuated joints in one leg chain.
pub const LEG_DOF: usize = 6;

/// Joint names in chain order, without the `L`/`R` prefix.
pub const LEG_JOINT_NAMES: [&str; LEG_DOF] = [
    "HipYawPitch",
    "HipRoll",
    "HipPitch",
    "KneePitch",
    "AnklePitch",
    "AnkleRoll",
];

const LEFT_ACTUATORS: [&str; LEG_DOF] = [
    "LHipYawPitch",
    "LHipRoll",
    "LHipPitch",
    "LKneePitch",
    "LAnklePitch",
    "LAnkleRoll",
];

const RIGHT_ACTUATORS: [&str; LEG_DOF] = [
    "RHipYawPitch",
    "RHipRoll",
    "RHipPitch",
    "RKneePitch",
    "RAnklePitch",
    "RAnkleRoll",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegSide {
    Left,
    Right,
}

impl LegSide {
    pub const BOTH: [LegSide; 2] = [LegSide::Left, LegSide::Right];

    pub fn is_left(self) -> bool {
        matches!(self, LegSide::Left)
    }

    /// Sign used by the gait equations: +1 for the right leg, -1 for the left.
    pub fn sign(self) -> f64 {
        match self {
            LegSide::Left => -1.0,
            LegSide::Right => 1.0,
        }
    }

    /// Actuator names of this leg in chain order.
    pub fn actuator_names(self) -> &'static [&'static str; LEG_DOF] {
        match self {
            LegSide::Left => &LEFT_ACTUATORS,
            LegSide::Right => &RIGHT_ACTUATORS,
        }
    }
}

/// Six joint angles of one leg, ordered hip-yaw-pitch, hip-roll, hip-pitch,
/// knee-pitch, ankle-pitch, ankle-roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegJoints(pub [f64; LEG_DOF]);

impl LegJoints {
    pub fn new(angles: [f64; LEG_DOF]) -> Self {
        Self(angles)
    }

    /// Slightly crouched standing posture used before the first solve.
    pub fn standing() -> Self {
        Self([0.0, 0.0, -0.524, 1.047, -0.524, 0.0])
    }

    pub fn angles(&self) -> &[f64; LEG_DOF] {
        &self.0
    }

    pub fn knee_pitch(&self) -> f64 {
        self.0[3]
    }

    /// Euclidean distance in joint space.
    pub fn distance(&self, other: &LegJoints) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Named actuator commands for this leg.
    pub fn to_commands(&self, side: LegSide) -> [JointCommand; LEG_DOF] {
        let names = side.actuator_names();
        std::array::from_fn(|i| JointCommand {
            joint: names[i],
            angle: self.0[i],
        })
    }
}

impl Default for LegJoints {
    fn default() -> Self {
        Self::standing()
    }
}

/// Open interval of admissible angles for one joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    pub low: f64,
    pub high: f64,
}

impl JointLimit {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Strict test; NaN is never contained.
    pub fn contains(&self, angle: f64) -> bool {
        self.low < angle && angle < self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegLimits {
    pub joints: [JointLimit; LEG_DOF],
}

impl LegLimits {
    pub fn left() -> Self {
        Self {
            joints: [
                JointLimit::new(nao::L_HIP_YAW_PITCH_LOW, nao::L_HIP_YAW_PITCH_HIGH),
                JointLimit::new(nao::L_HIP_ROLL_LOW, nao::L_HIP_ROLL_HIGH),
                JointLimit::new(nao::L_HIP_PITCH_LOW, nao::L_HIP_PITCH_HIGH),
                JointLimit::new(nao::L_KNEE_PITCH_LOW, nao::L_KNEE_PITCH_HIGH),
                JointLimit::new(nao::L_ANKLE_PITCH_LOW, nao::L_ANKLE_PITCH_HIGH),
                JointLimit::new(nao::L_ANKLE_ROLL_LOW, nao::L_ANKLE_ROLL_HIGH),
            ],
        }
    }

    pub fn right() -> Self {
        Self {
            joints: [
                JointLimit::new(nao::R_HIP_YAW_PITCH_LOW, nao::R_HIP_YAW_PITCH_HIGH),
                JointLimit::new(nao::R_HIP_ROLL_LOW, nao::R_HIP_ROLL_HIGH),
                JointLimit::new(nao::R_HIP_PITCH_LOW, nao::R_HIP_PITCH_HIGH),
                JointLimit::new(nao::R_KNEE_PITCH_LOW, nao::R_KNEE_PITCH_HIGH),
                JointLimit::new(nao::R_ANKLE_PITCH_LOW, nao::R_ANKLE_PITCH_HIGH),
                JointLimit::new(nao::R_ANKLE_ROLL_LOW, nao::R_ANKLE_ROLL_HIGH),
            ],
        }
    }

    pub fn for_side(side: LegSide) -> Self {
        match side {
            LegSide::Left => Self::left(),
            LegSide::Right => Self::right(),
        }
    }

    pub fn hip_yaw_pitch(&self) -> &JointLimit {
        &self.joints[0]
    }

    pub fn hip_roll(&self) -> &JointLimit {
        &self.joints[1]
    }

    pub fn hip_pitch(&self) -> &JointLimit {
        &self.joints[2]
    }

    pub fn knee_pitch(&self) -> &JointLimit {
        &self.joints[3]
    }

    pub fn ankle_pitch(&self) -> &JointLimit {
        &self.joints[4]
    }

    pub fn ankle_roll(&self) -> &JointLimit {
        &self.joints[5]
    }

    pub fn contains(&self, joints: &LegJoints) -> bool {
        self.joints
            .iter()
            .zip(joints.0.iter())
            .all(|(limit, angle)| limit.contains(*angle))
    }

    /// Rejects a joint vector before it is applied, naming the first offending joint.
    pub fn check(&self, side: LegSide, joints: &LegJoints) -> Result<()> {
        for (i, (limit, angle)) in self.joints.iter().zip(joints.0.iter()).enumerate() {
            if !limit.contains(*angle) {
                return Err(ControlError::JointOutOfRange {
                    side,
                    joint: LEG_JOINT_NAMES[i],
                    angle: *angle,
                    low: limit.low,
                    high: limit.high,
                });
            }
        }
        Ok(())
    }
}

/// Target angle for one named actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointCommand {
    pub joint: &'static str,
    pub angle: f64,
}
