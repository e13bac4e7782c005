//! NAO leg dimensions and joint limits.
//!
//! Values follow N. Kofinas, "Forward and inverse kinematics for the NAO
//! humanoid robot", TU Crete 2012. Lengths are in millimetres, angles in
//! radians.

pub const HIP_OFFSET_Y: f64 = 50.0;
pub const HIP_OFFSET_Z: f64 = 85.0;
pub const THIGH_LENGTH: f64 = 100.0;
pub const TIBIA_LENGTH: f64 = 102.9;
pub const FOOT_HEIGHT: f64 = 45.11;

// Left leg
pub const L_HIP_YAW_PITCH_HIGH: f64 = 0.7408;
pub const L_HIP_YAW_PITCH_LOW: f64 = -1.1453;
pub const L_HIP_ROLL_HIGH: f64 = 0.7904;
pub const L_HIP_ROLL_LOW: f64 = -0.3794;
pub const L_HIP_PITCH_HIGH: f64 = 0.4840;
pub const L_HIP_PITCH_LOW: f64 = -1.7739;
pub const L_KNEE_PITCH_HIGH: f64 = 2.1125;
pub const L_KNEE_PITCH_LOW: f64 = -0.0923;
pub const L_ANKLE_PITCH_HIGH: f64 = 0.9227;
pub const L_ANKLE_PITCH_LOW: f64 = -1.1895;
pub const L_ANKLE_ROLL_HIGH: f64 = 0.7690;
pub const L_ANKLE_ROLL_LOW: f64 = -0.3978;

// Right leg
pub const R_HIP_YAW_PITCH_HIGH: f64 = 0.7408;
pub const R_HIP_YAW_PITCH_LOW: f64 = -1.1453;
pub const R_HIP_ROLL_HIGH: f64 = 0.4147;
pub const R_HIP_ROLL_LOW: f64 = -0.7383;
pub const R_HIP_PITCH_HIGH: f64 = 0.4856;
pub const R_HIP_PITCH_LOW: f64 = -1.7723;
pub const R_KNEE_PITCH_HIGH: f64 = 2.1201;
pub const R_KNEE_PITCH_LOW: f64 = -0.1030;
pub const R_ANKLE_PITCH_HIGH: f64 = 0.9320;
pub const R_ANKLE_PITCH_LOW: f64 = -1.1864;
pub const R_ANKLE_ROLL_HIGH: f64 = 0.3886;
pub const R_ANKLE_ROLL_LOW: f64 = -1.1864;

// Shoulder roll, used by the side-fall push
pub const L_SHOULDER_ROLL_HIGH: f64 = 1.3265;
pub const L_SHOULDER_ROLL_LOW: f64 = -0.3142;
pub const R_SHOULDER_ROLL_HIGH: f64 = 0.3142;
pub const R_SHOULDER_ROLL_LOW: f64 = -1.3265;
