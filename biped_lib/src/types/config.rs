use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::control::PoseAlgorithm;
use crate::types::{LegJoints, LegLimits, LegSide};
use crate::utils::kinematics_constants as nao;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub name: String,
    /// Duration of one control tick (ms).
    pub time_step_ms: u32,
    pub kinematics: KinematicsConfig,
    pub gait: GaitConfig,
    pub fall_detection: FallDetectionConfig,
    pub pose_estimator: PoseEstimatorConfig,
    pub walk: WalkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    pub dimensions: LegDimensions,
    pub left_limits: LegLimits,
    pub right_limits: LegLimits,
    /// Initial previous solution for both legs.
    pub standing_posture: LegJoints,
    /// Candidates whose forward-kinematics residual is within this of the best
    /// one count as reaching the target equally well.
    pub consistency_tolerance: f64,
}

/// Link dimensions of the leg chain (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegDimensions {
    pub hip_offset_y: f64,
    pub hip_offset_z: f64,
    pub thigh_length: f64,
    pub tibia_length: f64,
    pub foot_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Time to complete one step (s).
    pub step_period: f64,
    /// Distance travelled by a foot in one step (m).
    pub step_length: f64,
    /// Height of the swing half of the ellipse (m).
    pub step_height: f64,
    /// Depth of the stance half of the ellipse (m).
    pub step_penetration: f64,
    /// Distance between the centre of mass and each foot (m).
    pub lateral_leg_offset: f64,
    /// Desired height of the hips above the feet (m).
    pub robot_height_offset: f64,
    /// Gain of the vestibulospinal (roll) reflex.
    pub roll_reflex_factor: f64,
    /// Gain of the extensor (foot force) reflex, per newton.
    pub force_reflex_factor: f64,
    /// Foot force (N) above which the extensor reflex engages.
    pub force_reflex_threshold: f64,
    /// Applied to the requested turn radius; the robot under-turns otherwise.
    pub calibration_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smoothing {
    /// First-order low-pass: `avg = retain * avg + (1 - retain) * sample`.
    LowPass { retain: f64 },
    /// Mean of the last `steps` samples.
    Window { steps: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallDetectionConfig {
    /// Smoothed acceleration (m/s^2) beyond which the robot is considered fallen.
    pub threshold: f64,
    pub smoothing: Smoothing,
    /// Shoulder roll magnitude (rad) used to push the robot onto its back.
    pub shoulder_push_angle: f64,
    pub front_recovery_clip: String,
    pub back_recovery_clip: String,
    pub stand_clip: String,
    /// Clip played on a side fall. Without one the robot waits for the
    /// shoulder push to roll it onto its front or back.
    pub side_fall_clip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseEstimatorConfig {
    /// One of `tilt`, `mahony`, `madgwick`, `angular_rate`, `manual_angular_rate`.
    pub algorithm: String,
    /// Accelerometer samples averaged before fusion.
    pub history_steps: usize,
    pub madgwick_gain: f64,
    pub mahony_kp: f64,
    pub mahony_ki: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Turn radius (m), positive turns right. Absent means straight ahead.
    pub turn_radius: Option<f64>,
    /// Heading offset (rad), positive turns left.
    pub heading: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "participant".to_string(),
            time_step_ms: 16,
            kinematics: KinematicsConfig::default(),
            gait: GaitConfig::default(),
            fall_detection: FallDetectionConfig::default(),
            pose_estimator: PoseEstimatorConfig::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            dimensions: LegDimensions::default(),
            left_limits: LegLimits::left(),
            right_limits: LegLimits::right(),
            standing_posture: LegJoints::standing(),
            consistency_tolerance: 1e-6,
        }
    }
}

impl Default for LegDimensions {
    fn default() -> Self {
        Self {
            hip_offset_y: nao::HIP_OFFSET_Y,
            hip_offset_z: nao::HIP_OFFSET_Z,
            thigh_length: nao::THIGH_LENGTH,
            tibia_length: nao::TIBIA_LENGTH,
            foot_height: nao::FOOT_HEIGHT,
        }
    }
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            step_period: 0.4,
            step_length: 0.045,
            step_height: 0.04,
            step_penetration: 0.005,
            lateral_leg_offset: 0.05,
            robot_height_offset: 0.31,
            roll_reflex_factor: 5e-4,
            // h_ER / (mass * gravity) for a 5.305 kg robot
            force_reflex_factor: 3e-3 / (5.305 * 9.81),
            force_reflex_threshold: 5.0,
            calibration_factor: 0.93,
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::LowPass { retain: 0.9 }
    }
}

impl Default for FallDetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 7.0,
            smoothing: Smoothing::default(),
            shoulder_push_angle: 1.2,
            front_recovery_clip: "GetUpFront".to_string(),
            back_recovery_clip: "GetUpBack".to_string(),
            stand_clip: "Stand".to_string(),
            side_fall_clip: None,
        }
    }
}

impl Default for PoseEstimatorConfig {
    fn default() -> Self {
        Self {
            algorithm: "madgwick".to_string(),
            history_steps: 2,
            madgwick_gain: 0.033,
            mahony_kp: 1.0,
            mahony_ki: 0.3,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            turn_radius: None,
            heading: 0.0,
        }
    }
}

impl ControllerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ControllerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn time_step_s(&self) -> f64 {
        f64::from(self.time_step_ms) / 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_step_ms == 0 {
            return Err(eyre::eyre!("time_step_ms must be positive"));
        }

        self.kinematics.validate()?;
        self.gait.validate()?;
        self.fall_detection.validate()?;

        if self.pose_estimator.history_steps == 0 {
            return Err(eyre::eyre!("pose_estimator.history_steps must be positive"));
        }
        self.pose_estimator.algorithm.parse::<PoseAlgorithm>()?;

        if let Some(radius) = self.walk.turn_radius {
            if radius == 0.0 || radius.is_nan() {
                return Err(eyre::eyre!("walk.turn_radius must be non-zero, got {}", radius));
            }
        }

        Ok(())
    }
}

impl KinematicsConfig {
    pub fn validate(&self) -> Result<()> {
        for (side, limits) in [(LegSide::Left, &self.left_limits), (LegSide::Right, &self.right_limits)] {
            for (i, limit) in limits.joints.iter().enumerate() {
                if limit.low >= limit.high {
                    return Err(eyre::eyre!(
                        "{:?} leg joint {} has an empty range ({}, {})",
                        side,
                        i,
                        limit.low,
                        limit.high
                    ));
                }
            }
            limits.check(side, &self.standing_posture)?;
        }

        let d = &self.dimensions;
        if d.thigh_length <= 0.0 || d.tibia_length <= 0.0 {
            return Err(eyre::eyre!("Leg link lengths must be positive"));
        }

        if self.consistency_tolerance <= 0.0 {
            return Err(eyre::eyre!("consistency_tolerance must be positive"));
        }

        Ok(())
    }
}

impl GaitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step_period <= 0.0 {
            return Err(eyre::eyre!("gait.step_period must be positive, got {}", self.step_period));
        }
        if self.calibration_factor <= 0.0 {
            return Err(eyre::eyre!(
                "gait.calibration_factor must be positive, got {}",
                self.calibration_factor
            ));
        }
        Ok(())
    }
}

impl FallDetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threshold <= 0.0 {
            return Err(eyre::eyre!("fall_detection.threshold must be positive"));
        }
        // Pushed as +angle on the left shoulder and -angle on the right one
        let push = self.shoulder_push_angle;
        if push <= 0.0 || push >= nao::L_SHOULDER_ROLL_HIGH || -push <= nao::R_SHOULDER_ROLL_LOW {
            return Err(eyre::eyre!(
                "fall_detection.shoulder_push_angle {} is outside the shoulder roll range",
                push
            ));
        }
        match self.smoothing {
            Smoothing::LowPass { retain } if !(0.0..1.0).contains(&retain) => Err(eyre::eyre!(
                "fall_detection.smoothing.retain must be in [0, 1), got {}",
                retain
            )),
            Smoothing::Window { steps: 0 } => {
                Err(eyre::eyre!("fall_detection.smoothing.steps must be positive"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ControllerConfig = toml::from_str(
            r#"
            name = "wrestler"

            [gait]
            step_period = 0.5

            [fall_detection.smoothing]
            kind = "window"
            steps = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "wrestler");
        assert_eq!(config.gait.step_period, 0.5);
        assert_eq!(config.gait.step_length, 0.045);
        assert_eq!(config.fall_detection.smoothing, Smoothing::Window { steps: 10 });
        assert_eq!(config.pose_estimator.algorithm, "madgwick");
        config.validate().unwrap();
    }

    #[test]
    fn shipped_participant_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/participant.toml");
        let config = ControllerConfig::load_from_file(path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.time_step_ms, 16);
        assert_eq!(config.fall_detection.side_fall_clip, None);
        assert_eq!(config.kinematics.left_limits, LegLimits::left());
    }

    #[test]
    fn unknown_algorithm_fails_validation() {
        let mut config = ControllerConfig::default();
        config.pose_estimator.algorithm = "kalman".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("kalman"));
    }

    #[test]
    fn empty_joint_range_fails_validation() {
        let mut config = ControllerConfig::default();
        config.kinematics.left_limits.joints[1].low = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn shoulder_push_beyond_joint_range_fails_validation() {
        let mut config = ControllerConfig::default();
        config.fall_detection.shoulder_push_angle = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_retain_fails_validation() {
        let mut config = ControllerConfig::default();
        config.fall_detection.smoothing = Smoothing::LowPass { retain: 1.5 };
        assert!(config.validate().is_err());
    }
}
