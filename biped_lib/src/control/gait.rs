//! Ellipsoid gait.
//!
//! Each foot follows an ellipse in the sagittal plane: the upper half is the
//! swing, the shallow lower half presses slightly into the ground during
//! stance. Two proportional reflexes (Endo et al., 2008) shape the ellipse
//! height: a vestibulospinal reflex countering body roll and an extensor
//! reflex pushing on a loaded foot.

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;
use tracing::trace;

use crate::types::{FootPose, GaitConfig, JointCommand, LegJoints, LegSide, LEG_DOF};
use crate::utils::{LegKinematics, SolveOutcome};

/// Live sensor inputs for the reflexes of one leg.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GaitFeedback {
    /// Body roll (rad) from the pose estimator.
    pub roll: f64,
    /// Force (N) measured under the foot.
    pub foot_force: Vector3<f64>,
}

impl GaitFeedback {
    pub fn new(roll: f64, foot_force: Vector3<f64>) -> Self {
        Self { roll, foot_force }
    }
}

pub struct EllipsoidGait {
    config: GaitConfig,
    theta: f64,
}

impl EllipsoidGait {
    pub fn new(config: GaitConfig) -> Self {
        Self { config, theta: 0.0 }
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    /// Current phase, in [-pi, pi).
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Sets the phase from the elapsed simulated time (s).
    pub fn update_phase(&mut self, elapsed: f64) {
        let theta = (-(TAU * elapsed / self.config.step_period)).rem_euclid(TAU) - PI;
        // rem_euclid may round up to TAU itself
        self.theta = if theta >= PI { -PI } else { theta };
    }

    /// Target pose (mm, rad) of one foot at the current phase.
    ///
    /// `turn_radius` is in metres with positive values turning right; `None`
    /// walks straight. `heading` (rad) rotates the whole step, positive to the
    /// left.
    pub fn compute_foot_target(
        &self,
        side: LegSide,
        turn_radius: Option<f64>,
        heading: f64,
        feedback: &GaitFeedback,
    ) -> FootPose {
        let c = &self.config;
        let factor = side.sign();
        let (sin_theta, cos_theta) = self.theta.sin_cos();

        // Distance from the turn centre to this foot
        let radius = turn_radius.map(|r| r * c.calibration_factor);
        let foot_radius = radius.map(|r| r - factor * c.lateral_leg_offset);

        let amplitude_x = match (radius, foot_radius) {
            (Some(r), Some(foot_r)) => c.step_length * foot_r / r,
            _ => c.step_length,
        };
        let x = factor * amplitude_x * cos_theta;

        let mut amplitude_z = if factor * self.theta < 0.0 {
            c.step_penetration
        } else {
            c.step_height
        };
        amplitude_z += factor * feedback.roll * c.roll_reflex_factor;
        let force = feedback.foot_force.norm();
        if force > c.force_reflex_threshold {
            amplitude_z += c.force_reflex_factor * force;
        }
        let z = factor * amplitude_z * sin_theta - c.robot_height_offset;

        let (yaw, y) = match foot_radius {
            Some(foot_r) => {
                let yaw = -x / foot_r;
                (yaw, -(1.0 - yaw.cos()) * foot_r)
            }
            None => (0.0, 0.0),
        };

        let (sin_heading, cos_heading) = heading.sin_cos();
        let x_rotated = x * cos_heading - y * sin_heading;
        let y_rotated = x * sin_heading + y * cos_heading - factor * c.lateral_leg_offset;

        FootPose::new(x_rotated * 1e3, y_rotated * 1e3, z * 1e3, 0.0, 0.0, yaw)
    }
}

/// Gait and leg kinematics for both legs, producing actuator commands.
pub struct GaitManager {
    gait: EllipsoidGait,
    kinematics: LegKinematics,
}

impl GaitManager {
    pub fn new(gait: EllipsoidGait, kinematics: LegKinematics) -> Self {
        Self { gait, kinematics }
    }

    pub fn gait(&self) -> &EllipsoidGait {
        &self.gait
    }

    pub fn kinematics(&self) -> &LegKinematics {
        &self.kinematics
    }

    pub fn kinematics_mut(&mut self) -> &mut LegKinematics {
        &mut self.kinematics
    }

    /// Advances the phase to `elapsed` and solves both legs.
    ///
    /// Commands are ordered left leg then right leg, each in chain order.
    pub fn command(
        &mut self,
        elapsed: f64,
        turn_radius: Option<f64>,
        heading: f64,
        left: &GaitFeedback,
        right: &GaitFeedback,
    ) -> [JointCommand; 2 * LEG_DOF] {
        self.gait.update_phase(elapsed);

        let left_joints = self.solve_leg(LegSide::Left, turn_radius, heading, left);
        let right_joints = self.solve_leg(LegSide::Right, turn_radius, heading, right);

        let left_commands = left_joints.to_commands(LegSide::Left);
        let right_commands = right_joints.to_commands(LegSide::Right);
        std::array::from_fn(|i| {
            if i < LEG_DOF {
                left_commands[i]
            } else {
                right_commands[i - LEG_DOF]
            }
        })
    }

    fn solve_leg(
        &mut self,
        side: LegSide,
        turn_radius: Option<f64>,
        heading: f64,
        feedback: &GaitFeedback,
    ) -> LegJoints {
        let target = self
            .gait
            .compute_foot_target(side, turn_radius, heading, feedback);
        let (joints, outcome) = self.kinematics.solve_detailed(&target, side);
        if outcome != SolveOutcome::Unique {
            trace!("{:?} leg at theta {:.3}: {:?}", side, self.gait.theta(), outcome);
        }
        joints
    }
}
