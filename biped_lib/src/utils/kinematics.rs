//! Closed-form kinematics of one NAO leg.
//!
//! The chain uses modified (Craig) Denavit-Hartenberg parameters and works
//! in millimetres. Inverse kinematics follows the analytic derivation of
//! Kofinas (2012): each joint is solved in turn, both trigonometric branches
//! are kept, and branches outside the joint limits are pruned as they appear.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};
use tracing::{debug, warn};

use crate::types::{FootPose, KinematicsConfig, LegDimensions, LegJoints, LegLimits, LegSide};
use crate::utils::solution_tree::{SolutionTree, TREE_DEPTH};

/// Arguments this close outside [-1, 1] are rounding noise, not unreachable poses.
const DOMAIN_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Exactly one branch combination survived the limits.
    Unique,
    /// Several survived; the one nearest the previous solution was kept.
    TieBroken { candidates: usize },
    /// Nothing survived; the previous solution was reused.
    Fallback,
}

pub struct LegKinematics {
    dimensions: LegDimensions,
    left_limits: LegLimits,
    right_limits: LegLimits,
    consistency_tolerance: f64,
    previous: [LegJoints; 2],
    tree: SolutionTree,
    candidates: Vec<LegJoints>,
    scored: Vec<(LegJoints, f64)>,
}

impl LegKinematics {
    pub fn new(config: &KinematicsConfig) -> Self {
        Self {
            dimensions: config.dimensions,
            left_limits: config.left_limits,
            right_limits: config.right_limits,
            consistency_tolerance: config.consistency_tolerance,
            previous: [config.standing_posture; 2],
            tree: SolutionTree::new(),
            candidates: Vec::with_capacity(16),
            scored: Vec::with_capacity(16),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&KinematicsConfig::default())
    }

    /// Starts `side` from `joints` instead of the configured standing posture.
    pub fn with_previous(mut self, side: LegSide, joints: LegJoints) -> Self {
        self.reset_previous(side, joints);
        self
    }

    pub fn limits(&self, side: LegSide) -> &LegLimits {
        match side {
            LegSide::Left => &self.left_limits,
            LegSide::Right => &self.right_limits,
        }
    }

    /// Last solution handed out for this leg.
    pub fn previous(&self, side: LegSide) -> &LegJoints {
        &self.previous[side_index(side)]
    }

    pub fn reset_previous(&mut self, side: LegSide, joints: LegJoints) {
        self.previous[side_index(side)] = joints;
    }

    /// Homogeneous transform from the hip base to the sole of the foot.
    pub fn forward_transform(&self, side: LegSide, joints: &LegJoints) -> Matrix4<f64> {
        let [theta1, theta2, theta3, theta4, theta5, theta6] = joints.0;
        self.base_offset(side)
            * t_0_1(theta1, side)
            * t_1_2(theta2, side)
            * t_2_3(theta3)
            * self.t_3_4(theta4)
            * self.t_4_5(theta5)
            * t_5_6(theta6)
            * foot_rotation()
            * self.foot_offset()
    }

    pub fn forward(&self, side: LegSide, joints: &LegJoints) -> FootPose {
        transform_to_pose(&self.forward_transform(side, joints))
    }

    /// Joints that place the foot at `target`, or the previous solution when
    /// no combination within the limits exists.
    pub fn solve(&mut self, target: &FootPose, side: LegSide) -> LegJoints {
        self.solve_detailed(target, side).0
    }

    pub fn solve_detailed(&mut self, target: &FootPose, side: LegSide) -> (LegJoints, SolveOutcome) {
        self.enumerate(target, side);
        let previous = self.previous[side_index(side)];

        let (chosen, outcome) = match self.candidates.len() {
            0 => {
                warn!(
                    "Incomputable foot target for the {:?} leg: x={:.2} y={:.2} z={:.2} roll={:.4} pitch={:.4} yaw={:.4}",
                    side, target.x, target.y, target.z, target.roll, target.pitch, target.yaw
                );
                debug!("{} partial branches pruned", self.tree.pruned_leaves());
                (previous, SolveOutcome::Fallback)
            }
            1 => (self.candidates[0], SolveOutcome::Unique),
            count => {
                let mut scored = std::mem::take(&mut self.scored);
                scored.clear();
                scored.extend(self.candidates.iter().map(|candidate| {
                    let reached = self.forward(side, candidate);
                    (*candidate, pose_residual(&reached, target))
                }));
                let best = select_solution(&scored, &previous, self.consistency_tolerance)
                    .map(|index| scored[index].0)
                    .unwrap_or(previous);
                self.scored = scored;
                debug!("{:?} leg: {} candidate solutions, kept {:?}", side, count, best.angles());
                (best, SolveOutcome::TieBroken { candidates: count })
            }
        };

        self.previous[side_index(side)] = chosen;
        (chosen, outcome)
    }

    /// Every within-limits joint combination reaching for `target`, in
    /// enumeration order. Does not touch the previous solution.
    pub fn candidates(&mut self, target: &FootPose, side: LegSide) -> &[LegJoints] {
        self.enumerate(target, side);
        &self.candidates
    }

    fn enumerate(&mut self, target: &FootPose, side: LegSide) {
        self.tree.clear();
        self.candidates.clear();

        let limits = *self.limits(side);
        let thigh = self.dimensions.thigh_length;
        let tibia = self.dimensions.tibia_length;
        let quarter = if side.is_left() { FRAC_PI_4 } else { -FRAC_PI_4 };

        let t_hat = rigid_inverse(&self.base_offset(side))
            * pose_to_transform(target)
            * rigid_inverse(&self.foot_offset());
        let t_tilde = rotation_x(quarter) * t_hat;
        let t_prime = rigid_inverse(&t_tilde);
        let (px, py, pz) = (t_prime[(0, 3)], t_prime[(1, 3)], t_prime[(2, 3)]);

        // Ankle roll
        let theta6 = (py / pz).atan();
        if !limits.ankle_roll().contains(theta6) {
            return;
        }
        let root = self.tree.add_root(theta6);

        // Knee pitch from the hip-ankle distance; NaN when out of reach
        let distance = (px * px + py * py + pz * pz).sqrt();
        let knee = PI
            - guarded_acos(
                (thigh * thigh + tibia * tibia - distance * distance) / (2.0 * thigh * tibia),
            );

        let t_tilde_prime = t_tilde * rigid_inverse(&(t_5_6(theta6) * foot_rotation()));
        let t_double_prime = rigid_inverse(&t_tilde_prime);

        for theta4 in [knee, -knee] {
            if !limits.knee_pitch().contains(theta4) {
                continue;
            }
            let knee_node = self.tree.add_child(root, theta4);

            // Ankle pitch
            let (sin4, cos4) = theta4.sin_cos();
            let numerator = t_double_prime[(1, 3)] * (tibia + thigh * cos4)
                + thigh * t_double_prime[(0, 3)] * sin4;
            let denominator = thigh * thigh * sin4 * sin4 + (tibia + thigh * cos4).powi(2);
            let ankle = guarded_asin(-numerator / denominator);

            for theta5 in [ankle, mirror_branch(ankle)] {
                if !limits.ankle_pitch().contains(theta5) {
                    continue;
                }
                let ankle_node = self.tree.add_child(knee_node, theta5);

                let t_triple_prime =
                    t_tilde_prime * rigid_inverse(&(self.t_3_4(theta4) * self.t_4_5(theta5)));

                // Hip roll
                let hip_roll = guarded_acos(t_triple_prime[(1, 2)]);
                for theta2 in [hip_roll - quarter, -hip_roll - quarter] {
                    if !limits.hip_roll().contains(theta2) {
                        continue;
                    }
                    let sin2 = (theta2 + quarter).sin();

                    // Hip pitch
                    let hip_pitch = guarded_asin(t_triple_prime[(1, 1)] / sin2);
                    let pitches = [hip_pitch, mirror_branch(hip_pitch)]
                        .map(|angle| Some(angle).filter(|a| limits.hip_pitch().contains(*a)));
                    if pitches.iter().all(Option::is_none) {
                        continue;
                    }

                    // Hip yaw-pitch
                    let yaw_pitch = guarded_acos(t_triple_prime[(0, 2)] / sin2);
                    let yaws = [yaw_pitch + FRAC_PI_2, -yaw_pitch + FRAC_PI_2]
                        .map(|angle| Some(angle).filter(|a| limits.hip_yaw_pitch().contains(*a)));

                    let roll_node = self.tree.add_child(ankle_node, theta2);
                    for theta3 in pitches.into_iter().flatten() {
                        let pitch_node = self.tree.add_child(roll_node, theta3);
                        for theta1 in yaws.into_iter().flatten() {
                            self.tree.add_child(pitch_node, theta1);
                        }
                    }
                }
            }
        }

        // Tree order is theta6, theta4, theta5, theta2, theta3, theta1
        self.candidates.extend(self.tree.complete_paths().map(
            |[theta6, theta4, theta5, theta2, theta3, theta1]: [f64; TREE_DEPTH]| {
                LegJoints([theta1, theta2, theta3, theta4, theta5, theta6])
            },
        ));
    }

    fn base_offset(&self, side: LegSide) -> Matrix4<f64> {
        let y = if side.is_left() {
            self.dimensions.hip_offset_y
        } else {
            -self.dimensions.hip_offset_y
        };
        Matrix4::new_translation(&Vector3::new(0.0, y, -self.dimensions.hip_offset_z))
    }

    fn foot_offset(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(0.0, 0.0, -self.dimensions.foot_height))
    }

    fn t_3_4(&self, theta4: f64) -> Matrix4<f64> {
        dh_transformation(-self.dimensions.thigh_length, 0.0, 0.0, theta4)
    }

    fn t_4_5(&self, theta5: f64) -> Matrix4<f64> {
        dh_transformation(-self.dimensions.tibia_length, 0.0, 0.0, theta5)
    }
}

/// Index of the candidate to keep.
///
/// Candidates whose residual is within `tolerance` of the smallest one reach
/// the target equally well; among them the closest to `previous` in joint
/// space wins. Returns `None` only for an empty slice.
pub fn select_solution(
    scored: &[(LegJoints, f64)],
    previous: &LegJoints,
    tolerance: f64,
) -> Option<usize> {
    let best_residual = scored
        .iter()
        .map(|(_, residual)| *residual)
        .filter(|residual| !residual.is_nan())
        .fold(f64::INFINITY, f64::min);

    scored
        .iter()
        .enumerate()
        .filter(|(_, (_, residual))| *residual <= best_residual + tolerance)
        .min_by(|(_, (a, _)), (_, (b, _))| a.distance(previous).total_cmp(&b.distance(previous)))
        .map(|(index, _)| index)
        .or(if scored.is_empty() { None } else { Some(0) })
}

/// Position error norm (mm) plus largest orientation error (rad).
pub fn pose_residual(reached: &FootPose, target: &FootPose) -> f64 {
    let position = (reached.position() - target.position()).norm();
    let (_, orientation) = reached.max_error(target);
    position + orientation
}

fn side_index(side: LegSide) -> usize {
    match side {
        LegSide::Left => 0,
        LegSide::Right => 1,
    }
}

/// Second solution of sin(x) = s: pi - x, or -pi - x for negative x.
fn mirror_branch(angle: f64) -> f64 {
    (if angle >= 0.0 { PI } else { -PI }) - angle
}

fn guarded_asin(value: f64) -> f64 {
    if value.abs() <= 1.0 + DOMAIN_SLACK {
        value.clamp(-1.0, 1.0).asin()
    } else {
        f64::NAN
    }
}

fn guarded_acos(value: f64) -> f64 {
    if value.abs() <= 1.0 + DOMAIN_SLACK {
        value.clamp(-1.0, 1.0).acos()
    } else {
        f64::NAN
    }
}

/// Modified DH transform: Rot_x(alpha) * Trans_x(a) * Rot_z(theta) * Trans_z(d).
#[rustfmt::skip]
fn dh_transformation(a: f64, alpha: f64, d: f64, theta: f64) -> Matrix4<f64> {
    let cos_theta = theta.cos();
    let sin_theta = theta.sin();
    let cos_alpha = alpha.cos();
    let sin_alpha = alpha.sin();

    Matrix4::new(
        cos_theta,             -sin_theta,             0.0,        a,
        sin_theta * cos_alpha,  cos_theta * cos_alpha, -sin_alpha, -d * sin_alpha,
        sin_theta * sin_alpha,  cos_theta * sin_alpha,  cos_alpha,  d * cos_alpha,
        0.0,                    0.0,                    0.0,        1.0,
    )
}

fn t_0_1(theta1: f64, side: LegSide) -> Matrix4<f64> {
    let alpha = if side.is_left() { -3.0 * FRAC_PI_4 } else { -FRAC_PI_4 };
    dh_transformation(0.0, alpha, 0.0, theta1 - FRAC_PI_2)
}

fn t_1_2(theta2: f64, side: LegSide) -> Matrix4<f64> {
    let offset = if side.is_left() { FRAC_PI_4 } else { -FRAC_PI_4 };
    dh_transformation(0.0, -FRAC_PI_2, 0.0, theta2 + offset)
}

fn t_2_3(theta3: f64) -> Matrix4<f64> {
    dh_transformation(0.0, FRAC_PI_2, 0.0, theta3)
}

fn t_5_6(theta6: f64) -> Matrix4<f64> {
    dh_transformation(0.0, -FRAC_PI_2, 0.0, theta6)
}

/// Aligns the last DH frame with the foot: Rot_z(pi) * Rot_y(-pi/2).
fn foot_rotation() -> Matrix4<f64> {
    (Rotation3::from_axis_angle(&Vector3::z_axis(), PI)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2))
    .to_homogeneous()
}

fn rotation_x(angle: f64) -> Matrix4<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angle).to_homogeneous()
}

/// Inverse of a rotation + translation transform.
fn rigid_inverse(transform: &Matrix4<f64>) -> Matrix4<f64> {
    let rotation_t = transform.fixed_view::<3, 3>(0, 0).transpose();
    let translation = transform.fixed_view::<3, 1>(0, 3).into_owned();
    let mut inverse = Matrix4::identity();
    inverse.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
    inverse
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&(-rotation_t * translation));
    inverse
}

fn pose_to_transform(pose: &FootPose) -> Matrix4<f64> {
    let mut transform = Rotation3::from_euler_angles(pose.roll, pose.pitch, pose.yaw).to_homogeneous();
    transform[(0, 3)] = pose.x;
    transform[(1, 3)] = pose.y;
    transform[(2, 3)] = pose.z;
    transform
}

fn transform_to_pose(transform: &Matrix4<f64>) -> FootPose {
    let rotation: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
    let roll = rotation[(2, 1)].atan2(rotation[(2, 2)]);
    let pitch = (-rotation[(2, 0)]).atan2((rotation[(2, 1)].powi(2) + rotation[(2, 2)].powi(2)).sqrt());
    let yaw = rotation[(1, 0)].atan2(rotation[(0, 0)]);

    FootPose::new(
        transform[(0, 3)],
        transform[(1, 3)],
        transform[(2, 3)],
        roll,
        pitch,
        yaw,
    )
}
