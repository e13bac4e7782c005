//! Randomized properties of the leg solver.

use biped_lib::{FootPose, JointLimit, LegJoints, LegKinematics, LegSide, SolveOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SAMPLES: usize = 500;

fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Joints drawn uniformly, `margin` rad away from every limit.
fn random_joints(rng: &mut ChaCha8Rng, limits: &[JointLimit; 6], margin: f64) -> LegJoints {
    LegJoints::new(std::array::from_fn(|i| {
        rng.gen_range(limits[i].low + margin..limits[i].high - margin)
    }))
}

#[test]
fn solve_reaches_every_in_limit_pose() {
    let mut kinematics = LegKinematics::with_defaults();
    let mut rng = seeded_rng(42);

    for side in LegSide::BOTH {
        let limits = kinematics.limits(side).joints;
        for _ in 0..SAMPLES {
            let joints = random_joints(&mut rng, &limits, 0.02);
            let target = kinematics.forward(side, &joints);

            let (solved, outcome) = kinematics.solve_detailed(&target, side);
            assert_ne!(outcome, SolveOutcome::Fallback, "{side:?} {joints:?}");

            let (position, orientation) = kinematics.forward(side, &solved).max_error(&target);
            assert!(position < 1e-3, "{side:?} {joints:?}: {position} mm");
            assert!(orientation < 1e-4, "{side:?} {joints:?}: {orientation} rad");
        }
    }
}

#[test]
fn every_candidate_respects_the_limits() {
    let mut kinematics = LegKinematics::with_defaults();
    let mut rng = seeded_rng(7);

    for side in LegSide::BOTH {
        let limits = *kinematics.limits(side);
        for _ in 0..SAMPLES {
            let target = FootPose::new(
                rng.gen_range(-80.0..80.0),
                rng.gen_range(-40.0..40.0) + if side.is_left() { 50.0 } else { -50.0 },
                rng.gen_range(-340.0..-250.0),
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.3..0.3),
            );
            for candidate in kinematics.candidates(&target, side) {
                assert!(limits.contains(candidate), "{side:?}: {candidate:?}");
            }
            let solved = kinematics.solve(&target, side);
            assert!(limits.check(side, &solved).is_ok());
        }
    }
}

#[test]
fn unreachable_targets_fall_back_deterministically() {
    let mut kinematics = LegKinematics::with_defaults();
    let mut rng = seeded_rng(3);
    let limits = kinematics.limits(LegSide::Right).joints;
    let previous = random_joints(&mut rng, &limits, 0.05);
    kinematics.reset_previous(LegSide::Right, previous);

    let too_far = FootPose::new(0.0, -50.0, -700.0, 0.0, 0.0, 0.0);
    for _ in 0..3 {
        let (joints, outcome) = kinematics.solve_detailed(&too_far, LegSide::Right);
        assert_eq!(outcome, SolveOutcome::Fallback);
        assert_eq!(joints, previous);
    }
    // The other leg is untouched
    assert_eq!(*kinematics.previous(LegSide::Left), LegJoints::standing());
}

#[test]
fn consecutive_gait_like_targets_stay_continuous() {
    let mut kinematics = LegKinematics::with_defaults();
    let standing = kinematics.forward(LegSide::Left, &LegJoints::standing());

    let mut last = LegJoints::standing();
    for step in 0..100 {
        let phase = step as f64 * 0.1;
        let target = FootPose {
            x: standing.x + 20.0 * phase.cos(),
            z: standing.z + 10.0 * phase.sin(),
            ..standing
        };
        let solved = kinematics.solve(&target, LegSide::Left);
        assert!(solved.distance(&last) < 0.5, "jump at step {step}: {solved:?}");
        last = solved;
    }
}
