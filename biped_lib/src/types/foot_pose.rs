use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Target pose of a foot relative to the hip-base frame.
///
/// Position is in millimetres, orientation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FootPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl FootPose {
    pub fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            roll,
            pitch,
            yaw,
        }
    }

    pub fn from_array(pose: [f64; 6]) -> Self {
        Self::new(pose[0], pose[1], pose[2], pose[3], pose[4], pose[5])
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn orientation(&self) -> Vector3<f64> {
        Vector3::new(self.roll, self.pitch, self.yaw)
    }

    /// Largest absolute position error (mm) and largest absolute angle error (rad).
    pub fn max_error(&self, other: &FootPose) -> (f64, f64) {
        let position = (self.position() - other.position()).amax();
        let orientation = (self.orientation() - other.orientation())
            .iter()
            .map(|delta| wrap_angle(*delta).abs())
            .fold(0.0, f64::max);
        (position, orientation)
    }
}

/// Wraps an angle into (-pi, pi].
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}
