//! Orientation estimate from the accelerometer and gyroscope.
//!
//! Quaternions are kept scalar-first (`[w, x, y, z]`) inside the filters.
//! nalgebra stores coordinates scalar-last, so conversions go through
//! [`scalar_first_to_last`] and [`scalar_last_to_first`].

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix4, Matrix4x3, Quaternion, UnitQuaternion, Vector3, Vector4};
use tracing::debug;

use crate::error::{ControlError, Result};
use crate::types::PoseEstimatorConfig;
use crate::utils::VectorAverage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseAlgorithm {
    /// Roll and pitch straight from gravity; yaw stays zero.
    Tilt,
    Mahony,
    Madgwick,
    /// Exact integration of the gyroscope over one step.
    AngularRate,
    /// First-order integration of the gyroscope.
    ManualAngularRate,
}

impl PoseAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Tilt => "tilt",
            Self::Mahony => "mahony",
            Self::Madgwick => "madgwick",
            Self::AngularRate => "angular_rate",
            Self::ManualAngularRate => "manual_angular_rate",
        }
    }
}

impl fmt::Display for PoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoseAlgorithm {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tilt" => Ok(Self::Tilt),
            "mahony" => Ok(Self::Mahony),
            "madgwick" => Ok(Self::Madgwick),
            "angular_rate" => Ok(Self::AngularRate),
            "manual_angular_rate" => Ok(Self::ManualAngularRate),
            other => Err(ControlError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// `[w, x, y, z]` to `[x, y, z, w]`.
pub fn scalar_first_to_last(q: [f64; 4]) -> [f64; 4] {
    [q[1], q[2], q[3], q[0]]
}

/// `[x, y, z, w]` to `[w, x, y, z]`.
pub fn scalar_last_to_first(q: [f64; 4]) -> [f64; 4] {
    [q[3], q[0], q[1], q[2]]
}

/// Roll, pitch, yaw (extrinsic x-y-z) of a scalar-first quaternion.
pub fn quaternion_to_roll_pitch_yaw(q: [f64; 4]) -> Vector3<f64> {
    let coords = Vector4::from(scalar_first_to_last(q));
    let (roll, pitch, yaw) = UnitQuaternion::from_quaternion(Quaternion::from(coords)).euler_angles();
    Vector3::new(roll, pitch, yaw)
}

/// Scalar-first quaternion of extrinsic x-y-z euler angles.
pub fn roll_pitch_yaw_to_quaternion(angles: &Vector3<f64>) -> [f64; 4] {
    let rotation = UnitQuaternion::from_euler_angles(angles.x, angles.y, angles.z);
    let coords = rotation.coords;
    scalar_last_to_first([coords.x, coords.y, coords.z, coords.w])
}

pub struct PoseEstimator {
    algorithm: PoseAlgorithm,
    time_step: f64,
    madgwick_gain: f64,
    mahony_kp: f64,
    mahony_ki: f64,
    accelerometer: VectorAverage,
    /// Scalar-first.
    q: [f64; 4],
    gyro_bias: Vector3<f64>,
    euler: Vector3<f64>,
}

impl PoseEstimator {
    /// Fails on an unknown algorithm name.
    pub fn new(config: &PoseEstimatorConfig, time_step: f64) -> Result<Self> {
        let algorithm: PoseAlgorithm = config.algorithm.parse()?;
        debug!("Pose estimator using {} at dt = {} s", algorithm, time_step);
        Ok(Self {
            algorithm,
            time_step,
            madgwick_gain: config.madgwick_gain,
            mahony_kp: config.mahony_kp,
            mahony_ki: config.mahony_ki,
            accelerometer: VectorAverage::new(config.history_steps),
            q: [1.0, 0.0, 0.0, 0.0],
            gyro_bias: Vector3::zeros(),
            euler: Vector3::zeros(),
        })
    }

    pub fn algorithm(&self) -> PoseAlgorithm {
        self.algorithm
    }

    /// Current estimate, scalar-first.
    pub fn quaternion(&self) -> [f64; 4] {
        self.q
    }

    /// Roll, pitch and yaw of the current estimate.
    pub fn roll_pitch_yaw(&self) -> Vector3<f64> {
        self.euler
    }

    /// Feeds one raw accelerometer and gyroscope sample; returns roll, pitch, yaw.
    pub fn update(&mut self, accelerometer: Vector3<f64>, gyroscope: Vector3<f64>) -> Vector3<f64> {
        let averaged = self.accelerometer.update(accelerometer);
        // The sensor is mounted upside down about x
        let acc = Vector3::new(averaged.x, -averaged.y, -averaged.z);

        match self.algorithm {
            PoseAlgorithm::Tilt => {
                let tilt = tilt(&acc);
                self.q = roll_pitch_yaw_to_quaternion(&tilt);
            }
            PoseAlgorithm::Mahony => self.q = self.mahony(&gyroscope, &acc),
            PoseAlgorithm::Madgwick => self.q = self.madgwick(&gyroscope, &acc),
            PoseAlgorithm::AngularRate => self.q = self.angular_rate(&gyroscope),
            PoseAlgorithm::ManualAngularRate => self.q = self.manual_angular_rate(&gyroscope),
        }

        self.euler = quaternion_to_roll_pitch_yaw(self.q);
        self.euler
    }

    /// Restarts from the identity orientation with an empty accelerometer history.
    pub fn reset(&mut self) {
        self.q = [1.0, 0.0, 0.0, 0.0];
        self.gyro_bias = Vector3::zeros();
        self.euler = Vector3::zeros();
        self.accelerometer.reset();
    }

    fn mahony(&mut self, gyr: &Vector3<f64>, acc: &Vector3<f64>) -> [f64; 4] {
        if gyr.norm() <= 0.0 {
            return self.q;
        }
        let [w, x, y, z] = self.q;
        let mut omega = *gyr;

        let acc_norm = acc.norm();
        if acc_norm > 0.0 {
            // Gravity direction predicted by the current estimate
            let expected = Vector3::new(
                2.0 * (x * z - w * y),
                2.0 * (w * x + y * z),
                1.0 - 2.0 * (x * x + y * y),
            );
            let error = (acc / acc_norm).cross(&expected);
            self.gyro_bias -= self.mahony_ki * error * self.time_step;
            omega = omega - self.gyro_bias + self.mahony_kp * error;
        }

        let q = to_nalgebra(self.q);
        let q_dot = q * Quaternion::from_imag(omega) * 0.5;
        normalized(q + q_dot * self.time_step)
    }

    fn madgwick(&self, gyr: &Vector3<f64>, acc: &Vector3<f64>) -> [f64; 4] {
        if gyr.norm() <= 0.0 {
            return self.q;
        }
        let q = to_nalgebra(self.q);
        let mut q_dot = q * Quaternion::from_imag(*gyr) * 0.5;

        let acc_norm = acc.norm();
        if acc_norm > 0.0 {
            let a = acc / acc_norm;
            let [w, x, y, z] = normalized(q);
            let f = Vector3::new(
                2.0 * (x * z - w * y) - a.x,
                2.0 * (w * x + y * z) - a.y,
                2.0 * (0.5 - x * x - y * y) - a.z,
            );
            if f.norm() > 0.0 {
                #[rustfmt::skip]
                let jacobian_t = Matrix4x3::new(
                    -2.0 * y, 2.0 * x,  0.0,
                     2.0 * z, 2.0 * w, -4.0 * x,
                    -2.0 * w, 2.0 * z, -4.0 * y,
                     2.0 * x, 2.0 * y,  0.0,
                );
                let gradient = jacobian_t * f;
                let gradient_norm = gradient.norm();
                if gradient_norm > 0.0 {
                    let step = gradient / gradient_norm * self.madgwick_gain;
                    // Gradient is scalar-first
                    q_dot.coords -= Vector4::new(step[1], step[2], step[3], step[0]);
                }
            }
        }

        normalized(q + q_dot * self.time_step)
    }

    fn angular_rate(&self, gyr: &Vector3<f64>) -> [f64; 4] {
        let rate = gyr.norm();
        if rate <= 0.0 {
            return self.q;
        }
        let half_angle = rate * self.time_step / 2.0;
        let transition =
            Matrix4::identity() * half_angle.cos() + omega_matrix(gyr) * (half_angle.sin() / rate);
        normalized_array(transition * Vector4::from(self.q))
    }

    fn manual_angular_rate(&self, gyr: &Vector3<f64>) -> [f64; 4] {
        let transition = Matrix4::identity() + omega_matrix(gyr) * (self.time_step / 2.0);
        normalized_array(transition * Vector4::from(self.q))
    }
}

/// Roll and pitch of the gravity vector; yaw is unobservable.
fn tilt(acc: &Vector3<f64>) -> Vector3<f64> {
    let roll = acc.y.atan2(acc.z);
    let pitch = (-acc.x).atan2((acc.y * acc.y + acc.z * acc.z).sqrt());
    Vector3::new(roll, pitch, 0.0)
}

/// Rate matrix acting on scalar-first quaternions: q_dot = 0.5 * Omega * q.
#[rustfmt::skip]
fn omega_matrix(gyr: &Vector3<f64>) -> Matrix4<f64> {
    let (wx, wy, wz) = (gyr.x, gyr.y, gyr.z);
    Matrix4::new(
        0.0, -wx, -wy, -wz,
        wx,  0.0,  wz, -wy,
        wy,  -wz, 0.0,  wx,
        wz,   wy, -wx, 0.0,
    )
}

fn to_nalgebra(q: [f64; 4]) -> Quaternion<f64> {
    Quaternion::new(q[0], q[1], q[2], q[3])
}

fn normalized(q: Quaternion<f64>) -> [f64; 4] {
    let q = q.normalize();
    [q.w, q.i, q.j, q.k]
}

fn normalized_array(q: Vector4<f64>) -> [f64; 4] {
    let q = q.normalize();
    [q[0], q[1], q[2], q[3]]
}
