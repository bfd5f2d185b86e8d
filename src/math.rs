//! Rotation algebra and nalgebra extensions

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};

use crate::error::LockFailure;
use crate::types::{OrientationAngles, STANDARD_GRAVITY};

/// Radians to degrees
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Angular speeds at or below this magnitude (rad/s) produce no rotation
pub const ROTATION_EPSILON: f32 = 1e-9;

/// Gravity references weaker than this fraction of standard gravity are rejected
const FREE_FALL_FACTOR: f32 = 0.1;

/// Minimum norm of the horizontal (east) reference before normalization
const MIN_HORIZONTAL_NORM: f32 = 0.1;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Normalize the vector, returning the zero vector if its magnitude is
    /// at or below `epsilon`
    fn safe_normalize(&self, epsilon: f32) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn safe_normalize(&self, epsilon: f32) -> Vector3<f32> {
        let mag = self.norm();
        if mag > epsilon {
            *self / mag
        } else {
            Vector3::zeros()
        }
    }
}

/// Incremental rotation for one gyroscope step, as a unit quaternion.
///
/// The angular velocity is split into a unit axis and an angular speed;
/// integrating the speed over `delta_time` gives the rotation angle θ and the
/// quaternion is `(sin(θ/2)·axis, cos(θ/2))`. Angular speeds at or below
/// [`ROTATION_EPSILON`] yield the identity.
///
/// # Example
/// ```
/// use nalgebra::{UnitQuaternion, Vector3};
/// use gyro_linear_acceleration::math::delta_rotation;
///
/// let still = delta_rotation(&Vector3::zeros(), 0.01);
/// assert_eq!(still, UnitQuaternion::identity());
/// ```
pub fn delta_rotation(angular_velocity: &Vector3<f32>, delta_time: f32) -> UnitQuaternion<f32> {
    let magnitude = angular_velocity.norm();
    let axis = angular_velocity.safe_normalize(ROTATION_EPSILON);
    if axis == Vector3::zeros() {
        return UnitQuaternion::identity();
    }

    let half_angle = magnitude * delta_time / 2.0;
    let (sin_half, cos_half) = half_angle.sin_cos();

    UnitQuaternion::new_normalize(Quaternion::new(
        cos_half,
        sin_half * axis.x,
        sin_half * axis.y,
        sin_half * axis.z,
    ))
}

/// Compose `current × delta` (delta applied in the body frame).
///
/// The product is renormalized, so the orientation stays a unit quaternion
/// and its rotation matrix stays orthonormal however long the integration
/// runs.
pub fn compose(current: &UnitQuaternion<f32>, delta: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::new_normalize(current.quaternion() * delta.quaternion())
}

/// Unit quaternion for a rotation matrix, normalized
pub fn rotation_to_quaternion(rotation: &Rotation3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::new_normalize(*UnitQuaternion::from_rotation_matrix(rotation).quaternion())
}

/// Extract azimuth, pitch and roll from a device-to-world rotation matrix
///
/// - azimuth = atan2(R01, R11)
/// - pitch = asin(-R21)
/// - roll = atan2(-R20, R22)
pub fn orientation_angles(rotation: &Rotation3<f32>) -> OrientationAngles {
    let m = rotation.matrix();

    OrientationAngles {
        azimuth: m[(0, 1)].atan2(m[(1, 1)]),
        pitch: (-m[(2, 1)]).clamp(-1.0, 1.0).asin(),
        roll: (-m[(2, 0)]).atan2(m[(2, 2)]),
    }
}

/// Project gravity onto device axes from pitch and roll
///
/// ```text
/// gx = -g·cos(pitch)·sin(roll)
/// gy = -g·sin(pitch)
/// gz =  g·cos(pitch)·cos(roll)
/// ```
pub fn gravity_components(angles: &OrientationAngles, gravity: f32) -> Vector3<f32> {
    let (sin_pitch, cos_pitch) = angles.pitch.sin_cos();
    let (sin_roll, cos_roll) = angles.roll.sin_cos();

    Vector3::new(
        -gravity * cos_pitch * sin_roll,
        -gravity * sin_pitch,
        gravity * cos_pitch * cos_roll,
    )
}

/// Device-to-world rotation from a gravity reference and a magnetic field.
///
/// The world frame is east-north-up. `east = magnetic × gravity` is the
/// horizontal axis orthogonal to both, `up` is the normalized gravity
/// reference and `north = up × east` completes the right-handed basis. The
/// three basis vectors are the rows of the returned matrix.
///
/// # Errors
/// - [`LockFailure::FreeFall`] if the gravity reference is weaker than 10%
///   of standard gravity
/// - [`LockFailure::DegenerateField`] if the magnetic field is too weak or
///   too close to parallel with gravity
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gyro_linear_acceleration::math::{orientation_angles, rotation_from_gravity_magnetic};
///
/// let gravity = Vector3::new(0.0, 0.0, 9.81);
/// let magnetic = Vector3::new(0.0, 20.0, -40.0); // device Y points north
///
/// let rotation = rotation_from_gravity_magnetic(&gravity, &magnetic).unwrap();
/// let angles = orientation_angles(&rotation);
/// assert!(angles.azimuth.abs() < 1e-6);
/// ```
pub fn rotation_from_gravity_magnetic(
    gravity: &Vector3<f32>,
    magnetic: &Vector3<f32>,
) -> Result<Rotation3<f32>, LockFailure> {
    let free_fall_threshold = FREE_FALL_FACTOR * STANDARD_GRAVITY;
    let gravity_norm_squared = gravity.norm_squared();
    if gravity_norm_squared < free_fall_threshold * free_fall_threshold {
        return Err(LockFailure::FreeFall);
    }

    let east = magnetic.cross(gravity);
    let east_norm = east.norm();
    if east_norm < MIN_HORIZONTAL_NORM {
        return Err(LockFailure::DegenerateField);
    }

    let east = east / east_norm;
    let up = gravity / gravity_norm_squared.sqrt();
    let north = up.cross(&east);

    let matrix = Matrix3::from_rows(&[east.transpose(), north.transpose(), up.transpose()]);
    Ok(Rotation3::from_matrix_unchecked(matrix))
}

/// Copy a rotation matrix into row-major order
pub fn to_row_major(rotation: &Rotation3<f32>) -> [f32; 9] {
    let transposed = rotation.matrix().transpose();
    let mut out = [0.0; 9];
    out.copy_from_slice(transposed.as_slice());
    out
}
