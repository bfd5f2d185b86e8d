//! Fixed axis remap for the alternate device mounting
//!
//! In the alternate (landscape / vehicle) mounting the device is turned so its
//! camera axis faces forward. Every channel then rotates its raw samples by
//! 90° about X followed by -90° about Y before publishing them. The composite
//! rotation is a pure axis permutation:
//!
//! ```text
//! (x, y, z) -> (-y, -z, x)
//! ```
//!
//! # Example
//! ```
//! use nalgebra::Vector3;
//! use gyro_linear_acceleration::MountingMode;
//!
//! let sensor = Vector3::new(1.0, 2.0, 3.0);
//!
//! assert_eq!(MountingMode::Standard.remap(sensor), sensor);
//! assert_eq!(MountingMode::Alternate.remap(sensor), Vector3::new(-2.0, -3.0, 1.0));
//! ```

use nalgebra::Vector3;

/// Device mounting describing how raw sensor axes map to published axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountingMode {
    /// Sensor axes are published unchanged
    #[default]
    Standard,
    /// Sensor axes are rotated by Ry(-90°)·Rx(90°)
    Alternate,
}

impl MountingMode {
    /// Mounting for the host's "alternate mounting mode" switch
    pub fn from_alternate(enabled: bool) -> Self {
        if enabled {
            MountingMode::Alternate
        } else {
            MountingMode::Standard
        }
    }

    pub fn is_alternate(&self) -> bool {
        *self == MountingMode::Alternate
    }

    /// Remap a raw sensor vector into published axes
    #[inline]
    pub fn remap(&self, sensor: Vector3<f32>) -> Vector3<f32> {
        match self {
            MountingMode::Standard => sensor,
            MountingMode::Alternate => Vector3::new(-sensor.y, -sensor.z, sensor.x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_standard_is_identity() {
        let sensor = Vector3::new(1.0, -2.0, 3.0);
        assert_eq!(MountingMode::Standard.remap(sensor), sensor);
    }

    #[test]
    fn test_alternate_matches_composite_rotation() {
        // 90° about X first, then -90° about Y
        let x_rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        let y_rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2);
        let composite = y_rotation * x_rotation;

        let vectors = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-5.0, 0.5, 9.81),
        ];

        for v in vectors {
            let expected = composite * v;
            let remapped = MountingMode::Alternate.remap(v);
            assert!(
                (remapped - expected).norm() < 1e-5,
                "remap of {:?} gave {:?}, expected {:?}",
                v,
                remapped,
                expected
            );
        }
    }

    #[test]
    fn test_alternate_preserves_magnitude() {
        let sensor = Vector3::new(0.3, -4.0, 2.5);
        let remapped = MountingMode::Alternate.remap(sensor);
        assert!((remapped.norm() - sensor.norm()).abs() < 1e-6);
    }

    #[test]
    fn test_from_alternate() {
        assert_eq!(MountingMode::from_alternate(true), MountingMode::Alternate);
        assert_eq!(MountingMode::from_alternate(false), MountingMode::Standard);
        assert!(MountingMode::Alternate.is_alternate());
        assert!(!MountingMode::default().is_alternate());
    }
}
