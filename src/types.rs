//! Core types and conventions for the linear acceleration engine

use nalgebra::Vector3;

use crate::math::RAD_TO_DEG;
use crate::mounting::MountingMode;

/// Source-clock timestamp in nanoseconds.
///
/// Only differences between consecutive samples of the same channel are
/// meaningful; timestamps of different channels are never compared.
pub type Timestamp = i64;

/// Nanoseconds to seconds
pub const NS_TO_S: f32 = 1.0 / 1_000_000_000.0;

/// Standard Earth gravity in m/s²
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// A single stamped measurement as delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Measured quantity in device axes
    pub vector: Vector3<f32>,
    /// Source-provided timestamp in nanoseconds
    pub timestamp: Timestamp,
}

impl Sample {
    pub fn new(vector: Vector3<f32>, timestamp: Timestamp) -> Self {
        Self { vector, timestamp }
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::new(Vector3::zeros(), 0)
    }
}

/// The four hardware measurement streams consumed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Gyroscope, rad/s
    AngularVelocity,
    /// Raw accelerometer including gravity, m/s²
    Acceleration,
    /// Sensor-provided gravity estimate, m/s²
    Gravity,
    /// Magnetometer, device units
    MagneticField,
}

impl ChannelKind {
    /// All channels in the order the engine subscribes to them
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::AngularVelocity,
        ChannelKind::Acceleration,
        ChannelKind::Gravity,
        ChannelKind::MagneticField,
    ];
}

/// Accuracy level reported by the platform alongside a channel.
///
/// Accepted so hosts can forward every platform callback, but not used
/// by any computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    #[default]
    High,
}

/// Orientation angles derived from a rotation matrix
///
/// Follows the platform `getOrientation` convention:
/// - **azimuth**: rotation about the world vertical axis
/// - **pitch**: rotation about the device X axis
/// - **roll**: rotation about the device Y axis
///
/// Always recomputed from the rotation matrix, never integrated directly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationAngles {
    /// Radians, range [-π, π]
    pub azimuth: f32,
    /// Radians, range [-π/2, π/2]
    pub pitch: f32,
    /// Radians, range [-π, π]
    pub roll: f32,
}

impl OrientationAngles {
    /// Angles converted to degrees as (azimuth, pitch, roll)
    pub fn to_degrees(&self) -> Vector3<f32> {
        Vector3::new(self.azimuth, self.pitch, self.roll) * RAD_TO_DEG
    }
}

/// Engine settings
///
/// # Example
/// ```
/// use gyro_linear_acceleration::{FusionSettings, MountingMode};
///
/// let settings = FusionSettings {
///     filter_window: 20,             // heavier smoothing
///     mounting: MountingMode::Alternate,
///     ..Default::default()
/// };
/// assert_eq!(settings.min_sample_count, 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionSettings {
    /// Window size of every moving-average filter (must be positive)
    pub filter_window: usize,
    /// Number of gravity and magnetic samples each channel must exceed
    /// before the initial orientation is attempted
    pub min_sample_count: u32,
    /// Gravitational constant projected onto device axes, m/s²
    pub gravity: f32,
    /// Axis remap applied by every channel source
    pub mounting: MountingMode,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            filter_window: 10,
            min_sample_count: 30,
            gravity: STANDARD_GRAVITY,
            mounting: MountingMode::Standard,
        }
    }
}

/// Bootstrap phase of the fusion engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No initial orientation yet; angular velocity is discarded
    Unseeded,
    /// Initial orientation known; waiting for the first angular velocity sample
    Seeded,
    /// Integrating and emitting linear acceleration
    Running,
}
