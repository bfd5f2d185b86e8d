//! Gyroscope integration and gravity compensation

use log::{debug, trace};
use nalgebra::{Rotation3, UnitQuaternion, Vector3};

use crate::error::FusionError;
use crate::filter::MeanFilter;
use crate::math::{compose, delta_rotation, gravity_components, orientation_angles, rotation_to_quaternion};
use crate::types::{FusionSettings, NS_TO_S, OrientationAngles, Phase, Timestamp};

/// Gyroscope-driven orientation with tilt-compensated acceleration output.
///
/// Angular velocity is integrated into a device-to-world rotation matrix that
/// starts from an absolute initial orientation (see
/// [`InitialOrientationEstimator`](crate::InitialOrientationEstimator)). On
/// every integration step the gravity vector implied by the current pitch and
/// roll is subtracted from the filtered accelerometer reading.
///
/// Two latches gate the integration:
/// - without an initial orientation, angular velocity is discarded
/// - the first angular velocity sample after seeding only records its
///   timestamp, since no interval is known yet
///
/// # Example
/// ```
/// use nalgebra::{Rotation3, Vector3};
/// use gyro_linear_acceleration::{FusionSettings, GyroFusion, Phase};
///
/// let mut fusion = GyroFusion::new(FusionSettings::default()).unwrap();
/// fusion.update_acceleration(Vector3::new(0.0, 0.0, 9.80665));
///
/// // Discarded until seeded
/// assert!(fusion.update_angular_velocity(Vector3::zeros(), 0).is_none());
///
/// fusion.seed(Rotation3::identity());
/// assert!(fusion.update_angular_velocity(Vector3::zeros(), 10_000_000).is_none());
/// assert_eq!(fusion.phase(), Phase::Running);
///
/// let linear = fusion.update_angular_velocity(Vector3::zeros(), 20_000_000).unwrap();
/// assert!(linear.norm() < 1e-5);
/// ```
#[derive(Debug, Clone)]
pub struct GyroFusion {
    /// Gravitational constant, m/s²
    gravity: f32,
    /// Rotation published by the orientation lock
    initial_rotation: Option<Rotation3<f32>>,
    /// Latched by the first angular velocity sample after seeding
    state_initialized: bool,
    /// Device-to-world rotation, kept as a unit quaternion
    current_rotation: UnitQuaternion<f32>,
    /// Timestamp of the last angular velocity sample
    previous_timestamp: Timestamp,
    acceleration_filter: MeanFilter,
    linear_filter: MeanFilter,
    /// Filtered raw acceleration
    acceleration: Vector3<f32>,
    /// Last emitted linear acceleration
    linear_acceleration: Vector3<f32>,
}

impl GyroFusion {
    pub fn new(settings: FusionSettings) -> Result<Self, FusionError> {
        Ok(Self {
            gravity: settings.gravity,
            initial_rotation: None,
            state_initialized: false,
            current_rotation: UnitQuaternion::identity(),
            previous_timestamp: 0,
            acceleration_filter: MeanFilter::new(settings.filter_window)?,
            linear_filter: MeanFilter::new(settings.filter_window)?,
            acceleration: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
        })
    }

    /// Provide the absolute initial orientation; later calls are ignored
    /// until [`reset`](Self::reset)
    pub fn seed(&mut self, rotation: Rotation3<f32>) {
        if self.initial_rotation.is_some() {
            return;
        }
        self.initial_rotation = Some(rotation);
        debug!("gyroscope integration seeded");
    }

    /// Feed a raw accelerometer reading (m/s², gravity included)
    pub fn update_acceleration(&mut self, acceleration: Vector3<f32>) {
        self.acceleration = self.acceleration_filter.filter(acceleration);
    }

    /// Feed an angular velocity reading (rad/s).
    ///
    /// Returns the filtered linear acceleration once the engine is running,
    /// `None` while unseeded and for the first sample after seeding.
    pub fn update_angular_velocity(
        &mut self,
        angular_velocity: Vector3<f32>,
        timestamp: Timestamp,
    ) -> Option<Vector3<f32>> {
        let initial_rotation = self.initial_rotation?;

        if !self.state_initialized {
            self.current_rotation =
                compose(&UnitQuaternion::identity(), &rotation_to_quaternion(&initial_rotation));
            self.previous_timestamp = timestamp;
            self.state_initialized = true;
            debug!("gyroscope integration initialized at {} ns", timestamp);
            return None;
        }

        // Clock stepping backwards integrates nothing
        let elapsed = timestamp.saturating_sub(self.previous_timestamp).max(0);
        let delta_time = elapsed as f32 * NS_TO_S;

        let delta = delta_rotation(&angular_velocity, delta_time);
        self.current_rotation = compose(&self.current_rotation, &delta);

        let angles = self.orientation();
        let gravity = gravity_components(&angles, self.gravity);

        self.linear_acceleration = self.linear_filter.filter(self.acceleration - gravity);
        self.previous_timestamp = timestamp;

        trace!(
            "dt {:.6} s, pitch {:.4}, roll {:.4}, gravity {:?}",
            delta_time, angles.pitch, angles.roll, gravity
        );

        Some(self.linear_acceleration)
    }

    pub fn phase(&self) -> Phase {
        match (self.initial_rotation.is_some(), self.state_initialized) {
            (false, _) => Phase::Unseeded,
            (true, false) => Phase::Seeded,
            (true, true) => Phase::Running,
        }
    }

    pub fn has_initial_orientation(&self) -> bool {
        self.initial_rotation.is_some()
    }

    /// Current device-to-world rotation matrix.
    ///
    /// Identity until the first angular velocity sample after seeding
    /// installs the initial orientation.
    pub fn rotation_matrix(&self) -> Rotation3<f32> {
        self.current_rotation.to_rotation_matrix()
    }

    /// Orientation angles recomputed from the current rotation matrix
    pub fn orientation(&self) -> OrientationAngles {
        orientation_angles(&self.rotation_matrix())
    }

    /// Gravity projected onto device axes for the current orientation
    pub fn gravity_components(&self) -> Vector3<f32> {
        gravity_components(&self.orientation(), self.gravity)
    }

    /// Filtered raw acceleration
    pub fn acceleration(&self) -> Vector3<f32> {
        self.acceleration
    }

    /// Last emitted linear acceleration in device axes
    pub fn linear_acceleration(&self) -> Vector3<f32> {
        self.linear_acceleration
    }

    /// Last emitted linear acceleration rotated into the world frame
    pub fn earth_linear_acceleration(&self) -> Vector3<f32> {
        self.current_rotation * self.linear_acceleration
    }

    /// Timestamp of the last integrated angular velocity sample
    pub fn previous_timestamp(&self) -> Timestamp {
        self.previous_timestamp
    }

    /// Return to identity/zero and clear both latches
    pub fn reset(&mut self) {
        self.initial_rotation = None;
        self.state_initialized = false;
        self.current_rotation = UnitQuaternion::identity();
        self.previous_timestamp = 0;
        self.acceleration_filter.reset();
        self.linear_filter.reset();
        self.acceleration = Vector3::zeros();
        self.linear_acceleration = Vector3::zeros();
    }
}
