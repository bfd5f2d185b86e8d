//! Linear acceleration engine wiring channel sources to the fusion core

use log::debug;
use nalgebra::{Rotation3, Vector3};

use crate::channel::{ChannelSource, SensorDriver};
use crate::error::FusionError;
use crate::estimator::InitialOrientationEstimator;
use crate::fusion::GyroFusion;
use crate::listener::{ListenerRegistry, SharedListener, Subscriber, Subscription};
use crate::mounting::MountingMode;
use crate::types::{
    ChannelKind, FusionSettings, OrientationAngles, Phase, Sample, SensorAccuracy, Timestamp,
};

/// Root of the pipeline: four channel sources, the initial orientation
/// estimator and the gyroscope fusion core.
///
/// The engine owns every channel source and subscribes to each of them as
/// their owner while started. The host forwards every platform sensor
/// callback to [`on_sensor_changed`](Self::on_sensor_changed); the engine
/// routes it through the matching channel, which remaps the sample and
/// delivers it to its listeners and, in registration order, to the engine.
///
/// All entry points take `&mut self`, so callbacks for one engine are
/// serialized by construction. Listener handles are not `Send`, which keeps
/// an engine and its listeners on a single execution context.
///
/// # Example
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use nalgebra::Vector3;
/// use gyro_linear_acceleration::{ChannelKind, LinearAccelerationEngine, NoopDriver, Sample, SharedListener};
///
/// let mut engine = LinearAccelerationEngine::new(|_| NoopDriver).unwrap();
///
/// let output = Rc::new(RefCell::new(Vec::new()));
/// let sink = output.clone();
/// let listener: SharedListener = Rc::new(RefCell::new(move |sample: &Sample| {
///     sink.borrow_mut().push(*sample);
/// }));
/// engine.register_listener(listener);
/// engine.start();
///
/// // Bootstrap the initial orientation
/// for i in 0..31 {
///     engine.on_sensor_changed(ChannelKind::Gravity, Vector3::new(0.0, 0.0, 9.81), i);
///     engine.on_sensor_changed(ChannelKind::MagneticField, Vector3::new(20.0, 0.0, -40.0), i);
/// }
/// assert!(engine.has_initial_orientation());
///
/// engine.on_sensor_changed(ChannelKind::Acceleration, Vector3::new(0.0, 0.0, 9.81), 0);
/// engine.on_sensor_changed(ChannelKind::AngularVelocity, Vector3::zeros(), 10_000_000);
/// engine.on_sensor_changed(ChannelKind::AngularVelocity, Vector3::zeros(), 20_000_000);
///
/// assert_eq!(output.borrow().len(), 1);
/// ```
#[derive(Debug)]
pub struct LinearAccelerationEngine<D> {
    settings: FusionSettings,
    angular_velocity: ChannelSource<D>,
    acceleration: ChannelSource<D>,
    gravity: ChannelSource<D>,
    magnetic_field: ChannelSource<D>,
    estimator: InitialOrientationEstimator,
    fusion: GyroFusion,
    listeners: ListenerRegistry,
    running: bool,
}

impl<D: SensorDriver> LinearAccelerationEngine<D> {
    /// Create a stopped engine with default settings.
    ///
    /// `driver` is called once per channel to build its hardware driver.
    pub fn new<F>(driver: F) -> Result<Self, FusionError>
    where
        F: FnMut(ChannelKind) -> D,
    {
        Self::with_settings(FusionSettings::default(), driver)
    }

    /// Create a stopped engine with the given settings
    ///
    /// # Errors
    /// [`FusionError::InvalidConfiguration`] if `settings.filter_window` is zero.
    pub fn with_settings<F>(settings: FusionSettings, mut driver: F) -> Result<Self, FusionError>
    where
        F: FnMut(ChannelKind) -> D,
    {
        let mut channel = |kind| {
            let mut source = ChannelSource::new(kind, driver(kind));
            source.set_mounting(settings.mounting);
            source
        };

        Ok(Self {
            settings,
            angular_velocity: channel(ChannelKind::AngularVelocity),
            acceleration: channel(ChannelKind::Acceleration),
            gravity: channel(ChannelKind::Gravity),
            magnetic_field: channel(ChannelKind::MagneticField),
            estimator: InitialOrientationEstimator::new(
                settings.filter_window,
                settings.min_sample_count,
            )?,
            fusion: GyroFusion::new(settings)?,
            listeners: ListenerRegistry::new(),
            running: false,
        })
    }

    /// Arm the bootstrap and subscribe to all four channels.
    ///
    /// Starting an engine that is already running has no effect.
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        self.reset_state();
        for kind in ChannelKind::ALL {
            self.channel_mut(kind).attach_owner();
        }
        self.running = true;
        debug!("linear acceleration engine started");
    }

    /// Unsubscribe from all channels and reset to identity/zero.
    ///
    /// Idempotent; a later [`start`](Self::start) bootstraps from scratch.
    pub fn stop(&mut self) {
        for kind in ChannelKind::ALL {
            self.channel_mut(kind).detach_owner();
        }
        self.reset_state();

        if self.running {
            self.running = false;
            debug!("linear acceleration engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Switch the fixed axis remap on every channel
    pub fn set_alternate_mounting_mode(&mut self, enabled: bool) {
        let mounting = MountingMode::from_alternate(enabled);
        self.settings.mounting = mounting;
        for kind in ChannelKind::ALL {
            self.channel_mut(kind).set_mounting(mounting);
        }
        debug!("mounting set to {:?}", mounting);
    }

    /// Register a listener for linear acceleration output
    pub fn register_listener(&mut self, listener: SharedListener) -> bool {
        self.listeners.insert(Subscriber::Listener(listener))
    }

    /// Remove a linear acceleration listener
    pub fn remove_listener(&mut self, listener: &SharedListener) -> bool {
        self.listeners.remove(&Subscriber::Listener(listener.clone()))
    }

    /// Platform callback: a new raw measurement on `kind`
    pub fn on_sensor_changed(&mut self, kind: ChannelKind, values: Vector3<f32>, timestamp: Timestamp) {
        let Self {
            angular_velocity,
            acceleration,
            gravity,
            magnetic_field,
            estimator,
            fusion,
            listeners,
            ..
        } = self;

        match kind {
            ChannelKind::AngularVelocity => {
                let mut output = None;
                angular_velocity.publish(values, timestamp, |sample| {
                    output = fusion.update_angular_velocity(sample.vector, sample.timestamp);
                    Subscription::Keep
                });

                if let Some(linear) = output {
                    listeners.notify(&Sample::new(linear, timestamp));
                }
            }
            ChannelKind::Acceleration => {
                acceleration.publish(values, timestamp, |sample| {
                    fusion.update_acceleration(sample.vector);
                    Subscription::Keep
                });
            }
            ChannelKind::Gravity => {
                let mut lock = None;
                gravity.publish(values, timestamp, |sample| {
                    lock = estimator.on_gravity(sample.vector);
                    detach_when_locked(estimator)
                });

                if let Some(rotation) = lock {
                    Self::seed(fusion, magnetic_field, rotation);
                }
            }
            ChannelKind::MagneticField => {
                let mut lock = None;
                magnetic_field.publish(values, timestamp, |sample| {
                    lock = estimator.on_magnetic(sample.vector);
                    detach_when_locked(estimator)
                });

                if let Some(rotation) = lock {
                    Self::seed(fusion, gravity, rotation);
                }
            }
        }
    }

    /// Platform callback: accuracy change on `kind`, ignored
    pub fn on_accuracy_changed(&mut self, kind: ChannelKind, accuracy: SensorAccuracy) {
        self.channel_mut(kind).on_accuracy_changed(accuracy);
    }

    /// Publish the lock to the fusion core and leave the other reference
    /// channel; the channel that delivered the lock has already dropped us.
    fn seed(fusion: &mut GyroFusion, other: &mut ChannelSource<D>, rotation: Rotation3<f32>) {
        fusion.seed(rotation);
        other.detach_owner();
        debug!("orientation lock published, reference channels released");
    }

    fn reset_state(&mut self) {
        self.estimator.reset();
        self.fusion.reset();
    }

    pub fn channel(&self, kind: ChannelKind) -> &ChannelSource<D> {
        match kind {
            ChannelKind::AngularVelocity => &self.angular_velocity,
            ChannelKind::Acceleration => &self.acceleration,
            ChannelKind::Gravity => &self.gravity,
            ChannelKind::MagneticField => &self.magnetic_field,
        }
    }

    /// Mutable access to a channel, e.g. to register raw-sample listeners
    pub fn channel_mut(&mut self, kind: ChannelKind) -> &mut ChannelSource<D> {
        match kind {
            ChannelKind::AngularVelocity => &mut self.angular_velocity,
            ChannelKind::Acceleration => &mut self.acceleration,
            ChannelKind::Gravity => &mut self.gravity,
            ChannelKind::MagneticField => &mut self.magnetic_field,
        }
    }

    /// Whether the engine is currently subscribed to `kind`
    pub fn is_subscribed(&self, kind: ChannelKind) -> bool {
        self.channel(kind).has_owner()
    }

    pub fn settings(&self) -> FusionSettings {
        self.settings
    }

    pub fn estimator(&self) -> &InitialOrientationEstimator {
        &self.estimator
    }

    pub fn phase(&self) -> Phase {
        self.fusion.phase()
    }

    pub fn has_initial_orientation(&self) -> bool {
        self.fusion.has_initial_orientation()
    }

    /// Current device-to-world rotation matrix
    pub fn rotation_matrix(&self) -> Rotation3<f32> {
        self.fusion.rotation_matrix()
    }

    /// Orientation angles recomputed from the current rotation matrix
    pub fn orientation(&self) -> OrientationAngles {
        self.fusion.orientation()
    }

    /// Gravity projected onto device axes for the current orientation
    pub fn gravity_components(&self) -> Vector3<f32> {
        self.fusion.gravity_components()
    }

    /// Last emitted linear acceleration in device axes
    pub fn linear_acceleration(&self) -> Vector3<f32> {
        self.fusion.linear_acceleration()
    }

    /// Last emitted linear acceleration in the world frame
    pub fn earth_linear_acceleration(&self) -> Vector3<f32> {
        self.fusion.earth_linear_acceleration()
    }
}

fn detach_when_locked(estimator: &InitialOrientationEstimator) -> Subscription {
    if estimator.is_locked() {
        Subscription::Cancel
    } else {
        Subscription::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NoopDriver;

    fn engine() -> LinearAccelerationEngine<NoopDriver> {
        LinearAccelerationEngine::new(|_| NoopDriver).unwrap()
    }

    fn bootstrap(engine: &mut LinearAccelerationEngine<NoopDriver>) {
        for i in 0..31 {
            engine.on_sensor_changed(ChannelKind::Gravity, Vector3::new(0.0, 0.0, 9.81), i);
            engine.on_sensor_changed(ChannelKind::MagneticField, Vector3::new(20.0, 0.0, -40.0), i);
        }
    }

    #[test]
    fn test_new_engine_is_stopped() {
        let engine = engine();
        assert!(!engine.is_running());
        assert_eq!(engine.phase(), Phase::Unseeded);
        for kind in ChannelKind::ALL {
            assert!(!engine.is_subscribed(kind));
            assert!(!engine.channel(kind).is_enabled());
        }
    }

    #[test]
    fn test_invalid_settings() {
        let settings = FusionSettings {
            filter_window: 0,
            ..Default::default()
        };
        let result = LinearAccelerationEngine::with_settings(settings, |_| NoopDriver);
        assert!(matches!(
            result,
            Err(FusionError::InvalidConfiguration { window_size: 0 })
        ));
    }

    #[test]
    fn test_start_subscribes_all_channels() {
        let mut engine = engine();
        engine.start();

        for kind in ChannelKind::ALL {
            assert!(engine.is_subscribed(kind));
            assert!(engine.channel(kind).is_enabled());
        }
    }

    #[test]
    fn test_stopped_engine_ignores_samples() {
        let mut engine = engine();
        bootstrap(&mut engine);

        assert!(!engine.has_initial_orientation());
        assert_eq!(engine.estimator().gravity_sample_count(), 0);
    }

    #[test]
    fn test_lock_releases_reference_channels() {
        let mut engine = engine();
        engine.start();
        bootstrap(&mut engine);

        assert!(engine.has_initial_orientation());
        assert_eq!(engine.phase(), Phase::Seeded);
        assert!(!engine.is_subscribed(ChannelKind::Gravity));
        assert!(!engine.is_subscribed(ChannelKind::MagneticField));
        assert!(!engine.channel(ChannelKind::Gravity).is_enabled());
        assert!(!engine.channel(ChannelKind::MagneticField).is_enabled());
        assert!(engine.is_subscribed(ChannelKind::AngularVelocity));
        assert!(engine.is_subscribed(ChannelKind::Acceleration));
    }

    #[test]
    fn test_stop_resets_and_restart_rearms() {
        let mut engine = engine();
        engine.start();
        bootstrap(&mut engine);
        engine.on_sensor_changed(ChannelKind::AngularVelocity, Vector3::zeros(), 0);
        assert_eq!(engine.phase(), Phase::Running);

        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.phase(), Phase::Unseeded);
        assert_eq!(engine.rotation_matrix(), Rotation3::identity());
        for kind in ChannelKind::ALL {
            assert!(!engine.is_subscribed(kind));
        }

        engine.start();
        assert!(engine.is_subscribed(ChannelKind::Gravity));
        assert_eq!(engine.estimator().gravity_sample_count(), 0);
        assert!(!engine.has_initial_orientation());
    }

    #[test]
    fn test_alternate_mounting_applies_to_all_channels() {
        let mut engine = engine();
        engine.set_alternate_mounting_mode(true);

        assert_eq!(engine.settings().mounting, MountingMode::Alternate);
        for kind in ChannelKind::ALL {
            assert_eq!(engine.channel(kind).mounting(), MountingMode::Alternate);
        }

        engine.set_alternate_mounting_mode(false);
        for kind in ChannelKind::ALL {
            assert_eq!(engine.channel(kind).mounting(), MountingMode::Standard);
        }
    }

    #[test]
    fn test_output_listener_registration_is_idempotent() {
        let mut engine = engine();
        let listener: SharedListener = std::rc::Rc::new(std::cell::RefCell::new(|_: &Sample| {}));

        assert!(engine.register_listener(listener.clone()));
        assert!(!engine.register_listener(listener.clone()));
        assert!(engine.remove_listener(&listener));
        assert!(!engine.remove_listener(&listener));
    }
}
