//! Channel sources wrapping one hardware measurement stream each
//!
//! A channel source owns the driver of its stream and a registry of
//! listeners. The driver is powered exactly while at least one listener is
//! registered. Raw samples pushed by the host are remapped for the current
//! [`MountingMode`], stamped and delivered to every listener in
//! registration order.
//!
//! # Example
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use nalgebra::Vector3;
//! use gyro_linear_acceleration::{ChannelKind, ChannelSource, NoopDriver, Sample, SharedListener};
//!
//! let mut gyroscope = ChannelSource::new(ChannelKind::AngularVelocity, NoopDriver);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let listener: SharedListener = Rc::new(RefCell::new(move |sample: &Sample| {
//!     sink.borrow_mut().push(*sample);
//! }));
//!
//! gyroscope.register_listener(listener.clone());
//! assert!(gyroscope.is_enabled());
//!
//! gyroscope.on_sensor_changed(Vector3::new(0.0, 0.0, 0.1), 1_000);
//! assert_eq!(seen.borrow().len(), 1);
//!
//! gyroscope.remove_listener(&listener);
//! assert!(!gyroscope.is_enabled());
//! ```

use log::{debug, trace};
use nalgebra::Vector3;

use crate::listener::{ListenerRegistry, SharedListener, Subscriber, Subscription};
use crate::mounting::MountingMode;
use crate::types::{ChannelKind, Sample, SensorAccuracy, Timestamp};

/// Power control for the hardware behind one channel
///
/// A channel calls [`enable`](SensorDriver::enable) when its first listener
/// registers and [`disable`](SensorDriver::disable) when its last listener
/// leaves, never twice in a row.
pub trait SensorDriver {
    /// Start delivering samples for this channel
    fn enable(&mut self);

    /// Stop delivering samples for this channel
    fn disable(&mut self);
}

/// Driver for hosts that manage sensor power themselves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopDriver;

impl SensorDriver for NoopDriver {
    fn enable(&mut self) {}

    fn disable(&mut self) {}
}

/// One hardware measurement stream with its listeners
#[derive(Debug)]
pub struct ChannelSource<D> {
    kind: ChannelKind,
    driver: D,
    mounting: MountingMode,
    subscribers: ListenerRegistry,
    enabled: bool,
    last_sample: Option<Sample>,
}

impl<D: SensorDriver> ChannelSource<D> {
    /// Create a channel with no listeners and its driver disabled
    pub fn new(kind: ChannelKind, driver: D) -> Self {
        Self {
            kind,
            driver,
            mounting: MountingMode::Standard,
            subscribers: ListenerRegistry::new(),
            enabled: false,
            last_sample: None,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Register a listener; returns `false` if it was already registered
    pub fn register_listener(&mut self, listener: SharedListener) -> bool {
        self.subscribe(Subscriber::Listener(listener))
    }

    /// Remove a listener; returns `false` if it was not registered
    pub fn remove_listener(&mut self, listener: &SharedListener) -> bool {
        self.unsubscribe(&Subscriber::Listener(listener.clone()))
    }

    /// Number of registered subscribers, including an owning engine
    pub fn listener_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether the driver is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mounting(&self) -> MountingMode {
        self.mounting
    }

    /// Select the axis remap applied to subsequent samples
    pub fn set_mounting(&mut self, mounting: MountingMode) {
        self.mounting = mounting;
    }

    /// Most recent sample published by this channel, after remapping
    pub fn last_sample(&self) -> Option<Sample> {
        self.last_sample
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Hardware callback: publish a raw measurement to every listener
    pub fn on_sensor_changed(&mut self, values: Vector3<f32>, timestamp: Timestamp) {
        self.publish(values, timestamp, |_| Subscription::Keep);
    }

    /// Hardware callback for accuracy changes; accuracy is not used
    pub fn on_accuracy_changed(&mut self, accuracy: SensorAccuracy) {
        trace!("{:?} accuracy changed to {:?}, ignored", self.kind, accuracy);
    }

    /// Publish a measurement, feeding the owner entry through `owner`
    pub(crate) fn publish<F>(&mut self, values: Vector3<f32>, timestamp: Timestamp, owner: F) -> Sample
    where
        F: FnMut(&Sample) -> Subscription,
    {
        let sample = Sample::new(self.mounting.remap(values), timestamp);
        self.last_sample = Some(sample);

        let before = self.subscribers.len();
        self.subscribers.dispatch(&sample, owner);
        if self.subscribers.len() != before {
            self.update_power();
        }

        sample
    }

    /// Subscribe the owning engine
    pub(crate) fn attach_owner(&mut self) -> bool {
        self.subscribe(Subscriber::Owner)
    }

    /// Unsubscribe the owning engine
    pub(crate) fn detach_owner(&mut self) -> bool {
        self.unsubscribe(&Subscriber::Owner)
    }

    pub(crate) fn has_owner(&self) -> bool {
        self.subscribers.contains(&Subscriber::Owner)
    }

    fn subscribe(&mut self, subscriber: Subscriber) -> bool {
        let added = self.subscribers.insert(subscriber);
        if added {
            self.update_power();
        }
        added
    }

    fn unsubscribe(&mut self, subscriber: &Subscriber) -> bool {
        let removed = self.subscribers.remove(subscriber);
        if removed {
            self.update_power();
        }
        removed
    }

    fn update_power(&mut self) {
        let wanted = !self.subscribers.is_empty();
        if wanted && !self.enabled {
            self.driver.enable();
            self.enabled = true;
            debug!("{:?} channel enabled", self.kind);
        } else if !wanted && self.enabled {
            self.driver.disable();
            self.enabled = false;
            debug!("{:?} channel disabled", self.kind);
        }
    }
}
