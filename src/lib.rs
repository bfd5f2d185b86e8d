//! [![license]](https://opensource.org/licenses/MIT)
//!
//! [license]: https://img.shields.io/badge/License-MIT-blue.svg?style=for-the-badge&labelColor=555555
//!
//! Gyro linear acceleration - gravity-free device acceleration from a gyroscope driven orientation
//!
//! The library seeds a device-to-world rotation once from smoothed gravity and
//! magnetic field references, then keeps it current by integrating angular
//! velocity alone. Every gyroscope sample produces a linear acceleration: the
//! latest accelerometer reading minus gravity projected onto device axes for
//! the integrated orientation.
//!
//! # Features
//!
//! - Moving-average smoothing of the reference vectors
//! - One-shot initial orientation lock, after which reference channels are released
//! - Gyroscope integration with the rotation kept on SO(3)
//! - Channel sources that power their hardware only while someone listens
//! - Alternate mounting remap for devices whose sensor axes are rotated
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use gyro_linear_acceleration::{ChannelKind, LinearAccelerationEngine, NoopDriver};
//!
//! let mut engine = LinearAccelerationEngine::new(|_| NoopDriver).unwrap();
//! engine.start();
//!
//! // Platform sensor callbacks, timestamps in nanoseconds
//! for i in 0..31 {
//!     engine.on_sensor_changed(ChannelKind::Gravity, Vector3::new(0.0, 0.0, 9.81), i);
//!     engine.on_sensor_changed(ChannelKind::MagneticField, Vector3::new(20.0, 0.0, -40.0), i);
//! }
//! engine.on_sensor_changed(ChannelKind::Acceleration, Vector3::new(0.5, 0.0, 9.80665), 0);
//! engine.on_sensor_changed(ChannelKind::AngularVelocity, Vector3::zeros(), 0);
//! engine.on_sensor_changed(ChannelKind::AngularVelocity, Vector3::zeros(), 10_000_000);
//!
//! let linear = engine.linear_acceleration();
//! assert!((linear.x - 0.5).abs() < 1e-3);
//! assert!(linear.z.abs() < 1e-3);
//!
//! let angles = engine.orientation().to_degrees();
//! assert!(angles.y.abs() < 1e-3);
//! ```

mod channel;
mod engine;
pub mod error;
mod estimator;
mod filter;
mod fusion;
mod listener;
pub mod math;
mod mounting;
mod types;

// Re-export all public types
pub use channel::{ChannelSource, NoopDriver, SensorDriver};
pub use engine::LinearAccelerationEngine;
pub use error::{FusionError, LockFailure};
pub use estimator::{EstimatorState, InitialOrientationEstimator};
pub use filter::MeanFilter;
pub use fusion::GyroFusion;
pub use listener::{SampleListener, SharedListener};
pub use math::{RAD_TO_DEG, Vector3Ext};
pub use mounting::MountingMode;
pub use types::*;
