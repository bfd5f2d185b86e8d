//! One-shot initial orientation from gravity and magnetic references

use log::debug;
use nalgebra::{Rotation3, Vector3};

use crate::error::FusionError;
use crate::filter::MeanFilter;
use crate::math::rotation_from_gravity_magnetic;

/// Estimator state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimatorState {
    /// Collecting filtered samples and attempting a lock
    Accumulating,
    /// Initial orientation found; further samples are ignored
    Locked(Rotation3<f32>),
}

/// Finds the device-to-world rotation used to seed gyroscope integration.
///
/// Gravity and magnetic samples arrive as independent streams and are each
/// smoothed by a moving-average filter. Once both streams have delivered
/// more than `min_sample_count` samples, every further sample on either
/// stream attempts the computation until it succeeds. The transition depends
/// only on the two counters and the outcome, never on which stream arrived
/// last.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gyro_linear_acceleration::InitialOrientationEstimator;
///
/// let mut estimator = InitialOrientationEstimator::new(10, 30).unwrap();
/// let gravity = Vector3::new(0.0, 0.0, 9.81);
/// let magnetic = Vector3::new(20.0, 0.0, -40.0);
///
/// let mut lock = None;
/// for _ in 0..31 {
///     lock = lock.or(estimator.on_gravity(gravity));
///     lock = lock.or(estimator.on_magnetic(magnetic));
/// }
/// assert!(lock.is_some());
/// assert!(estimator.is_locked());
/// ```
#[derive(Debug, Clone)]
pub struct InitialOrientationEstimator {
    state: EstimatorState,
    min_sample_count: u32,
    gravity_filter: MeanFilter,
    magnetic_filter: MeanFilter,
    gravity: Vector3<f32>,
    magnetic: Vector3<f32>,
    gravity_count: u32,
    magnetic_count: u32,
    attempts: u32,
}

impl InitialOrientationEstimator {
    /// Create an estimator smoothing each input over `filter_window` samples
    pub fn new(filter_window: usize, min_sample_count: u32) -> Result<Self, FusionError> {
        Ok(Self {
            state: EstimatorState::Accumulating,
            min_sample_count,
            gravity_filter: MeanFilter::new(filter_window)?,
            magnetic_filter: MeanFilter::new(filter_window)?,
            gravity: Vector3::zeros(),
            magnetic: Vector3::zeros(),
            gravity_count: 0,
            magnetic_count: 0,
            attempts: 0,
        })
    }

    /// Feed a gravity reference sample.
    ///
    /// Returns the rotation on the sample that completes the lock, `None`
    /// otherwise (including every sample after the lock).
    pub fn on_gravity(&mut self, gravity: Vector3<f32>) -> Option<Rotation3<f32>> {
        if self.is_locked() {
            return None;
        }

        self.gravity = self.gravity_filter.filter(gravity);
        self.gravity_count = self.gravity_count.saturating_add(1);
        self.try_lock()
    }

    /// Feed a magnetic field sample; see [`on_gravity`](Self::on_gravity)
    pub fn on_magnetic(&mut self, magnetic: Vector3<f32>) -> Option<Rotation3<f32>> {
        if self.is_locked() {
            return None;
        }

        self.magnetic = self.magnetic_filter.filter(magnetic);
        self.magnetic_count = self.magnetic_count.saturating_add(1);
        self.try_lock()
    }

    fn try_lock(&mut self) -> Option<Rotation3<f32>> {
        if self.gravity_count <= self.min_sample_count || self.magnetic_count <= self.min_sample_count {
            return None;
        }

        self.attempts = self.attempts.saturating_add(1);
        match rotation_from_gravity_magnetic(&self.gravity, &self.magnetic) {
            Ok(rotation) => {
                debug!(
                    "initial orientation locked after {} gravity / {} magnetic samples",
                    self.gravity_count, self.magnetic_count
                );
                self.state = EstimatorState::Locked(rotation);
                Some(rotation)
            }
            Err(failure) => {
                debug!("initial orientation attempt {} failed: {}", self.attempts, failure);
                None
            }
        }
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, EstimatorState::Locked(_))
    }

    /// Locked rotation, if any
    pub fn rotation(&self) -> Option<Rotation3<f32>> {
        match self.state {
            EstimatorState::Locked(rotation) => Some(rotation),
            EstimatorState::Accumulating => None,
        }
    }

    pub fn gravity_sample_count(&self) -> u32 {
        self.gravity_count
    }

    pub fn magnetic_sample_count(&self) -> u32 {
        self.magnetic_count
    }

    /// Number of lock computations performed, successful or not
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Re-arm: clear counters, filters and any lock
    pub fn reset(&mut self) {
        self.state = EstimatorState::Accumulating;
        self.gravity_filter.reset();
        self.magnetic_filter.reset();
        self.gravity = Vector3::zeros();
        self.magnetic = Vector3::zeros();
        self.gravity_count = 0;
        self.magnetic_count = 0;
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::orientation_angles;

    fn gravity() -> Vector3<f32> {
        Vector3::new(0.0, 0.0, 9.81)
    }

    fn magnetic() -> Vector3<f32> {
        Vector3::new(20.0, 0.0, -40.0)
    }

    fn estimator() -> InitialOrientationEstimator {
        InitialOrientationEstimator::new(10, 30).unwrap()
    }

    #[test]
    fn test_no_attempt_below_threshold() {
        let mut estimator = estimator();

        for _ in 0..30 {
            assert!(estimator.on_gravity(gravity()).is_none());
            assert!(estimator.on_magnetic(magnetic()).is_none());
        }
        assert_eq!(estimator.attempts(), 0);

        // Gravity alone past the threshold is not enough
        for _ in 0..100 {
            assert!(estimator.on_gravity(gravity()).is_none());
        }
        assert_eq!(estimator.attempts(), 0);
        assert_eq!(estimator.state(), EstimatorState::Accumulating);
    }

    #[test]
    fn test_locks_on_31st_pair() {
        let mut estimator = estimator();

        for _ in 0..30 {
            estimator.on_gravity(gravity());
            estimator.on_magnetic(magnetic());
        }
        assert!(estimator.on_gravity(gravity()).is_none());
        let rotation = estimator.on_magnetic(magnetic()).expect("lock on 31st magnetic sample");

        assert!(estimator.is_locked());
        assert_eq!(estimator.rotation(), Some(rotation));
        assert_eq!(estimator.attempts(), 1);

        let angles = orientation_angles(&rotation);
        assert!(angles.pitch.abs() < 1e-5);
        assert!(angles.roll.abs() < 1e-5);
    }

    #[test]
    fn test_lock_independent_of_arrival_order() {
        // All magnetic samples first, then gravity
        let mut estimator = estimator();
        for _ in 0..31 {
            assert!(estimator.on_magnetic(magnetic()).is_none());
        }
        for _ in 0..30 {
            assert!(estimator.on_gravity(gravity()).is_none());
        }
        assert!(estimator.on_gravity(gravity()).is_some());
    }

    #[test]
    fn test_locked_ignores_further_samples() {
        let mut estimator = estimator();
        for _ in 0..31 {
            estimator.on_gravity(gravity());
            estimator.on_magnetic(magnetic());
        }
        assert!(estimator.is_locked());
        let attempts = estimator.attempts();
        let counts = (estimator.gravity_sample_count(), estimator.magnetic_sample_count());

        for _ in 0..50 {
            assert!(estimator.on_gravity(Vector3::new(9.81, 0.0, 0.0)).is_none());
            assert!(estimator.on_magnetic(magnetic()).is_none());
        }

        assert_eq!(estimator.attempts(), attempts);
        assert_eq!(
            (estimator.gravity_sample_count(), estimator.magnetic_sample_count()),
            counts
        );
    }

    #[test]
    fn test_failure_keeps_accumulating_and_retries() {
        let mut estimator = estimator();
        let parallel = Vector3::new(0.0, 0.0, -40.0);

        for _ in 0..31 {
            estimator.on_gravity(gravity());
            estimator.on_magnetic(parallel);
        }
        assert!(!estimator.is_locked());
        assert!(estimator.attempts() > 0);

        // A usable field arrives; the filter needs it to dominate the window
        let mut lock = None;
        for _ in 0..10 {
            lock = lock.or(estimator.on_magnetic(magnetic()));
        }
        assert!(lock.is_some());
    }

    #[test]
    fn test_attempt_counter_saturates() {
        let mut estimator = estimator();
        let parallel = Vector3::new(0.0, 0.0, -40.0);
        for _ in 0..31 {
            estimator.on_gravity(gravity());
            estimator.on_magnetic(parallel);
        }
        estimator.attempts = u32::MAX - 1;

        for _ in 0..5 {
            assert!(estimator.on_magnetic(parallel).is_none());
        }
        assert_eq!(estimator.attempts(), u32::MAX);
        assert!(!estimator.is_locked());
    }

    #[test]
    fn test_reset_rearms() {
        let mut estimator = estimator();
        for _ in 0..31 {
            estimator.on_gravity(gravity());
            estimator.on_magnetic(magnetic());
        }
        estimator.reset();

        assert_eq!(estimator.state(), EstimatorState::Accumulating);
        assert_eq!(estimator.gravity_sample_count(), 0);
        assert_eq!(estimator.magnetic_sample_count(), 0);
        assert_eq!(estimator.attempts(), 0);
    }

    #[test]
    fn test_invalid_window() {
        assert!(InitialOrientationEstimator::new(0, 30).is_err());
    }
}
