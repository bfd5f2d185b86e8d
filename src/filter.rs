//! Moving-average filter for 3-axis signals

use nalgebra::Vector3;

use crate::error::FusionError;

/// Sliding-window mean over the last `window_size` samples.
///
/// History is a fixed-capacity ring allocated when the window is configured;
/// the running sum is kept in `f64` so each update is O(1) without the
/// rounding of a long `f32` accumulation leaking into the output.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gyro_linear_acceleration::MeanFilter;
///
/// let mut filter = MeanFilter::new(2).unwrap();
///
/// assert_eq!(filter.filter(Vector3::new(2.0, 0.0, 0.0)), Vector3::new(2.0, 0.0, 0.0));
/// assert_eq!(filter.filter(Vector3::new(4.0, 0.0, 0.0)), Vector3::new(3.0, 0.0, 0.0));
/// // First sample evicted
/// assert_eq!(filter.filter(Vector3::new(8.0, 0.0, 0.0)), Vector3::new(6.0, 0.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct MeanFilter {
    window_size: usize,
    history: Vec<Vector3<f32>>,
    /// Next slot to overwrite once the ring is full
    head: usize,
    sum: Vector3<f64>,
}

impl MeanFilter {
    /// Create a filter averaging over `window_size` samples
    ///
    /// # Errors
    /// [`FusionError::InvalidConfiguration`] if `window_size` is zero.
    pub fn new(window_size: usize) -> Result<Self, FusionError> {
        let mut filter = Self {
            window_size: 0,
            history: Vec::new(),
            head: 0,
            sum: Vector3::zeros(),
        };
        filter.configure(window_size)?;
        Ok(filter)
    }

    /// Change the window size, discarding all history
    pub fn configure(&mut self, window_size: usize) -> Result<(), FusionError> {
        if window_size == 0 {
            return Err(FusionError::InvalidConfiguration { window_size });
        }

        self.window_size = window_size;
        self.history = Vec::with_capacity(window_size);
        self.head = 0;
        self.sum = Vector3::zeros();
        Ok(())
    }

    /// Admit a sample and return the mean of the held history.
    ///
    /// The running sum is rebuilt from the history every time the ring
    /// wraps, so a non-finite or extreme sample stops affecting the output
    /// within two windows of being evicted.
    pub fn filter(&mut self, sample: Vector3<f32>) -> Vector3<f32> {
        if self.history.len() < self.window_size {
            self.history.push(sample);
            self.sum += sample.cast::<f64>();
        } else {
            let evicted = core::mem::replace(&mut self.history[self.head], sample);
            self.head = (self.head + 1) % self.window_size;

            if self.head == 0 {
                self.sum = self.held_sum();
            } else {
                self.sum -= evicted.cast::<f64>();
                self.sum += sample.cast::<f64>();
            }
        }

        (self.sum / self.history.len() as f64).cast::<f32>()
    }

    fn held_sum(&self) -> Vector3<f64> {
        self.history
            .iter()
            .fold(Vector3::zeros(), |sum, sample| sum + sample.cast::<f64>())
    }

    /// Drop all history, keeping the window size
    pub fn reset(&mut self) {
        self.history.clear();
        self.head = 0;
        self.sum = Vector3::zeros();
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_pcg::Pcg64;

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(
            MeanFilter::new(0).unwrap_err(),
            FusionError::InvalidConfiguration { window_size: 0 }
        );

        let mut filter = MeanFilter::new(3).unwrap();
        assert!(filter.configure(0).is_err());
        // Failed reconfiguration leaves the filter usable
        assert_eq!(filter.window_size(), 3);
    }

    #[test]
    fn test_identical_samples_exact() {
        let samples = [
            Vector3::new(0.1f32, -9.81, 3.3),
            Vector3::new(1e-3, 1e3, -0.7),
            Vector3::new(20.0, 0.0, -40.0),
        ];

        for window_size in 1..=64 {
            for sample in samples {
                let mut filter = MeanFilter::new(window_size).unwrap();
                let mut output = Vector3::zeros();
                for _ in 0..window_size {
                    output = filter.filter(sample);
                }
                assert_eq!(output, sample, "window {}", window_size);
            }
        }
    }

    #[test]
    fn test_warm_up_averages_held_samples() {
        let mut filter = MeanFilter::new(4).unwrap();

        assert_eq!(filter.filter(Vector3::new(4.0, 0.0, 0.0)).x, 4.0);
        assert_eq!(filter.filter(Vector3::new(2.0, 0.0, 0.0)).x, 3.0);
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_history_never_exceeds_window() {
        let mut filter = MeanFilter::new(5).unwrap();
        for i in 0..100 {
            filter.filter(Vector3::new(i as f32, 0.0, 0.0));
            assert!(filter.len() <= 5);
        }
        assert_eq!(filter.len(), 5);

        // Mean of 95..=99
        let output = filter.filter(Vector3::new(100.0, 0.0, 0.0));
        assert!((output.x - 98.0).abs() < 1e-6);
    }

    #[test]
    fn test_axes_are_independent() {
        let mut filter = MeanFilter::new(2).unwrap();
        filter.filter(Vector3::new(1.0, 10.0, 100.0));
        let output = filter.filter(Vector3::new(3.0, 30.0, 300.0));

        assert_eq!(output, Vector3::new(2.0, 20.0, 200.0));
    }

    #[test]
    fn test_output_is_convex_combination() {
        let mut rng = Pcg64::seed_from_u64(7);
        let window_size = 8;
        let mut filter = MeanFilter::new(window_size).unwrap();
        let mut held: Vec<Vector3<f32>> = Vec::new();

        for _ in 0..2_000 {
            let sample = Vector3::new(
                rng.random_range(-50.0..50.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(0.0..1e4),
            );
            held.push(sample);
            if held.len() > window_size {
                held.remove(0);
            }

            let output = filter.filter(sample);
            for axis in 0..3 {
                let min = held.iter().map(|v| v[axis]).fold(f32::INFINITY, f32::min);
                let max = held.iter().map(|v| v[axis]).fold(f32::NEG_INFINITY, f32::max);
                assert!(
                    output[axis] >= min && output[axis] <= max,
                    "axis {} output {} outside [{}, {}]",
                    axis,
                    output[axis],
                    min,
                    max
                );
            }
        }
    }

    #[test]
    fn test_recovers_after_extreme_sample() {
        for window_size in [1, 2, 3, 10] {
            let mut filter = MeanFilter::new(window_size).unwrap();
            filter.filter(Vector3::new(1e30, -1e30, 9.81));

            let steady = Vector3::new(1.0, 1.0, 1e-10);
            let mut output = Vector3::zeros();
            for _ in 0..2 * window_size {
                output = filter.filter(steady);
            }
            assert_eq!(output, steady, "window {}", window_size);
        }
    }

    #[test]
    fn test_recovers_after_non_finite_sample() {
        for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let mut filter = MeanFilter::new(2).unwrap();
            filter.filter(Vector3::new(bad, 0.0, bad));

            let mut output = Vector3::zeros();
            for _ in 0..10 {
                output = filter.filter(Vector3::new(1.0, 2.0, 3.0));
            }
            assert_eq!(output, Vector3::new(1.0, 2.0, 3.0));
        }
    }

    #[test]
    fn test_reset() {
        let mut filter = MeanFilter::new(3).unwrap();
        filter.filter(Vector3::new(9.0, 9.0, 9.0));
        filter.reset();

        assert!(filter.is_empty());
        assert_eq!(filter.window_size(), 3);
        assert_eq!(filter.filter(Vector3::new(1.0, 2.0, 3.0)), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_configure_clears_history() {
        let mut filter = MeanFilter::new(3).unwrap();
        filter.filter(Vector3::new(9.0, 9.0, 9.0));
        filter.configure(2).unwrap();

        assert!(filter.is_empty());
        assert_eq!(filter.window_size(), 2);
    }
}
