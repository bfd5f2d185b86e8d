//! Error types

use thiserror::Error;

/// Errors returned by engine and filter construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FusionError {
    /// Moving-average window size must be at least one sample
    #[error("invalid configuration: filter window size must be positive, got {window_size}")]
    InvalidConfiguration { window_size: usize },
}

/// Reasons an initial orientation cannot be computed from a sample pair.
///
/// Transient: the estimator keeps accumulating and retries on the next sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockFailure {
    /// Gravity reference is below 10% of standard gravity
    #[error("gravity reference too weak (device in free fall?)")]
    FreeFall,
    /// Magnetic field is too weak or nearly parallel to gravity
    #[error("magnetic field is degenerate relative to gravity")]
    DegenerateField,
}
