//! Error types for the measurements core.
//!
//! Only configuration misuse is an error. Lookups that find nothing return
//! `None`, and re-arming a timer simply supersedes the previous one.

use std::time::Duration;

use thiserror::Error;

/// Errors raised when configuring measurements.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeasurementsError {
    /// A measurement lifetime of zero would expire records as soon as they
    /// are configured.
    #[error("measurement lifetime must be positive, got {0:?}")]
    NonPositiveLifetime(Duration),

    /// RTT estimator options out of range.
    #[error("invalid RTT estimator options: {0}")]
    InvalidEstimatorOptions(String),
}

/// Result alias for measurement configuration.
pub type Result<T> = std::result::Result<T, MeasurementsError>;
