//! Round-trip time estimation.
//!
//! Each face record owns one [`RttEstimator`]; the [`RttEstimatorOptions`]
//! are shared by every estimator created under the same namespace.

mod estimator;

pub use estimator::{RttEstimator, RttEstimatorOptions};
