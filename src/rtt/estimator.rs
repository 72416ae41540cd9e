//! RTT estimation.
//!
//! Implements the RFC 6298 smoothing with the adjustments used by adaptive
//! forwarding: options are shared by every estimator of a namespace, and a
//! sample may be weighted down when several samples are expected per RTT.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_INITIAL_RTO, DEFAULT_K, DEFAULT_MAX_RTO,
    DEFAULT_MIN_RTO, DEFAULT_RTO_BACKOFF_MULTIPLIER, MeasurementsError,
};

/// Parameters of an [`RttEstimator`].
///
/// A single `Arc<RttEstimatorOptions>` is handed to every estimator created
/// for a namespace, so options are immutable once shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RttEstimatorOptions {
    /// Weight of a new sample in the smoothed RTT.
    pub alpha: f64,
    /// Weight of a new deviation in the RTT variation.
    pub beta: f64,
    /// RTO before the first sample.
    pub initial_rto: Duration,
    /// Lower clamp for the RTO.
    pub min_rto: Duration,
    /// Upper clamp for the RTO.
    pub max_rto: Duration,
    /// Multiplier applied to the RTT variation.
    pub k: u32,
    /// Factor applied by [`RttEstimator::backoff_rto`].
    pub rto_backoff_multiplier: u32,
}

impl Default for RttEstimatorOptions {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            initial_rto: DEFAULT_INITIAL_RTO,
            min_rto: DEFAULT_MIN_RTO,
            max_rto: DEFAULT_MAX_RTO,
            k: DEFAULT_K,
            rto_backoff_multiplier: DEFAULT_RTO_BACKOFF_MULTIPLIER,
        }
    }
}

impl RttEstimatorOptions {
    /// Check that the options describe a usable estimator.
    pub fn validate(&self) -> Result<(), MeasurementsError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(MeasurementsError::InvalidEstimatorOptions(format!(
                "alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(MeasurementsError::InvalidEstimatorOptions(format!(
                "beta must be in [0, 1], got {}",
                self.beta
            )));
        }
        if self.min_rto > self.max_rto {
            return Err(MeasurementsError::InvalidEstimatorOptions(format!(
                "min RTO {:?} exceeds max RTO {:?}",
                self.min_rto, self.max_rto
            )));
        }
        if self.initial_rto < self.min_rto || self.initial_rto > self.max_rto {
            return Err(MeasurementsError::InvalidEstimatorOptions(format!(
                "initial RTO {:?} outside [{:?}, {:?}]",
                self.initial_rto, self.min_rto, self.max_rto
            )));
        }
        if self.rto_backoff_multiplier == 0 {
            return Err(MeasurementsError::InvalidEstimatorOptions(
                "RTO backoff multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// RTT estimator.
///
/// Maintains the smoothed RTT (SRTT) and RTT variation (RTTVAR) and derives
/// an adaptive retransmission timeout (RTO).
#[derive(Debug, Clone)]
pub struct RttEstimator {
    options: Arc<RttEstimatorOptions>,
    srtt: Duration,
    rttvar: Duration,
    rto: Duration,
    samples: u64,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::from_validated(Arc::new(RttEstimatorOptions::default()))
    }
}

impl RttEstimator {
    /// Create an estimator that has not seen any sample yet.
    ///
    /// Fails if `options` do not pass [`RttEstimatorOptions::validate`].
    pub fn new(options: Arc<RttEstimatorOptions>) -> Result<Self, MeasurementsError> {
        options.validate()?;
        Ok(Self::from_validated(options))
    }

    pub(crate) fn from_validated(options: Arc<RttEstimatorOptions>) -> Self {
        let rto = options.initial_rto;
        Self {
            options,
            srtt: Duration::ZERO,
            rttvar: Duration::ZERO,
            rto,
            samples: 0,
        }
    }

    /// Feed one RTT sample.
    ///
    /// - First sample: SRTT = sample, RTTVAR = sample / 2
    /// - Subsequent: RTTVAR = (1 - b) * RTTVAR + b * |SRTT - sample|,
    ///   SRTT = (1 - a) * SRTT + a * sample
    ///
    /// where `a` and `b` are alpha and beta divided by `n_expected_samples`.
    /// The RTO becomes SRTT + k * RTTVAR, clamped to `[min_rto, max_rto]`.
    pub fn add_measurement(&mut self, rtt: Duration, n_expected_samples: usize) {
        let n = n_expected_samples.max(1) as f64;

        if self.samples == 0 {
            self.srtt = rtt;
            self.rttvar = rtt / 2;
        } else {
            let alpha = self.options.alpha / n;
            let beta = self.options.beta / n;
            self.rttvar = scale(self.rttvar, 1.0 - beta)
                .saturating_add(scale(self.srtt.abs_diff(rtt), beta));
            self.srtt = scale(self.srtt, 1.0 - alpha).saturating_add(scale(rtt, alpha));
        }

        let rto = self
            .srtt
            .saturating_add(self.rttvar.saturating_mul(self.options.k));
        self.rto = self.clamp_rto(rto);
        self.samples = self.samples.saturating_add(1);
    }

    /// Multiply the RTO by the backoff factor (after a timeout).
    ///
    /// Returns the new RTO, capped at `max_rto`.
    pub fn backoff_rto(&mut self) -> Duration {
        let rto = self
            .rto
            .saturating_mul(self.options.rto_backoff_multiplier);
        self.rto = self.clamp_rto(rto);
        self.rto
    }

    /// Smoothed RTT, zero before the first sample.
    pub fn smoothed_rtt(&self) -> Duration {
        self.srtt
    }

    /// RTT variation, zero before the first sample.
    pub fn rtt_variation(&self) -> Duration {
        self.rttvar
    }

    /// Current retransmission timeout.
    pub fn estimated_rto(&self) -> Duration {
        self.rto
    }

    /// Number of samples fed so far.
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Options shared with the other estimators of the namespace.
    pub fn options(&self) -> &Arc<RttEstimatorOptions> {
        &self.options
    }

    fn clamp_rto(&self, rto: Duration) -> Duration {
        rto.clamp(self.options.min_rto, self.options.max_rto)
    }
}

/// `duration * factor`, saturating at `Duration::MAX`.
fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
