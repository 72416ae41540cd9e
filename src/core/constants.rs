//! Constants shared by the measurement records, the estimator and the table.
//!
//! Changing the strategy-info type id breaks coexistence with other
//! strategies' payloads stored on the same measurement entry.

use std::time::Duration;

// =============================================================================
// MEASUREMENTS
// =============================================================================

/// Lifetime applied to namespace records unless reconfigured.
pub const DEFAULT_MEASUREMENTS_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Lifetime of a measurement entry between its creation and its first
/// extension.
pub const INITIAL_ENTRY_LIFETIME: Duration = Duration::from_secs(4);

/// Type id under which a namespace record is attached to a measurement entry.
pub const NAMESPACE_INFO_TYPE_ID: i32 = 1030;

/// Longest delay a deadline is computed for. Larger lifetimes and timer
/// delays are capped to it, roughly 30 years.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// =============================================================================
// RTT ESTIMATION
// =============================================================================

/// Weight of a new sample in the smoothed RTT (1/8).
pub const DEFAULT_ALPHA: f64 = 0.125;

/// Weight of a new deviation in the RTT variation (1/4).
pub const DEFAULT_BETA: f64 = 0.25;

/// Multiplier applied to the RTT variation when computing the RTO.
pub const DEFAULT_K: u32 = 4;

/// RTO used before the first sample arrives.
pub const DEFAULT_INITIAL_RTO: Duration = Duration::from_secs(1);

/// Lower clamp for the RTO.
pub const DEFAULT_MIN_RTO: Duration = Duration::from_millis(200);

/// Upper clamp for the RTO.
pub const DEFAULT_MAX_RTO: Duration = Duration::from_secs(60);

/// Factor applied to the RTO on each backoff.
pub const DEFAULT_RTO_BACKOFF_MULTIPLIER: u32 = 2;
