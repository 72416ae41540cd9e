//! Helper to retrieve and create strategy measurements.
//!
//! [`AsfMeasurements`] is the only entry point the strategy uses. It maps a
//! (FIB entry, request name, face) triple onto the measurement table, keeps
//! one [`NamespaceInfo`] per entry and extends the entry's lifetime whenever
//! a record is created or fetched for use, so state for a namespace that is
//! being forwarded to is never evicted mid-use.
//!
//! Entries are resolved afresh on every call; no entry is held across calls.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{DEFAULT_MEASUREMENTS_LIFETIME, FaceId, MeasurementsError, Result};
use crate::rtt::RttEstimatorOptions;
use crate::scheduler::SchedulerHandle;
use crate::table::{Entry, MeasurementsAccessor, Name, fib};

use super::face_info::FaceInfo;
use super::namespace_info::NamespaceInfo;

/// Configuration of [`AsfMeasurements`].
#[derive(Debug, Clone, PartialEq)]
pub struct AsfMeasurementsConfig {
    /// Lifetime granted to a measurement entry on every access.
    pub measurements_lifetime: Duration,
    /// Estimator options handed to every new namespace.
    pub rtt_options: RttEstimatorOptions,
}

impl Default for AsfMeasurementsConfig {
    fn default() -> Self {
        Self {
            measurements_lifetime: DEFAULT_MEASUREMENTS_LIFETIME,
            rtt_options: RttEstimatorOptions::default(),
        }
    }
}

impl AsfMeasurementsConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        check_lifetime(self.measurements_lifetime)?;
        self.rtt_options.validate()
    }
}

fn check_lifetime(lifetime: Duration) -> Result<()> {
    if lifetime.is_zero() {
        return Err(MeasurementsError::NonPositiveLifetime(lifetime));
    }
    Ok(())
}

/// Facade over the measurement table for the adaptive forwarding strategy.
pub struct AsfMeasurements {
    scheduler: SchedulerHandle,
    measurements_lifetime: Duration,
    rtt_options: Arc<RttEstimatorOptions>,
}

impl AsfMeasurements {
    /// Create the facade from a validated configuration.
    pub fn new(scheduler: SchedulerHandle, config: AsfMeasurementsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scheduler,
            measurements_lifetime: config.measurements_lifetime,
            rtt_options: Arc::new(config.rtt_options),
        })
    }

    /// Create the facade with the default lifetime and estimator options.
    pub fn with_defaults(scheduler: SchedulerHandle) -> Self {
        Self {
            scheduler,
            measurements_lifetime: DEFAULT_MEASUREMENTS_LIFETIME,
            rtt_options: Arc::new(RttEstimatorOptions::default()),
        }
    }

    /// Record of `face_id` in the namespace of `request_name`.
    ///
    /// The namespace is the entry for exactly `request_name` if there is
    /// one, otherwise the entry for the FIB prefix. Neither the entry, the
    /// namespace record nor the face record is created.
    pub fn get_face_info<'t, M>(
        &self,
        measurements: &'t mut M,
        fib_entry: &fib::Entry,
        request_name: &Name,
        face_id: FaceId,
    ) -> Option<&'t mut FaceInfo>
    where
        M: MeasurementsAccessor + ?Sized,
    {
        let key = if measurements.contains(request_name) {
            request_name
        } else {
            fib_entry.prefix()
        };

        measurements
            .find_exact_match(key)?
            .strategy_info_mut::<NamespaceInfo>()?
            .get_face_info_mut(face_id)
    }

    /// Record of `face_id` in the namespace of `request_name`, creating the
    /// entry, the namespace record and the face record as needed.
    ///
    /// Extends the entry's lifetime.
    pub fn get_or_create_face_info<'t, M>(
        &self,
        measurements: &'t mut M,
        fib_entry: &fib::Entry,
        request_name: &Name,
        face_id: FaceId,
    ) -> &'t mut FaceInfo
    where
        M: MeasurementsAccessor + ?Sized,
    {
        self.get_or_create_namespace_info(measurements, fib_entry, request_name)
            .get_or_create_face_info(face_id)
    }

    /// Namespace record of the longest prefix of `prefix` that has one.
    ///
    /// Creates nothing and leaves the entry's lifetime unchanged.
    pub fn get_namespace_info<'t, M>(
        &self,
        measurements: &'t mut M,
        prefix: &Name,
    ) -> Option<&'t mut NamespaceInfo>
    where
        M: MeasurementsAccessor + ?Sized,
    {
        measurements
            .find_longest_prefix_match(prefix)?
            .strategy_info_mut::<NamespaceInfo>()
    }

    /// Namespace record for `prefix`, creating it as needed.
    ///
    /// Uses the entry for exactly `prefix` if there is one, otherwise the
    /// entry for the FIB prefix (created if absent). Extends the entry's
    /// lifetime.
    pub fn get_or_create_namespace_info<'t, M>(
        &self,
        measurements: &'t mut M,
        fib_entry: &fib::Entry,
        prefix: &Name,
    ) -> &'t mut NamespaceInfo
    where
        M: MeasurementsAccessor + ?Sized,
    {
        let entry = if measurements.contains(prefix) {
            measurements.get_or_create(prefix)
        } else {
            measurements.get(fib_entry)
        };

        self.extend_lifetime(entry);

        if entry.strategy_info::<NamespaceInfo>().is_none() {
            tracing::debug!(
                prefix = %entry.name(),
                lifetime_secs = self.measurements_lifetime.as_secs(),
                "creating namespace info"
            );
        }
        let (info, _) = entry.insert_strategy_info(|| {
            NamespaceInfo::new(
                self.scheduler.clone(),
                Arc::clone(&self.rtt_options),
                self.measurements_lifetime,
            )
        });
        info
    }

    /// Change the lifetime granted on access.
    ///
    /// A zero lifetime is rejected and the previous value kept.
    pub fn set_measurements_lifetime(&mut self, lifetime: Duration) -> Result<()> {
        if let Err(err) = check_lifetime(lifetime) {
            tracing::debug!(?lifetime, "rejected measurement lifetime");
            return Err(err);
        }
        self.measurements_lifetime = lifetime;
        Ok(())
    }

    /// Lifetime granted on access.
    pub fn measurements_lifetime(&self) -> Duration {
        self.measurements_lifetime
    }

    /// Estimator options handed to new namespaces.
    pub fn rtt_options(&self) -> &Arc<RttEstimatorOptions> {
        &self.rtt_options
    }

    fn extend_lifetime(&self, entry: &mut Entry) {
        entry.extend_lifetime(self.scheduler.now(), self.measurements_lifetime);
    }
}
