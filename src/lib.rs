//! # ASF Measurements
//!
//! Per-namespace, per-face round-trip measurements for an **A**daptive
//! **S**moothed RTT-based **F**orwarding strategy in a content-centric
//! forwarder.
//!
//! For every (namespace prefix, face) pair the strategy needs the smoothed
//! RTT, the last raw RTT sample, the consecutive-timeout count, and whether a
//! retransmission timer is armed. This crate keeps that state:
//!
//! - **Timer lifecycle**: at most one armed retransmission timer per face,
//!   re-arming replaces, cancelling is idempotent, dropping cancels
//! - **Eviction safety**: measurement state lives in an eviction-based table
//!   and is refreshed on every access; eviction cancels all owned timers
//! - **RTT estimation**: RFC 6298 smoothing with clamped, backed-off RTO
//!
//! ## Feature Flags
//!
//! - `runtime` (default): [`scheduler::TokioScheduler`] running timers as
//!   local tokio tasks
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, face ids
//! - [`rtt`]: RTT estimator
//! - [`scheduler`]: timer scheduling and scoped event handles
//! - [`table`]: names, FIB entries, typed payloads, measurement table
//! - [`asf`]: face records, namespace records, measurements facade
//!
//! ## Example Usage
//!
//! ```rust
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use asf_measurements::prelude::*;
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let mut table = MeasurementsTable::new(scheduler.clone());
//! let asf = AsfMeasurements::with_defaults(scheduler.clone());
//!
//! let fib_entry = fib::Entry::new(Name::from("/video"));
//! let request = Name::from("/video/seg=1");
//!
//! let face = asf.get_or_create_face_info(&mut table, &fib_entry, &request, 7);
//! face.arm_retransmission_timer(&request, || {}, Duration::from_millis(100));
//!
//! // The response arrives after 20ms
//! scheduler.advance(Duration::from_millis(20));
//! let face = asf
//!     .get_face_info(&mut table, &fib_entry, &request, 7)
//!     .expect("created above");
//! face.record_rtt(Duration::from_millis(20));
//! face.cancel_retransmission_timer(&request);
//!
//! assert_eq!(face.last_rtt(), LastRtt::Measured(Duration::from_millis(20)));
//! assert!(!face.is_timer_armed());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod asf;
pub mod core;
pub mod rtt;
pub mod scheduler;
pub mod table;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::asf::{AsfMeasurements, AsfMeasurementsConfig, FaceInfo, LastRtt, NamespaceInfo};
    pub use crate::core::{
        DEFAULT_MEASUREMENTS_LIFETIME, FaceId, MeasurementsError, NAMESPACE_INFO_TYPE_ID,
    };
    pub use crate::rtt::{RttEstimator, RttEstimatorOptions};
    #[cfg(feature = "runtime")]
    pub use crate::scheduler::TokioScheduler;
    pub use crate::scheduler::{
        EventCallback, EventId, ManualScheduler, Scheduler, SchedulerHandle, ScopedEventId,
    };
    pub use crate::table::{
        Entry, MeasurementsAccessor, MeasurementsTable, Name, StrategyInfo, StrategyInfoStore, fib,
    };
}

// Re-export commonly used items at crate root
pub use crate::asf::{AsfMeasurements, AsfMeasurementsConfig, FaceInfo, LastRtt, NamespaceInfo};
pub use crate::core::{FaceId, MeasurementsError};
