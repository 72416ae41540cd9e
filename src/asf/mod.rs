//! Measurements of the adaptive forwarding strategy.
//!
//! Three layers, leaf to root:
//!
//! - [`FaceInfo`]: RTT, timeout history and timers of one face in one namespace
//! - [`NamespaceInfo`]: the face records of one namespace, plus probing flags
//! - [`AsfMeasurements`]: the facade mapping FIB entries and request names
//!   onto namespace records stored in the measurement table
//!
//! ```text
//! MeasurementsTable
//!   └── Entry (/video)            expiry extended on every access
//!         └── NamespaceInfo       type id 1030
//!               ├── FaceInfo (7)  srtt, last rtt, timeouts, timers
//!               └── FaceInfo (9)
//! ```

mod face_info;
mod measurements;
mod namespace_info;

pub use face_info::{FaceInfo, LastRtt};
pub use measurements::{AsfMeasurements, AsfMeasurementsConfig};
pub use namespace_info::NamespaceInfo;
