//! Tables the measurements live in.
//!
//! - [`Name`]: hierarchical names and prefix matching
//! - [`fib::Entry`]: a matched forwarding-table entry
//! - [`StrategyInfo`] / [`StrategyInfoStore`]: typed payloads keyed by type id
//! - [`MeasurementsTable`]: eviction-based store of payloads per name prefix

pub mod fib;
mod measurements;
mod name;
mod strategy_info;

pub use measurements::{Entry, MeasurementsAccessor, MeasurementsTable};
pub use name::Name;
pub use strategy_info::{StrategyInfo, StrategyInfoStore};
