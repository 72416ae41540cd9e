//! Core types and constants.
//!
//! This module has no dependencies on the rest of the crate and defines the
//! identifiers, constants and error types every other module shares.

mod constants;
mod error;

pub use constants::*;
pub use error::*;

/// Identifier of a face (a candidate next hop).
pub type FaceId = u64;
