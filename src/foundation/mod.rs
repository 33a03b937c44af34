//! Shared value types, errors, and small helpers used by every stage.

/// Calendar, geometry, and rate value types.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
/// Output file helpers.
pub mod fs;
/// Hashing and integer math.
pub mod math;
