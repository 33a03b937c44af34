//! Monthly chlorophyll-a series: records, synthesis, persistence, and statistics.

/// Record type and timestamp helpers.
pub mod record;
/// Whole-series statistics.
pub mod stats;
/// CSV load/store and the load-or-synthesize entry point.
pub mod store;
/// Seeded synthetic series generator.
pub mod synth;
