//! End-to-end orchestration.

/// Run configuration.
pub mod config;
/// Stage sequencing and the run manifest.
pub mod run;
