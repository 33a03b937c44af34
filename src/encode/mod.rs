//! Video assembly.
//!
//! Sinks consume frames in sequence order; [`assemble::VideoAssembler`] checks the frame directory
//! and drives a sink.

/// Frame directory checks and the assembler.
pub mod assemble;
/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Animated GIF sink.
pub mod gif;
/// Sink trait and the in-memory sink.
pub mod sink;
