//! Raster output: heatmap frames, the trend chart, and the shared SVG rasterizer.

/// Trend chart of the monthly series.
pub mod chart;
/// Fixed color scale.
pub mod colormap;
/// One PNG frame per concentration field.
pub mod frame;
/// Multi-frame rendering with optional parallelism.
pub mod pipeline;
/// Pixel buffers and SVG rasterization.
pub mod svg;
