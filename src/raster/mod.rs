//! Spatial concentration fields over a fixed geographic grid.

/// Bloom kernel and field synthesis.
pub mod field;
/// Coordinate grid over the bounding box.
pub mod grid;
