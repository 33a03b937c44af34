use crate::{
    foundation::core::{GeoBoundingBox, GeoPoint, GridShape},
    foundation::error::LakebloomResult,
};

/// Fixed sampling of a [`GeoBoundingBox`].
///
/// Row 0 is the northern edge so rows map straight onto image rows. Both axes include their end
/// points; a single-sample axis sits at the box midpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateGrid {
    bbox: GeoBoundingBox,
    shape: GridShape,
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl CoordinateGrid {
    /// Validate `bbox` and `shape` and build the axes.
    pub fn new(bbox: GeoBoundingBox, shape: GridShape) -> LakebloomResult<Self> {
        bbox.validate()?;
        shape.validate()?;
        Ok(Self {
            lons: linspace(bbox.lon_min, bbox.lon_max, shape.nx),
            lats: linspace(bbox.lat_max, bbox.lat_min, shape.ny),
            bbox,
            shape,
        })
    }

    /// Domain covered by the grid.
    pub fn bbox(&self) -> GeoBoundingBox {
        self.bbox
    }

    /// Sampling dimensions.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Longitude of each column, west to east.
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Latitude of each row, north to south.
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Coordinate of cell `(x, y)`.
    pub fn point(&self, x: usize, y: usize) -> GeoPoint {
        GeoPoint::new(self.lons[x], self.lats[y])
    }

    /// Every cell coordinate in row-major order.
    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.lats
            .iter()
            .flat_map(move |&lat| self.lons.iter().map(move |&lon| GeoPoint::new(lon, lat)))
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![(start + end) * 0.5],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/grid.rs"]
mod tests;
