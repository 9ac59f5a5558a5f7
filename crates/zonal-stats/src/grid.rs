//! A georeferenced raster window and its polygon masking.

use geo_common::{BoundingBox, MultiPolygon};

use crate::error::{Result, ZonalError};

/// A rectangular window of raster values, row-major and north-up.
///
/// Row 0 is the northern edge of `bbox`; column 0 the western edge. The
/// bbox is in whatever CRS the values were subset in (projected meters for
/// the raster backends), and masking polygons must be in the same CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub bbox: BoundingBox,
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

impl Grid {
    /// Build a grid, checking the buffer against the declared dimensions.
    pub fn new(bbox: BoundingBox, width: usize, height: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != width * height {
            return Err(ZonalError::SizeMismatch {
                width,
                height,
                len: values.len(),
            });
        }
        Ok(Self {
            bbox,
            width,
            height,
            values,
        })
    }

    /// The center coordinate of the cell at (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let cell_w = self.bbox.width() / self.width as f64;
        let cell_h = self.bbox.height() / self.height as f64;
        let x = self.bbox.west + (col as f64 + 0.5) * cell_w;
        let y = self.bbox.north - (row as f64 + 0.5) * cell_h;
        (x, y)
    }

    /// Values of cells whose center is inside the area and whose value is
    /// finite and not a nodata sentinel.
    ///
    /// The result order follows row-major iteration, but every downstream
    /// summary is order-independent.
    pub fn masked_values(&self, area: &MultiPolygon, nodata: &[f64]) -> Vec<f64> {
        let mut kept = Vec::new();

        for row in 0..self.height {
            for col in 0..self.width {
                let v = self.values[row * self.width + col];
                if !v.is_finite() || nodata.contains(&v) {
                    continue;
                }
                let (x, y) = self.cell_center(row, col);
                if area.contains(x, y) {
                    kept.push(v);
                }
            }
        }

        kept
    }
}
