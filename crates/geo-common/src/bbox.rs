//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees with
/// `west`/`east` as longitudes and `south`/`north` as latitudes.
/// For projected CRS (EPSG:3338), coordinates are in meters.
///
/// Serializes as a 4-element array `[west, south, east, north]`, which is
/// the shape datasets declare in their YAML configs and the shape error
/// bodies report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from edge coordinates.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check if a point is contained within this bbox.
    ///
    /// Containment is inclusive on all four edges: a point exactly on the
    /// boundary is inside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }

    /// Grow this bbox to cover another.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// The box as `[west, south, east, north]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(a: [f64; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

/// Check whether a point falls inside at least one of the given boxes.
///
/// Coverage regions that straddle the antimeridian are declared as a pair
/// of boxes split at 180 degrees; membership in either box suffices.
pub fn any_contains(boxes: &[BoundingBox], lat: f64, lon: f64) -> bool {
    boxes.iter().any(|b| b.contains(lat, lon))
}
