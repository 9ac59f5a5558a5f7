//! Polygon geometry: ring storage, point-in-polygon tests, GeoJSON conversion.

use serde_json::{json, Value};
use thiserror::Error;

use crate::bbox::BoundingBox;

/// Errors that can occur when building geometry from backend responses.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Geometry type other than Polygon/MultiPolygon.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedType(String),

    /// Structurally invalid coordinates.
    #[error("Malformed geometry: {0}")]
    Malformed(String),

    /// A ring with fewer than 3 vertices.
    #[error("Ring has too few vertices: {0}")]
    RingTooShort(usize),
}

/// A polygon as a set of rings of (x, y) vertices.
///
/// The first ring is the exterior, any further rings are holes. Vertices
/// are (lon, lat) for geographic polygons or projected (x, y) meters after
/// reprojection; the containment test is unit-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    rings: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    /// Create a polygon from a single exterior ring.
    pub fn new(ring: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        Self::from_rings(vec![ring])
    }

    /// Create a polygon from an exterior ring plus optional holes.
    pub fn from_rings(rings: Vec<Vec<(f64, f64)>>) -> Result<Self, GeometryError> {
        if rings.is_empty() {
            return Err(GeometryError::Malformed("polygon has no rings".to_string()));
        }
        for ring in &rings {
            if ring.len() < 3 {
                return Err(GeometryError::RingTooShort(ring.len()));
            }
        }
        Ok(Self { rings })
    }

    /// The rings of this polygon, exterior first.
    pub fn rings(&self) -> &[Vec<(f64, f64)>] {
        &self.rings
    }

    /// Check if a point is inside the polygon using even-odd ray casting.
    ///
    /// Crossings are counted over every ring, so a point inside a hole
    /// comes out as outside. Points exactly on an edge are not guaranteed
    /// either way.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;

        for ring in &self.rings {
            let n = ring.len();
            let mut j = n - 1;

            for i in 0..n {
                let (xi, yi) = ring[i];
                let (xj, yj) = ring[j];

                if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                    inside = !inside;
                }
                j = i;
            }
        }

        inside
    }

    /// The envelope of all rings.
    pub fn bbox(&self) -> BoundingBox {
        let mut west = f64::MAX;
        let mut south = f64::MAX;
        let mut east = f64::MIN;
        let mut north = f64::MIN;

        for ring in &self.rings {
            for (x, y) in ring {
                west = west.min(*x);
                east = east.max(*x);
                south = south.min(*y);
                north = north.max(*y);
            }
        }

        BoundingBox::new(west, south, east, north)
    }

    /// Apply a coordinate transform to every vertex.
    pub fn map_vertices<F: Fn(f64, f64) -> (f64, f64)>(&self, f: F) -> Polygon {
        Polygon {
            rings: self
                .rings
                .iter()
                .map(|ring| ring.iter().map(|(x, y)| f(*x, *y)).collect())
                .collect(),
        }
    }
}

/// One or more polygons treated as a single area.
///
/// Boundary features with islands or disjoint parts resolve to a
/// multipolygon; a point is inside the area if it is inside any part.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Result<Self, GeometryError> {
        if polygons.is_empty() {
            return Err(GeometryError::Malformed(
                "multipolygon has no parts".to_string(),
            ));
        }
        Ok(Self { polygons })
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Check if a point is inside any part.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(x, y))
    }

    /// The envelope of all parts.
    pub fn bbox(&self) -> BoundingBox {
        let mut boxes = self.polygons.iter().map(|p| p.bbox());
        // new() guarantees at least one part
        let first = boxes.next().unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
        boxes.fold(first, |acc, b| acc.union(&b))
    }

    /// Apply a coordinate transform to every vertex of every part.
    pub fn map_vertices<F: Fn(f64, f64) -> (f64, f64) + Copy>(&self, f: F) -> MultiPolygon {
        MultiPolygon {
            polygons: self.polygons.iter().map(|p| p.map_vertices(f)).collect(),
        }
    }

    /// Build from a GeoJSON geometry object (`Polygon` or `MultiPolygon`).
    pub fn from_geojson_geometry(geometry: &Value) -> Result<Self, GeometryError> {
        let geom_type = geometry
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| GeometryError::Malformed("geometry has no type".to_string()))?;

        let coordinates = geometry
            .get("coordinates")
            .ok_or_else(|| GeometryError::Malformed("geometry has no coordinates".to_string()))?;

        match geom_type {
            "Polygon" => {
                let polygon = parse_polygon_coordinates(coordinates)?;
                MultiPolygon::new(vec![polygon])
            }
            "MultiPolygon" => {
                let parts = coordinates
                    .as_array()
                    .ok_or_else(|| {
                        GeometryError::Malformed("MultiPolygon coordinates must be an array".to_string())
                    })?
                    .iter()
                    .map(parse_polygon_coordinates)
                    .collect::<Result<Vec<_>, _>>()?;
                MultiPolygon::new(parts)
            }
            other => Err(GeometryError::UnsupportedType(other.to_string())),
        }
    }

    /// Serialize back to a GeoJSON geometry object.
    ///
    /// Single-part areas come out as `Polygon`, everything else as
    /// `MultiPolygon`.
    pub fn to_geojson_geometry(&self) -> Value {
        if self.polygons.len() == 1 {
            json!({
                "type": "Polygon",
                "coordinates": rings_to_json(&self.polygons[0]),
            })
        } else {
            let parts: Vec<Value> = self.polygons.iter().map(rings_to_json).collect();
            json!({
                "type": "MultiPolygon",
                "coordinates": parts,
            })
        }
    }
}

fn rings_to_json(polygon: &Polygon) -> Value {
    let rings: Vec<Value> = polygon
        .rings()
        .iter()
        .map(|ring| {
            let points: Vec<Value> = ring.iter().map(|(x, y)| json!([x, y])).collect();
            Value::Array(points)
        })
        .collect();
    Value::Array(rings)
}

/// Parse one GeoJSON polygon's coordinate array (a list of rings).
fn parse_polygon_coordinates(coordinates: &Value) -> Result<Polygon, GeometryError> {
    let rings = coordinates
        .as_array()
        .ok_or_else(|| GeometryError::Malformed("polygon coordinates must be an array".to_string()))?
        .iter()
        .map(parse_ring)
        .collect::<Result<Vec<_>, _>>()?;

    Polygon::from_rings(rings)
}

fn parse_ring(ring: &Value) -> Result<Vec<(f64, f64)>, GeometryError> {
    ring.as_array()
        .ok_or_else(|| GeometryError::Malformed("ring must be an array".to_string()))?
        .iter()
        .map(|position| {
            let pair = position
                .as_array()
                .ok_or_else(|| GeometryError::Malformed("position must be an array".to_string()))?;
            if pair.len() < 2 {
                return Err(GeometryError::Malformed(
                    "position needs two coordinates".to_string(),
                ));
            }
            let x = pair[0]
                .as_f64()
                .ok_or_else(|| GeometryError::Malformed("coordinate is not a number".to_string()))?;
            let y = pair[1]
                .as_f64()
                .ok_or_else(|| GeometryError::Malformed("coordinate is not a number".to_string()))?;
            Ok((x, y))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::new(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_contains_simple() {
        let square = unit_square();
        assert!(square.contains(5.0, 5.0));
        assert!(!square.contains(15.0, 5.0));
        assert!(!square.contains(-1.0, 5.0));
    }

    #[test]
    fn test_contains_with_hole() {
        let donut = Polygon::from_rings(vec![
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)],
            vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)],
        ])
        .unwrap();

        assert!(donut.contains(2.0, 2.0));
        assert!(!donut.contains(5.0, 5.0)); // inside the hole
    }

    #[test]
    fn test_ring_too_short() {
        let result = Polygon::new(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(result, Err(GeometryError::RingTooShort(2)));
    }

    #[test]
    fn test_bbox() {
        let b = unit_square().bbox();
        assert_eq!(b.to_array(), [0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_multipolygon_contains_any_part() {
        let left = Polygon::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)])
            .unwrap();
        let right = Polygon::new(vec![(5.0, 0.0), (6.0, 0.0), (6.0, 1.0), (5.0, 1.0), (5.0, 0.0)])
            .unwrap();
        let multi = MultiPolygon::new(vec![left, right]).unwrap();

        assert!(multi.contains(0.5, 0.5));
        assert!(multi.contains(5.5, 0.5));
        assert!(!multi.contains(3.0, 0.5)); // between the parts

        assert_eq!(multi.bbox().to_array(), [0.0, 0.0, 6.0, 1.0]);
    }

    #[test]
    fn test_from_geojson_polygon() {
        let geometry = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[-147.0, 64.0], [-146.0, 64.0], [-146.0, 65.0], [-147.0, 65.0], [-147.0, 64.0]]]
        });

        let multi = MultiPolygon::from_geojson_geometry(&geometry).unwrap();
        assert!(multi.contains(-146.5, 64.5));
        assert!(!multi.contains(-145.0, 64.5));
    }

    #[test]
    fn test_from_geojson_multipolygon() {
        let geometry = serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            ]
        });

        let multi = MultiPolygon::from_geojson_geometry(&geometry).unwrap();
        assert_eq!(multi.polygons().len(), 2);
    }

    #[test]
    fn test_from_geojson_rejects_other_types() {
        let geometry = serde_json::json!({
            "type": "Point",
            "coordinates": [-147.0, 64.0]
        });

        assert_eq!(
            MultiPolygon::from_geojson_geometry(&geometry),
            Err(GeometryError::UnsupportedType("Point".to_string()))
        );
    }

    #[test]
    fn test_geojson_round_trip() {
        let geometry = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[-147.0, 64.0], [-146.0, 64.0], [-146.0, 65.0], [-147.0, 64.0]]]
        });

        let multi = MultiPolygon::from_geojson_geometry(&geometry).unwrap();
        let out = multi.to_geojson_geometry();
        assert_eq!(out["type"], "Polygon");
        assert_eq!(out["coordinates"][0][0][0], -147.0);
        assert_eq!(out["coordinates"][0][2][1], 65.0);
    }

    #[test]
    fn test_map_vertices() {
        let square = unit_square();
        let shifted = square.map_vertices(|x, y| (x + 100.0, y));
        assert!(shifted.contains(105.0, 5.0));
        assert!(!shifted.contains(5.0, 5.0));
    }
}
