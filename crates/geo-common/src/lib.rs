//! Common geospatial types and utilities shared across the data API services.

pub mod bbox;
pub mod coords;
pub mod polygon;
pub mod projection;

pub use bbox::BoundingBox;
pub use coords::{parse_lat_lon, validate_lat_lon, CoordinateError, LatLon};
pub use polygon::{GeometryError, MultiPolygon, Polygon};
pub use projection::AlaskaAlbers;
