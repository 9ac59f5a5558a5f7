//! Latitude/longitude parsing and validation for path parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing coordinates.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    /// Not a number at all.
    #[error("Invalid coordinate value: {0}")]
    InvalidCoordinate(String),

    /// A number, but outside the globe.
    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),
}

/// A geographic point in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Parse latitude and longitude path segments.
///
/// Rejects non-numeric and non-finite input ("NaN" parses as a float but
/// is not a coordinate) and values outside [-90, 90] / [-180, 180].
pub fn parse_lat_lon(lat: &str, lon: &str) -> Result<LatLon, CoordinateError> {
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| CoordinateError::InvalidCoordinate(lat.to_string()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| CoordinateError::InvalidCoordinate(lon.to_string()))?;

    validate_lat_lon(lat, lon)?;

    Ok(LatLon { lat, lon })
}

/// Validate that a lat/lon pair is finite and within the globe.
pub fn validate_lat_lon(lat: f64, lon: f64) -> Result<(), CoordinateError> {
    if !lat.is_finite() {
        return Err(CoordinateError::InvalidCoordinate(lat.to_string()));
    }
    if !lon.is_finite() {
        return Err(CoordinateError::InvalidCoordinate(lon.to_string()));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateError::OutOfRange(format!(
            "Latitude {} is out of range [-90, 90]",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateError::OutOfRange(format!(
            "Longitude {} is out of range [-180, 180]",
            lon
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let p = parse_lat_lon("65.0628", "-146.1627").unwrap();
        assert_eq!(p.lat, 65.0628);
        assert_eq!(p.lon, -146.1627);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let p = parse_lat_lon(" 60.5 ", " -150.0 ").unwrap();
        assert_eq!(p.lat, 60.5);
        assert_eq!(p.lon, -150.0);
    }

    #[test]
    fn test_parse_non_numeric() {
        assert!(matches!(
            parse_lat_lon("abc", "-150.0"),
            Err(CoordinateError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            parse_lat_lon("60.0", ""),
            Err(CoordinateError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_parse_rejects_nan_and_inf() {
        // "NaN" and "inf" parse as f64 but are not coordinates.
        assert!(matches!(
            parse_lat_lon("NaN", "-150.0"),
            Err(CoordinateError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            parse_lat_lon("60.0", "inf"),
            Err(CoordinateError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            parse_lat_lon("91.0", "-150.0"),
            Err(CoordinateError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_lat_lon("60.0", "180.1"),
            Err(CoordinateError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_globe_edges_are_valid() {
        assert!(parse_lat_lon("90", "-180").is_ok());
        assert!(parse_lat_lon("-90", "180").is_ok());
    }
}
