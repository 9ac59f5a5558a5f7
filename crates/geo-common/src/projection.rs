//! Alaska Albers (EPSG:3338) forward projection.
//!
//! The raster backends publish their grids in NAD83 / Alaska Albers, an
//! equal-area conic projection in meters. Point subsets and polygon windows
//! are requested in projected coordinates, so the service only ever needs
//! the forward direction (lat/lon degrees to x/y meters).
//!
//! Projection parameters:
//! - Standard parallels: 55N and 65N
//! - Latitude of origin: 50N
//! - Central meridian: 154W
//! - False easting/northing: 0
//! - Ellipsoid: GRS80

use std::f64::consts::PI;

use crate::polygon::{MultiPolygon, Polygon};

/// GRS80 semi-major axis in meters.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// GRS80 inverse flattening.
const INVERSE_FLATTENING: f64 = 298.257_222_101;

/// Alaska Albers projection with precomputed constants.
///
/// Uses the ellipsoidal Albers equal-area series, so projected values
/// match what the backends use when georeferencing their grids.
#[derive(Debug, Clone)]
pub struct AlaskaAlbers {
    /// Central meridian in radians.
    lon0: f64,
    /// Eccentricity.
    e: f64,
    /// Eccentricity squared.
    e2: f64,
    /// Cone constant.
    n: f64,
    /// Albers C constant.
    c: f64,
    /// Radius of the latitude of origin.
    rho0: f64,
}

impl Default for AlaskaAlbers {
    fn default() -> Self {
        Self::new()
    }
}

impl AlaskaAlbers {
    /// Build the EPSG:3338 projection.
    pub fn new() -> Self {
        let to_rad = PI / 180.0;

        let lat0 = 50.0 * to_rad;
        let lat1 = 55.0 * to_rad;
        let lat2 = 65.0 * to_rad;
        let lon0 = -154.0 * to_rad;

        let f = 1.0 / INVERSE_FLATTENING;
        let e2 = 2.0 * f - f * f;
        let e = e2.sqrt();

        let m1 = albers_m(lat1, e2);
        let m2 = albers_m(lat2, e2);
        let q0 = albers_q(lat0, e, e2);
        let q1 = albers_q(lat1, e, e2);
        let q2 = albers_q(lat2, e, e2);

        let n = (m1 * m1 - m2 * m2) / (q2 - q1);
        let c = m1 * m1 + n * q1;
        let rho0 = SEMI_MAJOR_AXIS * (c - n * q0).sqrt() / n;

        Self {
            lon0,
            e,
            e2,
            n,
            c,
            rho0,
        }
    }

    /// Project geographic coordinates (degrees) to x/y meters.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let lon = lon_deg * to_rad;

        // Normalize longitude difference to [-pi, pi] so points east of the
        // antimeridian land west of the central meridian, not a full wrap away.
        let mut dlon = lon - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let q = albers_q(lat, self.e, self.e2);
        let rho = SEMI_MAJOR_AXIS * (self.c - self.n * q).sqrt() / self.n;
        let theta = self.n * dlon;

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();

        (x, y)
    }

    /// Project every vertex of a polygon, keeping ring structure.
    pub fn project_polygon(&self, polygon: &Polygon) -> Polygon {
        polygon.map_vertices(|lon, lat| self.forward(lat, lon))
    }

    /// Project every vertex of a multipolygon, keeping part structure.
    pub fn project_multi(&self, multi: &MultiPolygon) -> MultiPolygon {
        multi.map_vertices(|lon, lat| self.forward(lat, lon))
    }
}

/// Albers auxiliary q (Snyder 3-12).
fn albers_q(phi: f64, e: f64, e2: f64) -> f64 {
    let s = phi.sin();
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

/// Albers auxiliary m (Snyder 14-15).
fn albers_m(phi: f64, e2: f64) -> f64 {
    phi.cos() / (1.0 - e2 * phi.sin() * phi.sin()).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 0.05,
            "x: {} vs {}",
            actual.0,
            expected.0
        );
        assert!(
            (actual.1 - expected.1).abs() < 0.05,
            "y: {} vs {}",
            actual.1,
            expected.1
        );
    }

    #[test]
    fn test_origin_projects_to_zero() {
        let proj = AlaskaAlbers::new();
        assert_close(proj.forward(50.0, -154.0), (0.0, 0.0));
    }

    #[test]
    fn test_known_locations() {
        let proj = AlaskaAlbers::new();

        // Reference values from the EPSG:3338 ellipsoidal Albers series.
        assert_close(
            proj.forward(61.2181, -149.9003), // Anchorage
            (219349.579, 1255301.540),
        );
        assert_close(
            proj.forward(64.8378, -147.7164), // Fairbanks
            (297698.806, 1667062.246),
        );
        assert_close(
            proj.forward(71.2906, -156.7886), // Utqiagvik
            (-102347.938, 2368027.865),
        );
    }

    #[test]
    fn test_east_of_antimeridian() {
        let proj = AlaskaAlbers::new();

        // Attu sits at positive longitude but projects west of the
        // central meridian, not a hemisphere away.
        let (x, y) = proj.forward(52.894, 173.12);
        assert_close((x, y), (-2130412.508, 858493.019));
        assert!(x < 0.0);
    }

    #[test]
    fn test_project_polygon() {
        let proj = AlaskaAlbers::new();
        let poly = Polygon::new(vec![
            (-147.0, 64.0),
            (-146.0, 64.0),
            (-146.0, 65.0),
            (-147.0, 65.0),
            (-147.0, 64.0),
        ])
        .unwrap();

        let projected = proj.project_polygon(&poly);
        let bbox = projected.bbox();

        // Interior Alaska is northeast of the projection origin.
        assert!(bbox.west > 0.0);
        assert!(bbox.south > 1_500_000.0);
        assert!(bbox.width() > 0.0 && bbox.height() > 0.0);

        // The polygon center must land inside the projected ring.
        let (cx, cy) = proj.forward(64.5, -146.5);
        assert!(projected.contains(cx, cy));
    }
}
