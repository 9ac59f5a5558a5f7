//! WCS/WCPS request construction for the raster backend.
//!
//! Point and window subsets use plain WCS `GetCoverage` with `SUBSET`
//! parameters on the projected X/Y axes. Year-filtered queries use a WCPS
//! `ProcessCoverages` query so the year axis can be sliced server-side.

/// A raster backend endpoint (Rasdaman-style OWS URL).
#[derive(Debug, Clone)]
pub struct WcsEndpoint {
    base_url: String,
}

impl WcsEndpoint {
    /// Wrap a base OWS URL, e.g. `http://backend:8080/rasdaman/ows`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GetCoverage URL for a single projected point.
    ///
    /// The backend answers with the full nested array over the coverage's
    /// remaining axes (model, scenario, era, ...) at that point.
    pub fn point_url(&self, coverage_id: &str, x: f64, y: f64) -> String {
        format!(
            "{}?SERVICE=WCS&VERSION=2.0.1&REQUEST=GetCoverage&COVERAGEID={}\
             &SUBSET=X({})&SUBSET=Y({})&FORMAT=application/json",
            self.base_url, coverage_id, x, y
        )
    }

    /// GetCoverage URL for a projected window (a polygon's envelope).
    ///
    /// The innermost two dimensions of the response become the Y/X grid.
    pub fn window_url(
        &self,
        coverage_id: &str,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    ) -> String {
        format!(
            "{}?SERVICE=WCS&VERSION=2.0.1&REQUEST=GetCoverage&COVERAGEID={}\
             &SUBSET=X({},{})&SUBSET=Y({},{})&FORMAT=application/json",
            self.base_url, coverage_id, xmin, xmax, ymin, ymax
        )
    }

    /// ProcessCoverages URL slicing one axis to an index range at a point.
    ///
    /// Used by year-filtered point queries: the axis holds one slice per
    /// year and `start..=end` are indices into it.
    pub fn point_slice_url(
        &self,
        coverage_id: &str,
        x: f64,
        y: f64,
        axis: &str,
        start: usize,
        end: usize,
    ) -> String {
        let query = format!(
            "for $c in ({}) return encode($c[X({}),Y({}),{}({}:{})], \"application/json\")",
            coverage_id, x, y, axis, start, end
        );
        format!(
            "{}?SERVICE=WCS&VERSION=2.0.1&REQUEST=ProcessCoverages&QUERY={}",
            self.base_url,
            percent_encode(&query)
        )
    }
}

/// Percent-encode a query parameter value.
///
/// Unreserved characters (RFC 3986) pass through; everything else is
/// encoded, including spaces.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_url() {
        let wcs = WcsEndpoint::new("http://backend:8080/rasdaman/ows");
        let url = wcs.point_url("tas_projections", 297698.8, 1667062.2);

        assert!(url.starts_with("http://backend:8080/rasdaman/ows?SERVICE=WCS"));
        assert!(url.contains("REQUEST=GetCoverage"));
        assert!(url.contains("COVERAGEID=tas_projections"));
        assert!(url.contains("SUBSET=X(297698.8)"));
        assert!(url.contains("SUBSET=Y(1667062.2)"));
        assert!(url.contains("FORMAT=application/json"));
    }

    #[test]
    fn test_window_url_orders_min_max() {
        let wcs = WcsEndpoint::new("http://backend:8080/rasdaman/ows/");
        let url = wcs.window_url("snowpack", 100.0, 200.0, 300.0, 400.0);

        assert!(url.contains("SUBSET=X(100,300)"));
        assert!(url.contains("SUBSET=Y(200,400)"));
        // Trailing slash on the base URL must not double up.
        assert!(url.contains("ows?SERVICE"));
    }

    #[test]
    fn test_point_slice_url_encodes_wcps_query() {
        let wcs = WcsEndpoint::new("http://backend:8080/rasdaman/ows");
        let url = wcs.point_slice_url("tas_annual", 10.5, -20.0, "year", 3, 12);

        assert!(url.contains("REQUEST=ProcessCoverages"));
        // The WCPS query is a single percent-encoded parameter.
        assert!(url.contains("QUERY=for%20%24c%20in%20%28tas_annual%29"));
        assert!(url.contains("year%283%3A12%29"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_percent_encode_unreserved_passthrough() {
        assert_eq!(percent_encode("abc-123_.~"), "abc-123_.~");
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode("\"x\""), "%22x%22");
    }
}
