//! API error taxonomy and its HTTP mapping.

use geo_common::{BoundingBox, CoordinateError, GeometryError};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while answering a data query.
///
/// Every variant maps to exactly one HTTP status via [`ApiError::status_code`]
/// and serializes to an [`ErrorBody`] via [`ApiError::to_body`]. Validation
/// errors are raised before any backend call is made.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Dataset slug not present in the registry.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// Area identifier matched no boundary catalog entry.
    #[error("Unknown area: {0}")]
    UnknownArea(String),

    /// Area identifier matched more than one boundary catalog.
    ///
    /// Catalog prefixes are chosen to be unique, so this indicates catalog
    /// drift on the server side, not client error.
    #[error("Area identifier {0} matches more than one boundary catalog")]
    AmbiguousArea(String),

    /// Invalid request parameter (bad year range, unknown summarize value).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed latitude/longitude path segment.
    #[error("Coordinate error: {0}")]
    CoordinateError(#[from] CoordinateError),

    /// Unsupported output format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Point falls outside every bounding box declared for the dataset.
    ///
    /// Carries the boxes that were checked so the response body can show
    /// the caller where the dataset actually has coverage.
    #[error("Point ({lat}, {lon}) is outside the coverage of this dataset")]
    OutOfBounds {
        lat: f64,
        lon: f64,
        bboxes: Vec<BoundingBox>,
    },

    /// Valid location, but the backend has no value there.
    #[error("No data at the requested location: {0}")]
    NoDataAtLocation(String),

    /// The polygon intersects zero usable grid cells.
    #[error("Area intersects no grid cells: {0}")]
    EmptyIntersection(String),

    /// Boundary feature came back structurally broken.
    #[error("Invalid geometry from boundary backend: {0}")]
    BadGeometry(#[from] GeometryError),

    /// A required backend call failed after the retry budget.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A required backend call timed out on its final attempt.
    #[error("Backend timed out: {0}")]
    BackendTimeout(String),

    /// Anything that should never happen in a well-configured deployment.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::UnknownDataset(_) => 404,
            ApiError::UnknownArea(_) => 404,
            ApiError::AmbiguousArea(_) => 500,
            ApiError::InvalidParameter(_) => 400,
            ApiError::CoordinateError(_) => 400,
            ApiError::UnsupportedFormat(_) => 400,
            ApiError::OutOfBounds { .. } => 422,
            ApiError::NoDataAtLocation(_) => 404,
            ApiError::EmptyIntersection(_) => 404,
            ApiError::BadGeometry(_) => 502,
            ApiError::BackendUnavailable(_) => 502,
            ApiError::BackendTimeout(_) => 504,
            ApiError::Internal(_) => 500,
        }
    }

    /// A short stable identifier for the error class.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::UnknownDataset(_) => "unknown-dataset",
            ApiError::UnknownArea(_) => "unknown-area",
            ApiError::AmbiguousArea(_) => "ambiguous-area",
            ApiError::InvalidParameter(_) => "invalid-parameter",
            ApiError::CoordinateError(_) => "invalid-coordinate",
            ApiError::UnsupportedFormat(_) => "unsupported-format",
            ApiError::OutOfBounds { .. } => "out-of-bounds",
            ApiError::NoDataAtLocation(_) => "no-data-at-location",
            ApiError::EmptyIntersection(_) => "empty-intersection",
            ApiError::BadGeometry(_) => "bad-geometry",
            ApiError::BackendUnavailable(_) => "backend-unavailable",
            ApiError::BackendTimeout(_) => "backend-timeout",
            ApiError::Internal(_) => "internal-error",
        }
    }

    /// Convert to the serializable response body.
    pub fn to_body(&self) -> ErrorBody {
        let bboxes = match self {
            ApiError::OutOfBounds { bboxes, .. } => Some(bboxes.clone()),
            _ => None,
        };

        ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                status: self.status_code(),
                message: self.to_string(),
                bboxes,
            },
        }
    }
}

/// JSON body for error responses: `{ "error": { ... } }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// The payload inside an [`ErrorBody`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub status: u16,
    pub message: String,

    /// Bounding boxes checked, present only for out-of-bounds errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bboxes: Option<Vec<BoundingBox>>,
}
