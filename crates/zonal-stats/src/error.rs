//! Error types for zonal statistics.

use thiserror::Error;

/// Errors that can occur while reducing a raster window.
#[derive(Debug, Error, PartialEq)]
pub enum ZonalError {
    /// No cell survived masking: the polygon covers no usable pixels.
    #[error("polygon intersects no usable grid cells")]
    EmptyIntersection,

    /// The value buffer does not match the declared grid dimensions.
    #[error("grid size mismatch: {width}x{height} declared, {len} values")]
    SizeMismatch {
        width: usize,
        height: usize,
        len: usize,
    },

    /// A categorical value that cannot be a class code.
    #[error("invalid category code: {0}")]
    InvalidCategory(f64),
}

/// Result type for zonal statistics operations.
pub type Result<T> = std::result::Result<T, ZonalError>;
