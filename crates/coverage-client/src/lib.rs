//! HTTP client for the raster and vector coverage backends.
//!
//! The raster backend speaks WCS (`GetCoverage` with axis subsets) and
//! WCPS (`ProcessCoverages` for slicing); the vector backend speaks WFS
//! (`GetFeature` with CQL filters). Both return JSON. This crate owns URL
//! construction, the shared pooled client, bounded retry with exponential
//! backoff, concurrent fan-out over coverages, and decoding of the nested
//! array payloads.

pub mod client;
pub mod error;
pub mod ndarray;
pub mod wcs;
pub mod wfs;

pub use client::{CoverageClient, FetchConfig};
pub use error::FetchError;
pub use ndarray::NdArray;
pub use wcs::WcsEndpoint;
pub use wfs::{parse_feature_collection, Feature, WfsEndpoint};
