//! Zonal statistics over raster windows.
//!
//! Area queries fetch a rectangular window of pixels covering a polygon's
//! envelope, then reduce the pixels whose cell centers fall inside the
//! polygon to summary statistics:
//!
//! ```text
//! Polygon + raster window
//!      │
//!      ▼
//! Grid::masked_values(polygon, nodata)
//!      │
//!      ├─► cell center inside polygon?  (even-odd ray cast)
//!      ├─► value not a nodata sentinel and finite?
//!      │
//!      ▼
//! surviving values
//!      │
//!      ├─► ContinuousSummary   min/mean/max, median, quartiles, ±1 stddev
//!      └─► CategoricalSummary  mode (smallest-code tie-break), percentages
//! ```
//!
//! Zero surviving values is [`ZonalError::EmptyIntersection`], never a
//! summary full of zeros.

pub mod categorical;
pub mod continuous;
pub mod error;
pub mod grid;

pub use categorical::CategoricalSummary;
pub use continuous::ContinuousSummary;
pub use error::{Result, ZonalError};
pub use grid::Grid;
