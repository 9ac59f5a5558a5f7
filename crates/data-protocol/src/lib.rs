//! Shared request/response vocabulary for the data API.
//!
//! This crate owns the pieces every endpoint has in common: the error
//! taxonomy with its HTTP status mapping, the nested result tree that all
//! query responses are built in, and the two output encodings (nested JSON
//! and flat CSV) derived from that one tree so they can never drift apart.

pub mod csv;
pub mod errors;
pub mod tree;

pub use csv::{render_csv, CsvOptions};
pub use errors::{ApiError, ErrorBody};
pub use tree::{Node, ResultTree};
