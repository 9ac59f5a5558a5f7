//! Query-parameter negotiation shared by the data endpoints.

use data_protocol::ApiError;
use serde::Deserialize;

/// Response encoding selected by the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Csv => "text/csv",
        }
    }
}

/// Query parameters accepted by the point and area endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct QueryOptions {
    pub format: Option<String>,
    pub summarize: Option<String>,
}

impl QueryOptions {
    /// Parse the `format` parameter; absent means JSON.
    pub fn output_format(&self) -> Result<OutputFormat, ApiError> {
        match self.format.as_deref() {
            None | Some("json") => Ok(OutputFormat::Json),
            Some("csv") => Ok(OutputFormat::Csv),
            Some(other) => Err(ApiError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Parse the `summarize` parameter; only `mmm` is defined.
    pub fn summarize_mmm(&self) -> Result<bool, ApiError> {
        match self.summarize.as_deref() {
            None => Ok(false),
            Some("mmm") => Ok(true),
            Some(other) => Err(ApiError::InvalidParameter(format!(
                "Unknown summarize value: {} (expected \"mmm\")",
                other
            ))),
        }
    }
}

/// A safe attachment filename from path pieces.
pub fn csv_filename(parts: &[&str]) -> String {
    let joined = parts.join("_");
    let mut name: String = joined
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    name.push_str(".csv");
    name
}
