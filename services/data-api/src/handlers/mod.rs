//! HTTP request handlers for the data API.

pub mod area;
pub mod boundary;
pub mod health;
pub mod places;
pub mod point;

use axum::http::{header, StatusCode};
use axum::response::Response;
use data_protocol::ApiError;
use metrics::counter;

/// A 200 JSON response.
fn json_response(body: &serde_json::Value) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_string().into())
        .unwrap_or_default()
}

/// A 200 CSV attachment response.
fn csv_response(csv: String, filename: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(csv.into())
        .unwrap_or_default()
}

/// An error response with the taxonomy's status and JSON body.
fn error_response(err: &ApiError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let json = serde_json::to_string(&err.to_body()).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(json.into())
        .unwrap_or_default()
}

/// Finish a request: count its outcome, log failures, build the response.
///
/// `dataset` is the path slug for dataset endpoints, or a fixed tag for
/// the surfaces that have none (boundary, places).
fn respond(endpoint: &'static str, dataset: &str, result: Result<Response, ApiError>) -> Response {
    match result {
        Ok(response) => {
            counter!(
                "api_requests_total",
                "endpoint" => endpoint,
                "dataset" => dataset.to_string(),
                "outcome" => "ok"
            )
            .increment(1);
            response
        }
        Err(err) => {
            counter!(
                "api_requests_total",
                "endpoint" => endpoint,
                "dataset" => dataset.to_string(),
                "outcome" => err.code()
            )
            .increment(1);
            if err.status_code() >= 500 {
                tracing::error!(endpoint, dataset, error = %err, "Request failed");
            } else {
                tracing::debug!(endpoint, dataset, error = %err, "Request rejected");
            }
            error_response(&err)
        }
    }
}
