//! Boundary polygon handler: the resolved area as GeoJSON.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use data_protocol::ApiError;
use geo_common::MultiPolygon;
use serde_json::json;

use crate::handlers::{json_response, respond};
use crate::pipeline;
use crate::state::AppState;

/// GET /boundary/area/:area_id
pub async fn boundary_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(area_id): Path<String>,
) -> Response {
    respond("boundary", "-", boundary_query(&state, &area_id).await)
}

async fn boundary_query(state: &AppState, area_id: &str) -> Result<Response, ApiError> {
    let (feature, catalog) = pipeline::fetch_area_feature(state, area_id).await?;

    let geometry = feature.geometry.clone().ok_or_else(|| {
        ApiError::BackendUnavailable(format!("boundary feature {} has no geometry", area_id))
    })?;
    // Round-trip through the polygon type so malformed backend geometry
    // fails here instead of reaching clients.
    let area = MultiPolygon::from_geojson_geometry(&geometry)?;

    let body = json!({
        "type": "Feature",
        "id": area_id,
        "properties": {
            "name": feature.property(&catalog.name_property),
            "category": catalog.category,
        },
        "geometry": area.to_geojson_geometry(),
    });

    Ok(json_response(&body))
}
