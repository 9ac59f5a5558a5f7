//! Place listing handler: ids and names of a boundary catalog's features.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use coverage_client::parse_feature_collection;
use data_protocol::ApiError;
use serde_json::json;

use crate::handlers::{json_response, respond};
use crate::pipeline::map_fetch_error;
use crate::state::AppState;

/// GET /places/:category
pub async fn places_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(category): Path<String>,
) -> Response {
    respond("places", "-", places_query(&state, &category).await)
}

async fn places_query(state: &AppState, category: &str) -> Result<Response, ApiError> {
    let catalog = state
        .catalog_by_category(category)
        .ok_or_else(|| ApiError::UnknownArea(format!("Unknown place category: {}", category)))?;

    let url = state.vector.list_features_url(
        &catalog.type_name,
        &[catalog.id_property.as_str(), catalog.name_property.as_str()],
    );
    let body = state.client.get_json(&url).await.map_err(map_fetch_error)?;
    let features = parse_feature_collection(&body).map_err(map_fetch_error)?;

    // Features without an id are unreachable through the area endpoints;
    // drop them rather than listing something unqueryable.
    let mut places: Vec<_> = features
        .iter()
        .filter_map(|f| {
            let id = f.property(&catalog.id_property)?;
            Some(json!({
                "id": id,
                "name": f.property(&catalog.name_property),
            }))
        })
        .collect();
    places.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    Ok(json_response(&json!({
        "category": category,
        "places": places,
    })))
}
