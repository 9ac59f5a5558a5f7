//! Area (zonal statistics) query handler.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::response::Response;
use data_protocol::{render_csv, ApiError, CsvOptions};

use crate::config::DatasetKind;
use crate::format::{csv_filename, OutputFormat, QueryOptions};
use crate::handlers::{csv_response, json_response, respond};
use crate::pipeline;
use crate::state::AppState;

/// GET /:dataset/area/:area_id
pub async fn area_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((dataset, area_id)): Path<(String, String)>,
    Query(params): Query<QueryOptions>,
) -> Response {
    respond(
        "area",
        &dataset,
        area_query(&state, &dataset, &area_id, &params).await,
    )
}

async fn area_query(
    state: &AppState,
    dataset_id: &str,
    area_id: &str,
    params: &QueryOptions,
) -> Result<Response, ApiError> {
    let format = params.output_format()?;
    // Validated for its value, but the collapse only applies to point
    // queries; area responses already carry their own statistics.
    params.summarize_mmm()?;

    let dataset = state
        .registry
        .get(dataset_id)
        .ok_or_else(|| ApiError::UnknownDataset(dataset_id.to_string()))?;

    let tree = pipeline::run_area_query(state, dataset, area_id).await?;

    match format {
        OutputFormat::Json => Ok(json_response(&tree.to_json())),
        OutputFormat::Csv => {
            let mut columns = dataset.axis_names();
            match dataset.kind {
                DatasetKind::Continuous => {
                    columns.push("variable".to_string());
                    columns.push("statistic".to_string());
                }
                DatasetKind::Categorical => {
                    columns.push("statistic".to_string());
                    columns.push("category".to_string());
                }
            }

            let options = CsvOptions::new(columns).with_metadata(vec![
                format!("dataset: {}", dataset.title),
                format!("area: {}", area_id),
                format!("source: {}", state.raster.base_url()),
            ]);
            let csv = render_csv(&tree, &options);
            Ok(csv_response(csv, &csv_filename(&[&dataset.id, area_id])))
        }
    }
}
