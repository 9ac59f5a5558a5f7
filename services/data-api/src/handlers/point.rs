//! Point query handlers.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::response::Response;
use data_protocol::{render_csv, ApiError, CsvOptions};
use geo_common::parse_lat_lon;

use crate::config::DatasetKind;
use crate::format::{csv_filename, OutputFormat, QueryOptions};
use crate::handlers::{csv_response, json_response, respond};
use crate::pipeline;
use crate::state::AppState;

/// GET /:dataset/point/:lat/:lon
pub async fn point_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((dataset, lat, lon)): Path<(String, String, String)>,
    Query(params): Query<QueryOptions>,
) -> Response {
    respond(
        "point",
        &dataset,
        point_query(&state, &dataset, &lat, &lon, None, &params).await,
    )
}

/// GET /:dataset/point/:lat/:lon/:start_year/:end_year
pub async fn point_years_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((dataset, lat, lon, start_year, end_year)): Path<(
        String,
        String,
        String,
        String,
        String,
    )>,
    Query(params): Query<QueryOptions>,
) -> Response {
    let years = match parse_years(&start_year, &end_year) {
        Ok(years) => years,
        Err(err) => return respond("point", &dataset, Err(err)),
    };
    respond(
        "point",
        &dataset,
        point_query(&state, &dataset, &lat, &lon, Some(years), &params).await,
    )
}

fn parse_years(start: &str, end: &str) -> Result<(i32, i32), ApiError> {
    let start: i32 = start
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidParameter(format!("Invalid start year: {}", start)))?;
    let end: i32 = end
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidParameter(format!("Invalid end year: {}", end)))?;
    Ok((start, end))
}

async fn point_query(
    state: &AppState,
    dataset_id: &str,
    lat: &str,
    lon: &str,
    years: Option<(i32, i32)>,
    params: &QueryOptions,
) -> Result<Response, ApiError> {
    // Negotiate output first so a bad format fails before any backend call.
    let format = params.output_format()?;
    let summarize = params.summarize_mmm()?;

    let dataset = state
        .registry
        .get(dataset_id)
        .ok_or_else(|| ApiError::UnknownDataset(dataset_id.to_string()))?;
    let point = parse_lat_lon(lat, lon)?;

    let tree = pipeline::run_point_query(state, dataset, point, years).await?;

    // The mmm collapse only makes sense over numeric year values; for
    // categorical datasets the parameter is ignored rather than rejected.
    let summarize = summarize && dataset.kind == DatasetKind::Continuous;

    let (tree, columns) = if summarize {
        let depth = dataset.year_depth().ok_or_else(|| {
            ApiError::InvalidParameter(format!(
                "Dataset {} has no year axis to summarize over",
                dataset.id
            ))
        })?;

        let mut summarized = tree.summarize_mmm(depth);
        summarized.round(dataset.precision);

        let mut columns = dataset.axis_names();
        columns.remove(depth);
        columns.push("variable".to_string());
        columns.push("statistic".to_string());
        (summarized, columns)
    } else {
        let mut columns = dataset.axis_names();
        columns.push("variable".to_string());
        (tree, columns)
    };

    match format {
        OutputFormat::Json => Ok(json_response(&tree.to_json())),
        OutputFormat::Csv => {
            let options = CsvOptions::new(columns).with_metadata(vec![
                format!("dataset: {}", dataset.title),
                format!("location: {}, {}", point.lat, point.lon),
                format!("source: {}", state.raster.base_url()),
            ]);
            let csv = render_csv(&tree, &options);
            Ok(csv_response(csv, &csv_filename(&[&dataset.id, lat, lon])))
        }
    }
}
