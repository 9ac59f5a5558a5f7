//! The generic validate -> resolve -> fetch -> aggregate -> shape pipeline.
//!
//! Every dataset endpoint runs through the same two entry points here,
//! parameterized by its registry declaration: [`run_point_query`] for
//! point extraction and [`run_area_query`] for zonal statistics over a
//! named polygon. Validation happens before any backend call; backend
//! fetches for multiple coverages are issued concurrently and merged by
//! key, so arrival order never matters.

use coverage_client::{parse_feature_collection, Feature, FetchError, NdArray};
use data_protocol::tree::float_value;
use data_protocol::{ApiError, ResultTree};
use geo_common::{bbox, BoundingBox, LatLon, MultiPolygon};
use serde_json::Value;
use tracing::debug;
use zonal_stats::{CategoricalSummary, ContinuousSummary, Grid};

use crate::config::{Axis, CoverageBinding, Dataset, DatasetKind};
use crate::state::{AppState, BoundaryCatalog};

/// Map a transport-level failure to its API error.
///
/// Timeouts surface as 504, everything else as 502. These are strict: a
/// coverage the backend cannot serve fails the whole request, unlike a
/// coverage that simply has no value at the location.
pub fn map_fetch_error(e: FetchError) -> ApiError {
    if e.is_timeout() {
        ApiError::BackendTimeout(e.to_string())
    } else {
        ApiError::BackendUnavailable(e.to_string())
    }
}

/// Run a point query against every coverage of a dataset.
///
/// Absent values (nodata sentinels, NaN) are omitted from the result
/// rather than failing the request; only a fully empty result is
/// `NoDataAtLocation`. This lenient degradation is intentional: a variable
/// missing at a point must not hide the variables that are present.
pub async fn run_point_query(
    state: &AppState,
    dataset: &Dataset,
    point: LatLon,
    years: Option<(i32, i32)>,
) -> Result<ResultTree, ApiError> {
    if !bbox::any_contains(&dataset.bboxes, point.lat, point.lon) {
        return Err(ApiError::OutOfBounds {
            lat: point.lat,
            lon: point.lon,
            bboxes: dataset.bboxes.clone(),
        });
    }

    let (x, y) = state.projection.forward(point.lat, point.lon);
    debug!(dataset = %dataset.id, lat = point.lat, lon = point.lon, x, y, "Point query");

    // Build every URL up front so parameter validation fails before any
    // backend call is made.
    let mut urls = Vec::with_capacity(dataset.coverages.len());
    let mut offsets = Vec::with_capacity(dataset.coverages.len());
    for coverage in &dataset.coverages {
        let mut axis_offsets = vec![0usize; coverage.axes.len()];
        let url = match years {
            None => state.raster.point_url(&coverage.coverage_id, x, y),
            Some((start, end)) => {
                let year_axis = coverage.axis_index("year").ok_or_else(|| {
                    ApiError::InvalidParameter(format!(
                        "Dataset {} does not support year filtering",
                        dataset.id
                    ))
                })?;
                let (lo, hi) = year_slice(
                    &coverage.axes[year_axis],
                    dataset.first_year,
                    dataset.last_year,
                    start,
                    end,
                )?;
                axis_offsets[year_axis] = lo;
                state
                    .raster
                    .point_slice_url(&coverage.coverage_id, x, y, "year", lo, hi)
            }
        };
        urls.push(url);
        offsets.push(axis_offsets);
    }

    let results = state.client.get_json_all(&urls).await;

    let mut tree = ResultTree::new();
    for ((coverage, result), axis_offsets) in
        dataset.coverages.iter().zip(results).zip(offsets)
    {
        let body = result.map_err(map_fetch_error)?;
        let arr = NdArray::from_json(&body).map_err(map_fetch_error)?;
        insert_point_values(&mut tree, dataset, coverage, &arr, &axis_offsets)?;
    }

    if dataset.kind == DatasetKind::Continuous {
        tree.nullify(&dataset.nodata);
        tree.prune();
    }

    if tree.is_empty() {
        return Err(ApiError::NoDataAtLocation(format!(
            "No data at point ({}, {}) for dataset {}",
            point.lat, point.lon, dataset.id
        )));
    }

    if dataset.kind == DatasetKind::Continuous {
        tree.round(dataset.precision);
    }

    Ok(tree)
}

/// Run a zonal-statistics query over a named area.
pub async fn run_area_query(
    state: &AppState,
    dataset: &Dataset,
    area_id: &str,
) -> Result<ResultTree, ApiError> {
    let (area, _catalog) = resolve_area(state, area_id).await?;

    // Mask in projected coordinates: the raster grids live in EPSG:3338,
    // and cell centers must be tested in the grid's own CRS.
    let projected = state.projection.project_multi(&area);
    let envelope = projected.bbox();
    debug!(dataset = %dataset.id, area_id, envelope = ?envelope.to_array(), "Area query");

    let urls: Vec<String> = dataset
        .coverages
        .iter()
        .map(|c| {
            state.raster.window_url(
                &c.coverage_id,
                envelope.west,
                envelope.south,
                envelope.east,
                envelope.north,
            )
        })
        .collect();

    let results = state.client.get_json_all(&urls).await;

    let mut tree = ResultTree::new();
    for (coverage, result) in dataset.coverages.iter().zip(results) {
        let body = result.map_err(map_fetch_error)?;
        let arr = NdArray::from_json(&body).map_err(map_fetch_error)?;
        insert_area_summaries(&mut tree, dataset, coverage, &arr, envelope, &projected)?;
    }

    // Groups with zero surviving cells were skipped; if nothing survived
    // anywhere, the polygon misses the grid entirely.
    if tree.is_empty() {
        return Err(ApiError::EmptyIntersection(format!(
            "Area {} intersects no usable cells of dataset {}",
            area_id, dataset.id
        )));
    }

    if dataset.kind == DatasetKind::Continuous {
        tree.round(dataset.precision);
    }

    Ok(tree)
}

/// Fetch the boundary feature for an area identifier.
pub async fn fetch_area_feature<'a>(
    state: &'a AppState,
    area_id: &str,
) -> Result<(Feature, &'a BoundaryCatalog), ApiError> {
    let catalog = state.catalog_for(area_id)?;

    let url = state
        .vector
        .feature_by_id_url(&catalog.type_name, &catalog.id_property, area_id);
    let body = state.client.get_json(&url).await.map_err(map_fetch_error)?;
    let features = parse_feature_collection(&body).map_err(map_fetch_error)?;

    let feature = features
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::UnknownArea(area_id.to_string()))?;
    Ok((feature, catalog))
}

/// Resolve an area identifier to its polygon via the vector backend.
pub async fn resolve_area<'a>(
    state: &'a AppState,
    area_id: &str,
) -> Result<(MultiPolygon, &'a BoundaryCatalog), ApiError> {
    let (feature, catalog) = fetch_area_feature(state, area_id).await?;
    let geometry = feature.geometry.ok_or_else(|| {
        ApiError::BackendUnavailable(format!("boundary feature {} has no geometry", area_id))
    })?;

    let area = MultiPolygon::from_geojson_geometry(&geometry)?;
    Ok((area, catalog))
}

/// Map year-filter bounds to an index range on the year axis.
///
/// The range is validated against the dataset's declared years first, so
/// a bad request fails with 400 before any backend traffic.
fn year_slice(
    axis: &Axis,
    first_year: Option<i32>,
    last_year: Option<i32>,
    start: i32,
    end: i32,
) -> Result<(usize, usize), ApiError> {
    let (Some(first), Some(last)) = (first_year, last_year) else {
        return Err(ApiError::InvalidParameter(
            "Dataset does not declare a year range".to_string(),
        ));
    };

    if start > end {
        return Err(ApiError::InvalidParameter(format!(
            "Start year {} is after end year {}",
            start, end
        )));
    }
    if start < first || end > last {
        return Err(ApiError::InvalidParameter(format!(
            "Years must fall within {}-{}",
            first, last
        )));
    }

    let mut lo: Option<usize> = None;
    let mut hi: Option<usize> = None;
    for (&index, label) in &axis.labels {
        if let Ok(year) = label.parse::<i32>() {
            if year >= start && year <= end {
                lo = Some(lo.map_or(index, |l| l.min(index)));
                hi = Some(hi.map_or(index, |h| h.max(index)));
            }
        }
    }

    match (lo, hi) {
        (Some(lo), Some(hi)) => Ok((lo, hi)),
        _ => Err(ApiError::Internal(format!(
            "Year axis labels do not cover {}-{}",
            start, end
        ))),
    }
}

/// Insert one coverage's point values into the result tree.
///
/// The path is the axis label for each index, then the variable name.
/// `axis_offsets` shifts indices for axes the backend sliced server-side.
fn insert_point_values(
    tree: &mut ResultTree,
    dataset: &Dataset,
    coverage: &CoverageBinding,
    arr: &NdArray,
    axis_offsets: &[usize],
) -> Result<(), ApiError> {
    if arr.shape.len() != coverage.axes.len() {
        return Err(ApiError::BackendUnavailable(format!(
            "coverage {} returned {} dimensions, expected {}",
            coverage.coverage_id,
            arr.shape.len(),
            coverage.axes.len()
        )));
    }

    for index in arr.outer_indices(arr.shape.len()) {
        let Some(value) = arr.get(&index) else { continue };

        let mut path: Vec<String> = index
            .iter()
            .zip(&coverage.axes)
            .zip(axis_offsets)
            .map(|((&i, axis), &offset)| axis.label(offset + i))
            .collect();
        path.push(coverage.variable.clone());

        match dataset.kind {
            DatasetKind::Continuous => tree.insert(&path, float_value(value)),
            DatasetKind::Categorical => {
                // Sentinels and non-codes are simply absent; categorical
                // leaves are labels, so nullify cannot clean them later.
                if let Some(code) = class_code(value, &dataset.nodata) {
                    tree.insert(&path, Value::String(dataset.category_label(code)));
                }
            }
        }
    }

    Ok(())
}

/// Insert one coverage's zonal summaries into the result tree.
///
/// The trailing two dimensions of the window response are the Y/X grid;
/// each combination of the leading axes is masked and reduced on its own.
/// Groups with zero surviving cells are skipped.
fn insert_area_summaries(
    tree: &mut ResultTree,
    dataset: &Dataset,
    coverage: &CoverageBinding,
    arr: &NdArray,
    envelope: BoundingBox,
    area: &MultiPolygon,
) -> Result<(), ApiError> {
    if arr.shape.len() != coverage.axes.len() + 2 {
        return Err(ApiError::BackendUnavailable(format!(
            "coverage {} returned {} dimensions, expected {} plus the Y/X grid",
            coverage.coverage_id,
            arr.shape.len(),
            coverage.axes.len()
        )));
    }

    let height = arr.shape[arr.shape.len() - 2];
    let width = arr.shape[arr.shape.len() - 1];

    for index in arr.outer_indices(coverage.axes.len()) {
        let values = arr.slice(&index).ok_or_else(|| {
            ApiError::Internal("window slice index out of range".to_string())
        })?;
        let grid = Grid::new(envelope, width, height, values)
            .map_err(|e| ApiError::BackendUnavailable(e.to_string()))?;

        let masked = grid.masked_values(area, &dataset.nodata);
        if masked.is_empty() {
            continue;
        }

        let path: Vec<String> = index
            .iter()
            .zip(&coverage.axes)
            .map(|(&i, axis)| axis.label(i))
            .collect();

        match dataset.kind {
            DatasetKind::Continuous => {
                let summary = ContinuousSummary::from_values(&masked)
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                let stats = [
                    ("min", summary.min),
                    ("mean", summary.mean),
                    ("max", summary.max),
                    ("median", summary.median),
                    ("q1", summary.q1),
                    ("q3", summary.q3),
                    ("lo_std", summary.lo_std),
                    ("hi_std", summary.hi_std),
                ];
                for (stat, value) in stats {
                    let mut leaf = path.clone();
                    leaf.push(coverage.variable.clone());
                    leaf.push(stat.to_string());
                    tree.insert(&leaf, float_value(value));
                }
            }
            DatasetKind::Categorical => {
                let summary = match CategoricalSummary::from_values(&masked) {
                    Ok(summary) => summary,
                    // Pixels that are not class codes mean the backend
                    // sent something unusable for this dataset.
                    Err(e) => return Err(ApiError::BackendUnavailable(e.to_string())),
                };

                let mut mode_path = path.clone();
                mode_path.push("mode".to_string());
                tree.insert(
                    &mode_path,
                    Value::String(dataset.category_label(summary.mode)),
                );

                for (code, percent) in &summary.percentages {
                    let mut leaf = path.clone();
                    leaf.push("percent".to_string());
                    leaf.push(dataset.category_label(*code));
                    tree.insert(&leaf, float_value(*percent));
                }
            }
        }
    }

    Ok(())
}

/// Interpret a pixel as a class code, unless it is nodata or not a code.
fn class_code(value: f64, nodata: &[f64]) -> Option<u32> {
    if !value.is_finite() || nodata.contains(&value) {
        return None;
    }
    let code = value.round();
    if code < 0.0 || code > u32::MAX as f64 || (value - code).abs() > 1e-6 {
        return None;
    }
    Some(code as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn axis(name: &str, labels: &[(usize, &str)]) -> Axis {
        Axis {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(i, l)| (*i, l.to_string()))
                .collect(),
        }
    }

    fn continuous_dataset() -> Dataset {
        Dataset {
            id: "temperature".to_string(),
            title: "Projected temperature".to_string(),
            kind: DatasetKind::Continuous,
            bboxes: vec![BoundingBox::new(-170.0, 50.0, -140.0, 72.0)],
            coverages: vec![CoverageBinding {
                coverage_id: "tas_projections".to_string(),
                variable: "tas".to_string(),
                axes: vec![
                    axis("model", &[(0, "GFDL-ESM2M"), (1, "CCSM4")]),
                    axis("scenario", &[(0, "rcp45"), (1, "rcp85")]),
                ],
            }],
            nodata: vec![-9999.0],
            categories: BTreeMap::new(),
            first_year: None,
            last_year: None,
            precision: 1,
        }
    }

    fn categorical_dataset() -> Dataset {
        Dataset {
            id: "snowpack".to_string(),
            title: "Snowpack classification".to_string(),
            kind: DatasetKind::Categorical,
            bboxes: vec![BoundingBox::new(-170.0, 50.0, -140.0, 72.0)],
            coverages: vec![CoverageBinding {
                coverage_id: "snowpack_classes".to_string(),
                variable: "snowpack".to_string(),
                axes: vec![axis("era", &[(0, "2040-2069")])],
            }],
            nodata: vec![0.0],
            categories: [(1, "high"), (2, "medium"), (3, "minimal")]
                .iter()
                .map(|(c, l)| (*c, l.to_string()))
                .collect(),
            first_year: None,
            last_year: None,
            precision: 1,
        }
    }

    #[test]
    fn test_year_slice_maps_years_to_indices() {
        let years = axis(
            "year",
            &[(0, "2010"), (1, "2011"), (2, "2012"), (3, "2013")],
        );

        let (lo, hi) = year_slice(&years, Some(2010), Some(2013), 2011, 2012).unwrap();
        assert_eq!((lo, hi), (1, 2));
    }

    #[test]
    fn test_year_slice_rejects_bad_ranges() {
        let years = axis("year", &[(0, "2010"), (1, "2011")]);

        // Reversed range.
        let err = year_slice(&years, Some(2010), Some(2011), 2011, 2010).unwrap_err();
        assert_eq!(err.status_code(), 400);

        // Outside the declared range.
        let err = year_slice(&years, Some(2010), Some(2011), 2005, 2011).unwrap_err();
        assert_eq!(err.status_code(), 400);

        // Dataset without a declared year range.
        let err = year_slice(&years, None, None, 2010, 2011).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_insert_point_values_continuous() {
        let dataset = continuous_dataset();
        let coverage = &dataset.coverages[0];
        // model x scenario.
        let arr = NdArray::from_json(&json!([[1.54, 2.61], [-9999.0, 3.0]])).unwrap();

        let mut tree = ResultTree::new();
        insert_point_values(&mut tree, &dataset, coverage, &arr, &[0, 0]).unwrap();
        tree.nullify(&dataset.nodata);
        tree.prune();
        tree.round(dataset.precision);

        // The sentinel leaf vanished; the rest are rounded floats.
        assert_eq!(
            tree.to_json(),
            json!({
                "CCSM4": {"rcp85": {"tas": 3.0}},
                "GFDL-ESM2M": {"rcp45": {"tas": 1.5}, "rcp85": {"tas": 2.6}},
            })
        );
    }

    #[test]
    fn test_insert_point_values_applies_axis_offsets() {
        let dataset = Dataset {
            coverages: vec![CoverageBinding {
                coverage_id: "tas_annual".to_string(),
                variable: "tas".to_string(),
                axes: vec![axis(
                    "year",
                    &[(0, "2010"), (1, "2011"), (2, "2012"), (3, "2013")],
                )],
            }],
            ..continuous_dataset()
        };
        let coverage = &dataset.coverages[0];
        // A server-side slice starting at index 2.
        let arr = NdArray::from_json(&json!([5.0, 6.0])).unwrap();

        let mut tree = ResultTree::new();
        insert_point_values(&mut tree, &dataset, coverage, &arr, &[2]).unwrap();

        assert_eq!(
            tree.to_json(),
            json!({"2012": {"tas": 5.0}, "2013": {"tas": 6.0}})
        );
    }

    #[test]
    fn test_insert_point_values_categorical_labels() {
        let dataset = categorical_dataset();
        let coverage = &dataset.coverages[0];
        let arr = NdArray::from_json(&json!([1.0])).unwrap();

        let mut tree = ResultTree::new();
        insert_point_values(&mut tree, &dataset, coverage, &arr, &[0]).unwrap();

        assert_eq!(tree.to_json(), json!({"2040-2069": {"snowpack": "high"}}));
    }

    #[test]
    fn test_insert_point_values_shape_mismatch() {
        let dataset = continuous_dataset();
        let coverage = &dataset.coverages[0];
        let arr = NdArray::from_json(&json!([1.0, 2.0])).unwrap();

        let mut tree = ResultTree::new();
        let err = insert_point_values(&mut tree, &dataset, coverage, &arr, &[0, 0]).unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    fn square_area(west: f64, south: f64, east: f64, north: f64) -> MultiPolygon {
        MultiPolygon::new(vec![geo_common::Polygon::new(vec![
            (west, south),
            (east, south),
            (east, north),
            (west, north),
            (west, south),
        ])
        .unwrap()])
        .unwrap()
    }

    #[test]
    fn test_insert_area_summaries_categorical() {
        let dataset = categorical_dataset();
        let coverage = &dataset.coverages[0];

        // era x 10 x 10 window: 60 cells of class 1, 40 of class 3.
        let mut cells = vec![1.0; 60];
        cells.extend(vec![3.0; 40]);
        let rows: Vec<Vec<f64>> = cells.chunks(10).map(|c| c.to_vec()).collect();
        let arr = NdArray::from_json(&json!([rows])).unwrap();

        let envelope = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let area = square_area(0.0, 0.0, 10.0, 10.0);

        let mut tree = ResultTree::new();
        insert_area_summaries(&mut tree, &dataset, coverage, &arr, envelope, &area).unwrap();

        assert_eq!(
            tree.to_json(),
            json!({
                "2040-2069": {
                    "mode": "high",
                    "percent": {"high": 60.0, "minimal": 40.0},
                }
            })
        );
    }

    #[test]
    fn test_insert_area_summaries_continuous() {
        let dataset = Dataset {
            coverages: vec![CoverageBinding {
                coverage_id: "tas_projections".to_string(),
                variable: "tas".to_string(),
                axes: vec![axis("model", &[(0, "CCSM4")])],
            }],
            ..continuous_dataset()
        };
        let coverage = &dataset.coverages[0];

        // model x 2 x 2 window.
        let arr = NdArray::from_json(&json!([[[1.0, 2.0], [3.0, 4.0]]])).unwrap();
        let envelope = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let area = square_area(0.0, 0.0, 2.0, 2.0);

        let mut tree = ResultTree::new();
        insert_area_summaries(&mut tree, &dataset, coverage, &arr, envelope, &area).unwrap();

        let json = tree.to_json();
        assert_eq!(json["CCSM4"]["tas"]["min"], 1.0);
        assert_eq!(json["CCSM4"]["tas"]["mean"], 2.5);
        assert_eq!(json["CCSM4"]["tas"]["max"], 4.0);
        assert_eq!(json["CCSM4"]["tas"]["median"], 2.5);
    }

    #[test]
    fn test_insert_area_summaries_skips_empty_groups() {
        let dataset = categorical_dataset();
        let coverage = &dataset.coverages[0];

        // Every cell is the nodata sentinel.
        let arr = NdArray::from_json(&json!([[[0.0, 0.0], [0.0, 0.0]]])).unwrap();
        let envelope = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let area = square_area(0.0, 0.0, 2.0, 2.0);

        let mut tree = ResultTree::new();
        insert_area_summaries(&mut tree, &dataset, coverage, &arr, envelope, &area).unwrap();

        // No group survived; the caller turns this into EmptyIntersection.
        assert!(tree.is_empty());
    }

    #[test]
    fn test_class_code() {
        assert_eq!(class_code(3.0, &[0.0]), Some(3));
        assert_eq!(class_code(0.0, &[0.0]), None); // nodata
        assert_eq!(class_code(f64::NAN, &[]), None);
        assert_eq!(class_code(1.5, &[]), None);
        assert_eq!(class_code(-2.0, &[]), None);
    }
}
