//! Dataset registry: configuration loading and types.
//!
//! Each dataset is one YAML file declaring its bounding boxes, backend
//! coverage bindings with axis label maps, nodata sentinels, and output
//! precision. The pipeline reads these declarations; no dataset has code
//! of its own.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use geo_common::BoundingBox;
use serde::{Deserialize, Serialize};

/// How a dataset's pixel values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Numeric pixels; zonal statistics are min/mean/max and friends.
    Continuous,
    /// Class-coded pixels; zonal statistics are mode and percentages.
    Categorical,
}

/// One ordered dimension axis of a coverage's returned array.
///
/// `labels` maps array index to the key used in output nesting (model
/// names, scenario names, era windows, years). An index with no label
/// falls back to its number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,

    #[serde(default)]
    pub labels: BTreeMap<usize, String>,
}

impl Axis {
    /// The output key for an array index.
    pub fn label(&self, index: usize) -> String {
        self.labels
            .get(&index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }
}

/// Binding of a dataset variable to a backend raster coverage.
///
/// `axes` are the non-spatial dimensions of the returned array, outermost
/// first. Window subsets gain a trailing Y/X grid below these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageBinding {
    pub coverage_id: String,
    pub variable: String,
    pub axes: Vec<Axis>,
}

impl CoverageBinding {
    /// Index of the axis with the given name.
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name == name)
    }
}

/// One dataset declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Path slug the dataset is served under.
    pub id: String,

    pub title: String,

    pub kind: DatasetKind,

    /// Valid-point regions; most datasets use the canonical antimeridian
    /// pair. A point inside any box is in-bounds.
    #[serde(default = "default_bboxes")]
    pub bboxes: Vec<BoundingBox>,

    pub coverages: Vec<CoverageBinding>,

    /// Sentinel values the backend uses for "no value here".
    #[serde(default = "default_nodata")]
    pub nodata: Vec<f64>,

    /// Class code to label map (categorical datasets only).
    #[serde(default)]
    pub categories: BTreeMap<u32, String>,

    /// Valid year range for the year-filtered point form.
    #[serde(default)]
    pub first_year: Option<i32>,

    #[serde(default)]
    pub last_year: Option<i32>,

    /// Decimal places for rounding continuous values.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

impl Dataset {
    /// Axis names in nesting order, from the first coverage.
    ///
    /// All coverages of a dataset share the same axis vocabulary; the
    /// first one is authoritative for output column naming.
    pub fn axis_names(&self) -> Vec<String> {
        self.coverages
            .first()
            .map(|c| c.axes.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Nesting depth of the year axis, if the dataset has one.
    pub fn year_depth(&self) -> Option<usize> {
        self.coverages.first().and_then(|c| c.axis_index("year"))
    }

    /// The output label for a class code.
    pub fn category_label(&self, code: u32) -> String {
        self.categories
            .get(&code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

/// The canonical coverage region, split at the antimeridian.
fn default_bboxes() -> Vec<BoundingBox> {
    vec![
        BoundingBox::new(-180.0, 51.3492, -122.8098, 71.3694),
        BoundingBox::new(172.4201, 51.3492, 180.0, 71.3694),
    ]
}

fn default_nodata() -> Vec<f64> {
    vec![-9999.0]
}

fn default_precision() -> u32 {
    1
}

/// All datasets, keyed by path slug.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    datasets: BTreeMap<String, Dataset>,
}

impl Registry {
    /// Load every `*.yaml` file in a directory, one dataset per file.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut datasets = BTreeMap::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read dataset config directory: {:?}", dir))?;

        for entry in entries {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read: {:?}", path))?;
            let dataset: Dataset = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse dataset config: {:?}", path))?;

            tracing::info!(dataset = %dataset.id, file = ?path, "Loaded dataset");
            datasets.insert(dataset.id.clone(), dataset);
        }

        Ok(Self { datasets })
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.get(id)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn from_datasets(datasets: Vec<Dataset>) -> Self {
        Self {
            datasets: datasets.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }
}
