//! Application state, built once in `main` and shared by every handler.

use anyhow::Result;
use coverage_client::{CoverageClient, FetchConfig, WcsEndpoint, WfsEndpoint};
use data_protocol::ApiError;
use geo_common::AlaskaAlbers;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Registry;

/// Backend endpoint URLs, resolved from CLI/env in `main`.
///
/// Nothing reads environment variables at request time; this struct is the
/// only way backend locations reach the pipeline.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Raster (WCS/WCPS) backend base URL.
    pub raster_url: String,
    /// Vector (WFS) backend base URL.
    pub vector_url: String,
}

/// How an area identifier is recognized as belonging to a catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum IdRule {
    /// Exactly this many ASCII digits (HUC-8 codes).
    Digits(usize),
    /// One of these prefixes followed by digits.
    Prefixes(Vec<String>),
}

impl IdRule {
    pub fn matches(&self, id: &str) -> bool {
        match self {
            IdRule::Digits(n) => id.len() == *n && id.chars().all(|c| c.is_ascii_digit()),
            IdRule::Prefixes(prefixes) => prefixes.iter().any(|p| {
                id.len() > p.len()
                    && id.starts_with(p.as_str())
                    && id[p.len()..].chars().all(|c| c.is_ascii_digit())
            }),
        }
    }
}

/// One external boundary catalog: a vector layer plus the identifier rule
/// that routes area ids to it.
#[derive(Debug, Clone)]
pub struct BoundaryCatalog {
    /// Category slug used by the places listing (`hucs`, ...).
    pub category: String,
    /// WFS layer name.
    pub type_name: String,
    /// Feature property holding the area identifier.
    pub id_property: String,
    /// Feature property holding the display name.
    pub name_property: String,
    pub rule: IdRule,
}

impl BoundaryCatalog {
    /// The catalogs this deployment resolves areas against.
    ///
    /// Identifier rules are disjoint by convention; [`AppState::catalog_for`]
    /// still checks for overlap on every lookup to catch catalog drift.
    pub fn defaults() -> Vec<BoundaryCatalog> {
        vec![
            BoundaryCatalog {
                category: "hucs".to_string(),
                type_name: "hydrology:huc8".to_string(),
                id_property: "huc8_id".to_string(),
                name_property: "name".to_string(),
                rule: IdRule::Digits(8),
            },
            BoundaryCatalog {
                category: "protected_areas".to_string(),
                type_name: "boundaries:protected_areas".to_string(),
                id_property: "area_id".to_string(),
                name_property: "name".to_string(),
                rule: IdRule::Prefixes(vec![
                    "NPS".to_string(),
                    "FWS".to_string(),
                    "USFS".to_string(),
                    "BLM".to_string(),
                ]),
            },
            BoundaryCatalog {
                category: "communities".to_string(),
                type_name: "places:communities".to_string(),
                id_property: "community_id".to_string(),
                name_property: "name".to_string(),
                rule: IdRule::Prefixes(vec!["AK".to_string()]),
            },
        ]
    }
}

/// Shared application state.
pub struct AppState {
    pub registry: Registry,
    pub client: CoverageClient,
    pub raster: WcsEndpoint,
    pub vector: WfsEndpoint,
    pub projection: AlaskaAlbers,
    pub catalogs: Vec<BoundaryCatalog>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Assemble the state from already-resolved configuration.
    pub fn new(
        registry: Registry,
        backends: BackendConfig,
        fetch: FetchConfig,
        metrics: PrometheusHandle,
    ) -> Result<Self> {
        let client = CoverageClient::new(fetch)
            .map_err(|e| anyhow::anyhow!("failed to build backend client: {}", e))?;

        Ok(Self {
            registry,
            client,
            raster: WcsEndpoint::new(backends.raster_url),
            vector: WfsEndpoint::new(backends.vector_url),
            projection: AlaskaAlbers::new(),
            catalogs: BoundaryCatalog::defaults(),
            metrics,
        })
    }

    /// Route an area identifier to its boundary catalog.
    ///
    /// Fails with `UnknownArea` when no rule matches and `AmbiguousArea`
    /// when more than one does.
    pub fn catalog_for(&self, area_id: &str) -> Result<&BoundaryCatalog, ApiError> {
        let mut matches = self.catalogs.iter().filter(|c| c.rule.matches(area_id));

        let first = matches
            .next()
            .ok_or_else(|| ApiError::UnknownArea(area_id.to_string()))?;

        if matches.next().is_some() {
            return Err(ApiError::AmbiguousArea(area_id.to_string()));
        }

        Ok(first)
    }

    /// The catalog serving a places category, if any.
    pub fn catalog_by_category(&self, category: &str) -> Option<&BoundaryCatalog> {
        self.catalogs.iter().find(|c| c.category == category)
    }
}
