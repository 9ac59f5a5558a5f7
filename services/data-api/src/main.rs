//! Data API Server
//!
//! HTTP access to gridded climate datasets: point extraction, zonal
//! statistics over named areas, boundary polygons, and place listings.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Extension, Router};
use clap::Parser;
use coverage_client::FetchConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use data_api::config::Registry;
use data_api::handlers;
use data_api::state::{AppState, BackendConfig};

/// Data API Server
#[derive(Parser, Debug)]
#[command(name = "data-api")]
#[command(about = "HTTP API for gridded climate data queries")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8084", env = "DATA_API_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Dataset declaration directory
    #[arg(long, default_value = "config/datasets", env = "DATA_API_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Raster (WCS/WCPS) backend base URL
    #[arg(
        long,
        default_value = "http://localhost:8080/rasdaman/ows",
        env = "DATA_API_RASTER_URL"
    )]
    raster_url: String,

    /// Vector (WFS) backend base URL
    #[arg(
        long,
        default_value = "http://localhost:8600/geoserver/wfs",
        env = "DATA_API_VECTOR_URL"
    )]
    vector_url: String,

    /// Retries per backend request after the first attempt
    #[arg(long, default_value_t = 3, env = "DATA_API_MAX_RETRIES")]
    max_retries: u32,

    /// Per-request backend timeout in seconds
    #[arg(long, default_value_t = 30, env = "DATA_API_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,

    /// Number of worker threads
    #[arg(long, env = "DATA_API_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .expect("Failed to create Tokio runtime");

    runtime.block_on(async move {
        run_server(args).await;
    });
}

async fn run_server(args: Args) {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting data API server");

    let recorder = PrometheusBuilder::new().build_recorder();
    let metrics_handle = recorder.handle();
    if let Err(e) = metrics::set_global_recorder(recorder) {
        tracing::error!("Failed to install metrics recorder: {}", e);
        std::process::exit(1);
    }

    let registry = match Registry::load_from_dir(&args.config_dir) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Failed to load dataset registry: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(datasets = registry.len(), "Loaded dataset registry");

    let backends = BackendConfig {
        raster_url: args.raster_url.clone(),
        vector_url: args.vector_url.clone(),
    };
    let fetch = FetchConfig {
        max_retries: args.max_retries,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ..FetchConfig::default()
    };

    let state = match AppState::new(registry, backends, fetch, metrics_handle) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    // Build router. Static segments (/places, /boundary, /health, ...) take
    // priority over the :dataset capture.
    let app = Router::new()
        // Place listings and boundary polygons
        .route("/places/:category", get(handlers::places::places_handler))
        .route(
            "/boundary/area/:area_id",
            get(handlers::boundary::boundary_handler),
        )
        // Point queries
        .route(
            "/:dataset/point/:lat/:lon",
            get(handlers::point::point_handler),
        )
        .route(
            "/:dataset/point/:lat/:lon/:start_year/:end_year",
            get(handlers::point::point_years_handler),
        )
        // Area queries
        .route("/:dataset/area/:area_id", get(handlers::area::area_handler))
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    // Parse listen address
    let addr: SocketAddr = args.listen.parse().expect("Invalid listen address");

    info!("Data API listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server failed");
}
