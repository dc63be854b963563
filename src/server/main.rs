//! HTTP server for census geography lookups and profiles.
//!
//! Exposes search, coordinate resolution, geography lookup and profile
//! endpoints over a Postgres or CSV-backed store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use census_geo::config::{Config, PointSearchConfig, StoreConfig};
use census_geo::pointsearch::{load_ward_boundaries, PointSearch, WardBoundaryIndex, WardsApi};
use census_geo::profile::ProfileRegistry;
use census_geo::store::{GeoStore, MemoryStore, PgStore};
use census_geo::GeoService;

mod routes;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Census geography and profile server")]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Listen address, overriding the config file
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Loading config from {}", args.config.display());
    let config = Config::load_from_file(&args.config)?;

    let store = open_store(&config.store).await?;
    let point_search = open_point_search(&config.point_search)?;
    let service = GeoService::new(store, point_search, ProfileRegistry::youth());

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/geo/search", get(routes::search))
        .route("/api/v1/geo/coords", get(routes::coords))
        .route("/api/v1/geo/{geoid}", get(routes::geography))
        .route("/api/v1/profile/{geoid}", get(routes::profile))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let listen = args.listen.unwrap_or(config.server.listen);
    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn GeoStore>> {
    match config {
        StoreConfig::Postgres {
            url,
            max_connections,
            ensure_schema,
        } => {
            info!("Connecting to Postgres");
            let store = PgStore::connect(url, *max_connections).await?;
            if *ensure_schema {
                store.ensure_schema().await?;
            }
            Ok(Arc::new(store))
        }
        StoreConfig::Csv { dir } => {
            info!("Loading census tables from {}", dir.display());
            Ok(Arc::new(MemoryStore::load_dir(dir)?))
        }
    }
}

fn open_point_search(config: &PointSearchConfig) -> Result<Arc<dyn PointSearch>> {
    match config {
        PointSearchConfig::WardsApi { url, database } => {
            info!("Using wards API at {} ({})", url, database);
            Ok(Arc::new(WardsApi::new(url, database)?))
        }
        PointSearchConfig::Boundaries {
            path,
            code_property,
        } => {
            let boundaries = load_ward_boundaries(path, code_property)?;
            let index = WardBoundaryIndex::build(boundaries);
            info!("Indexed {} ward boundaries", index.len());
            Ok(Arc::new(index))
        }
    }
}
