use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Compress, web};
use anyhow::Context;
use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cluster;
mod coords;
mod db;
mod db_models;
mod diff;
mod error;
mod filters;
mod handlers;
mod markers;
mod models;
mod pipeline;
mod state;
mod utils;
mod viewport;

pub use state::State;

/// Reported by `/api/health`.
pub const VERSION: &str = env!("GIT_TAG");

/// Command line configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Config {
    /// IP address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Port to bind the server to
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database file holding reports, gas stations and motors
    #[arg(long, default_value = "tripmap.db")]
    database_file: PathBuf,

    /// JSON file with `reports`, `gasStations` and `motors` arrays to load into the database on startup
    #[arg(long)]
    import_file: Option<PathBuf>,

    /// Default clustering radius in meters, used when a request doesn't give one
    #[arg(long, default_value_t = cluster::DEFAULT_RADIUS_M)]
    cluster_radius: f64,

    /// Zoom level from which markers are no longer clustered
    #[arg(long, default_value_t = cluster::DEFAULT_MIN_ZOOM)]
    cluster_min_zoom: f64,

    /// Zoom level assumed when a request doesn't send currentZoom
    #[arg(long, default_value_t = 10.0)]
    default_zoom: f64,

    /// Requests taking longer than this are logged as warnings
    #[arg(long, default_value = "250ms")]
    slow_threshold: humantime::Duration,
}

impl Config {
    fn map_settings(&self) -> state::MapSettings {
        state::MapSettings {
            cluster_options: cluster::ClusterOptions {
                radius: self.cluster_radius,
                min_zoom: self.cluster_min_zoom,
            },
            default_zoom: self.default_zoom,
            slow_threshold: self.slow_threshold.into(),
        }
    }
}

async fn import_file(db: &db::DbClient, path: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {path:?}"))?;
    let bundle: db_models::ImportBundle = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse import file {path:?}"))?;
    db.import(&bundle)
        .await
        .with_context(|| format!("Failed to import {path:?}"))
}

async fn real_main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_line_number(true)
        .with_target(true)
        .init();

    info!("Initializing tripmap {VERSION}");

    let config = Config::parse();

    info!("Configuration: {config:?}"); // Log the parsed configuration

    let db = db::DbClient::new(&config.database_file).await?;
    if let Some(path) = &config.import_file {
        import_file(&db, path).await?;
    }

    let app_state = web::Data::new(State::new(db, config.map_settings()));

    info!("Starting server on {}:{}", config.address, config.port);

    // Start the HTTP server.
    Ok(HttpServer::new(move || {
        // Configure CORS to allow cross-origin requests from any origin.
        let cors = Cors::permissive();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(app_state.clone())
            .app_data(handlers::json_config())
            .app_data(handlers::query_config())
            .configure(handlers::configure)
    })
    .bind((config.address.as_str(), config.port))? // Use parsed address and port
    .run()
    .await?)
}

#[actix_web::main]
async fn main() -> std::process::ExitCode {
    match real_main().await {
        Ok(()) => std::process::ExitCode::from(0),
        Err(err) => {
            error!("{err:#}");
            std::process::ExitCode::from(10)
        }
    }
}
