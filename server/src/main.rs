mod error;
mod routes;
mod state;

use std::net::SocketAddr;

use maintdesk::config::{apply_env_overrides, config_path, load_config_or_default};
use maintdesk::{ConfigError, Database, DatabaseError, LogFormat, ServerConfig};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open database: {0}")]
    Database(#[from] DatabaseError),

    #[error("No database path configured and no home directory found")]
    NoDatabasePath,

    #[error("Invalid bind address '{0}'")]
    BindAddress(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

fn load_settings() -> Result<ServerConfig, ConfigError> {
    let mut config = match config_path() {
        Some(path) => load_config_or_default(&path)?,
        None => ServerConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level,
/// and `log` records from the library are forwarded to tracing.
fn init_logging(config: &ServerConfig) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to forward log records: {}", e);
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.log_format {
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    if let Err(e) = result {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|_| StartupError::BindAddress(config.bind_address.clone()))?;
    let db_path = config
        .resolved_database_path()
        .ok_or(StartupError::NoDatabasePath)?;

    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let app = routes::create_app(AppState::new(db, config));
    routes::run_server(app, addr, shutdown_signal()).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = match load_settings() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config);
    tracing::info!("Starting maintdesk server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
