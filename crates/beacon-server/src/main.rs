//! beacon-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), starts an
//! in-process alert store, and serves the Beacon API over HTTP.
//!
//! ```
//! cargo run -p beacon-server -- --port 9000
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use beacon_server::{AppState, ServerConfig};
use beacon_store_memory::{MemoryStore, spawn_reaper};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Beacon alert synchronization server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Override the listen host from the configuration.
  #[arg(long)]
  host: Option<String>,

  /// Override the listen port from the configuration.
  #[arg(long)]
  port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration; CLI flags win over file and environment.
  let mut server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;
  if let Some(host) = cli.host {
    server_cfg.host = host;
  }
  if let Some(port) = cli.port {
    server_cfg.port = port;
  }

  let store = MemoryStore::new();

  match server_cfg.alert_ttl() {
    Some(ttl) => {
      spawn_reaper(store.clone(), ttl, server_cfg.reap_interval());
    }
    None => tracing::info!("alert expiry disabled, alerts persist until cleared"),
  }

  let state = AppState {
    store:  store.clone(),
    config: Arc::new(server_cfg.clone()),
  };
  let app = beacon_server::router(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(store))
    .await
    .context("server error")?;

  Ok(())
}

/// Resolve on Ctrl-C after closing the store, which ends open `/stream`
/// connections so the graceful shutdown can complete.
async fn shutdown_signal(store: MemoryStore) {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for Ctrl-C: {e}");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
  store.shutdown().await;
}
