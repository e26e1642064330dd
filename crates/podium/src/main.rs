//! # podium
//!
//! Live sheet-music broadcast server: loads settings, wires the catalog,
//! verifier and live-session engine, and serves HTTP + `WebSocket`.

#![deny(unsafe_code)]

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use podium_live::{InMemoryCatalog, SongCatalog, SqliteCatalog};
use podium_server::{JwtVerifier, PodiumServer, ServerConfig};
use podium_settings::{LogFormat, PodiumSettings};
use tracing::{info, warn};

/// Live sheet-music broadcast server.
#[derive(Parser, Debug)]
#[command(name = "podium", version, about = "Live sheet-music broadcast server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.podium/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// `SQLite` song catalog (overrides settings).
    #[arg(long)]
    catalog_db: Option<PathBuf>,

    /// Emit JSON logs.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Layer command-line flags over loaded settings.
    fn apply(&self, settings: &mut PodiumSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(db) = &self.catalog_db {
            settings.catalog.db_path = Some(db.to_string_lossy().into_owned());
        }
        if self.log_json {
            settings.logging.format = LogFormat::Json;
        }
    }
}

fn load_settings(cli: &Cli) -> Result<PodiumSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(podium_settings::settings_path);
    if cli.settings.is_some() && !path.exists() {
        bail!("settings file not found: {}", path.display());
    }
    let mut settings = podium_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn open_catalog(settings: &PodiumSettings) -> Result<Arc<dyn SongCatalog>> {
    match settings.catalog.db_path.as_deref() {
        Some(path) => {
            let catalog = SqliteCatalog::open(path)
                .with_context(|| format!("Failed to open song catalog at {path}"))?;
            info!(path, "using SQLite song catalog");
            Ok(Arc::new(catalog))
        }
        None => {
            warn!("no catalog database configured; every song lookup will miss");
            Ok(Arc::new(InMemoryCatalog::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    logging::init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics = podium_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let catalog = open_catalog(&settings)?;
    let secret = settings.auth.jwt_secret.as_deref().unwrap_or_default();
    let verifier = Arc::new(JwtVerifier::new(secret, settings.auth.leeway_secs));

    let config = ServerConfig::from(&settings);
    let server = PodiumServer::new(config, catalog, verifier).with_metrics(metrics);
    let running = server.listen().await.context("Failed to bind server")?;
    info!(
        addr = %running.local_addr(),
        name = %settings.name,
        version = env!("CARGO_PKG_VERSION"),
        "podium listening"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("shutting down");
    if !running.shutdown(Some(Duration::from_secs(10))).await {
        warn!("shutdown did not complete cleanly");
    }
    info!("shutdown complete");
    Ok(())
}
