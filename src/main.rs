//! Ginseng demo server.
//!
//! # Startup
//!
//! ```text
//!   CLI args ─▶ config (TOML, optional) ─▶ logging
//!                                            │
//!                                            ▼
//!   plugins: health, identity, whoami ─▶ Engine ─▶ init ─▶ middleware ─▶ routes ─▶ pre-run ─▶ serve
//! ```

use std::path::PathBuf;

use clap::Parser;

use ginseng::config::{load_config, ServerConfig};
use ginseng::observability::init_logging;
use ginseng::plugins::{Health, HealthOptions, Identity, IdentityOptions, WhoAmIPlugin};
use ginseng::Engine;

#[derive(Parser)]
#[command(name = "ginseng")]
#[command(about = "Plugin-driven HTTP server on axum", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ginseng::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.logging);
    tracing::info!("ginseng v{} starting", env!("CARGO_PKG_VERSION"));

    let addr = config.listener.bind_address.clone();
    tracing::info!(
        bind_address = %addr,
        request_timeout_secs = config.http.request_timeout_secs,
        body_limit_bytes = config.http.body_limit_bytes,
        "Configuration loaded"
    );

    let mut engine = Engine::with_config(config);
    engine.install::<Health>(&HealthOptions::default())?;
    engine.install::<Identity>(&IdentityOptions::default())?;
    engine.install::<WhoAmIPlugin>(&())?;

    engine.append_pre_run_func(|| tracing::info!("All plugins installed, accepting traffic"));
    engine.run(&addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
