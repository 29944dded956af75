use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use fb_pageharvest::config;
use fb_pageharvest::graph::GraphClient;
use fb_pageharvest::server::{self, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let graph = GraphClient::new(
        &cfg.graph.api_version,
        Duration::from_secs(cfg.graph.timeout_seconds),
    );
    let state = AppState {
        graph: Arc::new(graph),
        defaults: cfg.harvest.options(),
    };
    let app = server::router(state, &cfg.server.allowed_origins);

    info!("starting server on {}", cfg.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
