use anyhow::{ensure, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use fb_pageharvest::config;
use fb_pageharvest::graph::GraphClient;
use fb_pageharvest::harvest;
use fb_pageharvest::token::{self, Credentials};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run the token escalation and a single harvest, print the messages as JSON, then exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    #[arg(long)]
    app_id: String,
    #[arg(long)]
    app_secret: String,
    #[arg(long)]
    user_access_token: String,
    #[arg(long)]
    page_id: String,
    /// Trailing window in days (defaults to the configured window)
    #[arg(long)]
    days_ago: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Some(days) = args.days_ago {
        ensure!(
            days >= 1 && chrono::Duration::try_days(days).is_some(),
            "days_ago must be a positive number of days"
        );
    }
    let cfg = config::load(Some(&args.config))?;

    let graph = GraphClient::new(
        &cfg.graph.api_version,
        Duration::from_secs(cfg.graph.timeout_seconds),
    );

    let creds = Credentials {
        app_id: args.app_id,
        app_secret: args.app_secret,
        user_access_token: args.user_access_token,
        page_id: args.page_id,
    };

    let tokens = token::setup(&graph, &creds)
        .await
        .context("token setup failed")?;

    let mut options = cfg.harvest.options();
    if let Some(days) = args.days_ago {
        options.window_days = days;
    }

    let messages = harvest::harvest(&graph, &tokens, &creds.page_id, &options).await;
    info!(count = messages.len(), "harvest complete");

    println!("{}", serde_json::to_string_pretty(&messages)?);
    Ok(())
}
