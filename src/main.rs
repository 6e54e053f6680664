mod api;
mod cli;
mod config;
mod error;
mod pipeline;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use api::SessionClient;
use cli::Cli;
use config::{MigrateConfig, Settings};
use error::MigrateError;
use pipeline::RunSummary;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

/// Log in, then drive the pipeline. A rejected login returns before any
/// listing or migration request is made.
async fn run(settings: &Settings) -> Result<RunSummary, MigrateError> {
    info!(base_url = %settings.base_url, "attempting to log in");
    let client =
        SessionClient::authenticate(&settings.base_url, &settings.username, &settings.password)
            .await?;
    info!(base_url = client.base_url(), "login successful");

    let plan = &settings.plan;
    info!(
        offset = plan.offset,
        count = plan.count,
        consumers = plan.consumers,
        actions = ?plan.actions,
        "starting migration"
    );
    Ok(pipeline::run_pipeline(Arc::new(client), plan).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = MigrateConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let settings = Settings::resolve(&cli, config, |key| std::env::var(key).ok())?;

    let summary = run(&settings).await?;
    ui::print_summary(&summary);

    Ok(())
}
