use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use playscout_collector::{CollectOrchestrator, ProxyPool};
use playscout_core::ScraperConfig;
use playscout_playstore::HttpPlayStore;
use playscout_store::Persister;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod cli;

use cli::Cli;

fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// File config, then environment, then flags. Invalid values are usage errors.
fn load_config(cli: &Cli) -> Result<ScraperConfig> {
    let config = match &cli.config {
        Some(path) => ScraperConfig::load_from(path),
        None => ScraperConfig::load(),
    }
    .context("failed to load configuration")?;

    let config = cli.apply_overrides(config.with_env_overrides());
    if let Err(e) = config.validate() {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }
    Ok(config)
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping and saving what was collected so far");
            token.cancel();
        }
    });
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let seeds = cli.seeds();

    let destination = cli
        .output
        .clone()
        .unwrap_or_else(|| Persister::default_path(&config.output.dir, &seeds[0]));

    if cli.skip_existing && Persister::output_exists(&destination) {
        info!(path = %destination.display(), "Output already exists, skipping");
        return Ok(());
    }

    let store = Arc::new(
        HttpPlayStore::new(config.store.clone()).context("failed to create store client")?,
    );
    let pool = Arc::new(ProxyPool::from_config(&config.proxy));

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let orchestrator = CollectOrchestrator::with_cancellation(store, pool, &config, cancel);
    let outcome = orchestrator
        .run(seeds, cli.per_query_limit, cli.target_count)
        .await?;

    let written = Persister::new()
        .with_limit(cli.target_count)
        .save(&outcome.items, &destination)
        .with_context(|| format!("failed to write {}", destination.display()))?;

    let report = &outcome.report;
    println!(
        "{written} items ({} enriched, {} unresolved) -> {}",
        report.ids_enriched,
        report.ids_unresolved,
        destination.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    info!("Starting playscout v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
