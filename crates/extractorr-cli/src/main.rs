//! Extractorr - watches a directory and extracts archives written into it.

mod cli;
mod error;
mod logging;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use extractorr_core::Pipeline;
use extractorr_core::WatchDispatcher;
use extractorr_core::watch::DispatcherState;
use extractorr_core::watch::Notifier;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded before parsing so its values feed the env-bound arguments.
    let dotenv = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring malformed .env file"),
    }

    let config = cli.to_config();
    config.validate().map_err(error::convert_config_error)?;
    info!(
        watch_dir = %config.watch_dir.display(),
        output_dir = %config.output_dir.display(),
        delete = config.delete_policy.is_enabled(),
        retry_attempts = config.retry.max_attempts,
        "starting"
    );

    let (notifier, events) =
        Notifier::start(&config.watch_dir).map_err(error::convert_watch_error)?;

    let shutdown = CancellationToken::new();
    let dispatcher = WatchDispatcher::new(Arc::new(Pipeline::new(&config)), shutdown.clone());
    let running = tokio::spawn(dispatcher.run(events));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("received ctrl-c, shutting down");
        signal_shutdown.cancel();
    });

    if config.scan_existing {
        let queued = notifier
            .scan_existing()
            .await
            .with_context(|| format!("failed to scan {}", config.watch_dir.display()))?;
        info!(queued, "queued files already present");
    }

    let summary = running.await.context("dispatcher task failed")?;
    drop(notifier);

    info!(
        succeeded = summary.jobs_succeeded,
        failed = summary.jobs_failed,
        ignored = summary.events_ignored,
        coalesced = summary.events_coalesced,
        "shutdown complete"
    );

    if summary.final_state == DispatcherState::Stopped {
        bail!(
            "stopped watching {}: the directory is no longer available",
            config.watch_dir.display()
        );
    }
    Ok(())
}
