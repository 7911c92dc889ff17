//! Sentinel daemon
//!
//! # Usage
//!
//! ```bash
//! # Run every configured monitor until Ctrl-C
//! sentinel-daemon --config /etc/sentinel/sentinel.toml
//!
//! # One cycle per monitor, then exit
//! sentinel-daemon --config sentinel.toml --once
//!
//! # Engine defaults can be overridden per process
//! SENTINEL_MAX_ACTION_ATTEMPTS=5 RUST_LOG=sentinel=debug sentinel-daemon
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sentinel::{JsonlLedger, LedgerSink, MonitorSet};
use sentinel_daemon::config::DaemonConfig;
use sentinel_daemon::{build_monitor, http};
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the daemon config file
    #[arg(long, short, default_value = "sentinel.toml")]
    config: PathBuf,

    /// Run a single cycle per monitor and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = DaemonConfig::load(&args.config)?;
    info!(
        config = %args.config.display(),
        ledger = %config.ledger.path.display(),
        monitors = config.monitors.len(),
        "Sentinel daemon starting"
    );

    let ledger: Arc<dyn LedgerSink> = Arc::new(JsonlLedger::new(config.ledger.path.clone()));
    let client = http::build_client(config.http.connect_timeout())
        .context("Failed to create HTTP client")?;

    let monitors = config
        .monitors
        .iter()
        .map(|settings| build_monitor(settings, &client, ledger.clone()).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;

    if args.once {
        for monitor in &monitors {
            let summary = monitor.run_cycle().await;
            info!(
                monitor = %monitor.category(),
                reports = summary.reports,
                violations = summary.violations,
                succeeded = summary.actions_succeeded,
                exhausted = summary.actions_exhausted,
                "Single cycle complete"
            );
        }
        return Ok(());
    }

    let mut set = MonitorSet::new();
    set.spawn_all(monitors);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, waiting for in-flight cycles");

    let mut failed = 0usize;
    for (name, result) in set.shutdown_all().await {
        if let Err(e) = result {
            error!(monitor = %name, "Monitor did not shut down cleanly: {}", e);
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{} monitor task(s) failed", failed);
    }

    info!("Sentinel daemon stopped");
    Ok(())
}
