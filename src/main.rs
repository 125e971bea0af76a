use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sched_delay::metrics::ReportSink;
use sched_delay::{monitor, Args, Config, Reporter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Reports own stdout; diagnostics go to stderr.
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = Arc::new(Config::try_from(args).context("invalid configuration")?);
    let reporter = Reporter::new(cfg.percentiles.clone(), ReportSink::Stdout);

    let _monitor = monitor::start(cfg, reporter).context("failed to start load workers")?;

    signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("Exiting...");
    std::process::exit(0);
}
