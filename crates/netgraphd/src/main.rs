//! netgraphd entry point.

use anyhow::Context;
use clap::Parser;
use netgraphd::{Daemon, DaemonConfig, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "netgraphd", version, about = "Multi-vendor network topology poller")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Override the output path from the config file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    info!("netgraphd: Starting");

    let mut config = DaemonConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if cli.once {
        config.poll.interval_secs = 0;
    }
    config.validate()?;

    info!(
        sites = config.sites.len(),
        interval_secs = config.poll.interval_secs,
        output = %config.output.path.display(),
        "netgraphd: Configuration loaded"
    );

    let daemon = Daemon::new(config).await;
    match daemon.run(shutdown_signal()).await {
        Ok(()) => {
            info!("netgraphd: Exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "netgraphd: Exiting with error");
            Err(e.into())
        }
    }
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {:?}", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed
        std::future::pending::<()>().await;
    }
    info!("netgraphd: Received SIGINT");
}
