use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use logship_core::config::LogshipConfig;
use logship_daemon::cli::DaemonCli;
use logship_daemon::manager::{self, Manager};
use logship_daemon::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DaemonCli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("logship-daemon: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: DaemonCli) -> Result<()> {
    // file < env < CLI
    let mut config = LogshipConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        // Patterns and conditions only fail at chain construction.
        config.metrics.enabled = false;
        Manager::build_from_config(config)?;
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "logship-daemon starting"
    );

    let mut manager = Manager::build_from_config(config)?;
    manager
        .run(async {
            match manager::wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
            }
        })
        .await?;

    tracing::info!("logship-daemon shut down");
    Ok(())
}
