//! # DutyBot
//!
//! Rotates the person on duty among a roster and announces every change.
//!
//! Usage:
//!   dutybot                          # Run with ./dutybot.toml
//!   dutybot --config /etc/dutybot.toml
//!   dutybot --check                  # Validate and print the config, then exit

mod bot;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dutybot_core::DutyBotConfig;

use crate::bot::DutyBot;

#[derive(Parser)]
#[command(name = "dutybot", version, about = "📅 DutyBot — duty rotation with announcements")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value_os_t = DutyBotConfig::default_path())]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate and print the configuration, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "info,dutybot=debug,dutybot_scheduler=debug,dutybot_channels=debug,dutybot_calendar=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = PathBuf::from(shellexpand::tilde(&cli.config.to_string_lossy()).to_string());
    let config = DutyBotConfig::load_from(&config_path)
        .and_then(|config| config.validate().map(|()| config))
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    config.print();

    if cli.check {
        tracing::info!("✅ configuration is valid");
        return Ok(());
    }

    let bot = DutyBot::new(&config).await.context("could not set up projects")?;
    bot.start().await;

    let signal = wait_for_signal().await?;
    tracing::info!("received {signal}, shutting down");
    bot.shutdown().await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("could not listen for SIGTERM")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("could not listen for SIGINT")?;
            Ok("SIGINT")
        }
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await.context("could not listen for Ctrl-C")?;
    Ok("Ctrl-C")
}
