//! omxctl - drive omxplayer from the terminal
//!
//! # Usage
//!
//! ```bash
//! omxctl play movie.mp4 --paused -- -o hdmi
//! omxctl parse --file captured.log
//! omxctl probe-flag -r
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use omxctl::adapters::tracing_log::init_logging;
use omxctl::cli::{commands, Cli, Commands};
use omxctl::config_initialization::initialize_configuration_hierarchy;

/// Main entry point for the omxctl CLI
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = initialize_configuration_hierarchy(&cli)?;
    let config = loaded.config;
    init_logging(&config.log_level, config.json_logs)?;

    match &loaded.file {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    debug!(
        env_overrides = loaded.env_overrides,
        cli_overrides = loaded.cli_overrides,
        "Configuration resolved"
    );

    match cli.command {
        Commands::Play(args) => {
            debug!("Executing play command");
            commands::play(args, &config).await?;
        }
        Commands::Parse(args) => {
            debug!("Executing parse command");
            commands::parse(args, &config)?;
        }
        Commands::ProbeFlag(args) => {
            debug!("Executing probe-flag command");
            commands::probe_flag(args, &config)?;
        }
    }

    Ok(())
}
