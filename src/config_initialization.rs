//! Configuration initialization and hierarchy management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::adapters::toml_config::{default_config_paths, PlayerConfig};
use crate::cli::{Cli, Commands};
use crate::error::{PlayerError, PlayerResult};

/// Outcome of resolving the configuration hierarchy
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PlayerConfig,
    /// File that contributed settings, if any
    pub file: Option<PathBuf>,
    pub env_overrides: usize,
    pub cli_overrides: usize,
}

/// Resolve configuration following precedence: CLI > Env > File > Defaults.
///
/// Runs before logging is installed, so the caller reports the result.
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<LoadedConfig> {
    let (mut config, file) = match load_config_file(cli.config.as_deref())? {
        Some((config, path)) => (config, Some(path)),
        None => (PlayerConfig::default(), None),
    };

    let env_overrides = apply_environment_overrides(&mut config, |key| std::env::var(key).ok())
        .context("Invalid environment override")?;
    let cli_overrides = apply_cli_overrides(&mut config, cli);

    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfig {
        config,
        file,
        env_overrides,
        cli_overrides,
    })
}

/// Load the explicit file, or the first default location that exists
fn load_config_file(explicit: Option<&Path>) -> Result<Option<(PlayerConfig, PathBuf)>> {
    if let Some(path) = explicit {
        let config = PlayerConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        return Ok(Some((config, path.to_path_buf())));
    }

    for path in default_config_paths() {
        if path.is_file() {
            let config = PlayerConfig::load(&path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Apply `OMXCTL_*` variables; returns how many were set
pub fn apply_environment_overrides(
    config: &mut PlayerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> PlayerResult<usize> {
    let mut applied = 0;

    if let Some(program) = lookup("OMXCTL_PROGRAM") {
        config.program = PathBuf::from(program);
        applied += 1;
    }
    if let Some(level) = lookup("OMXCTL_LOG_LEVEL") {
        config.log_level = level;
        applied += 1;
    }
    if let Some(timeout) = lookup("OMXCTL_HANDSHAKE_TIMEOUT_MS") {
        config.handshake_timeout_ms = timeout.trim().parse().map_err(|_| {
            PlayerError::config(format!("OMXCTL_HANDSHAKE_TIMEOUT_MS is not a number: {}", timeout))
        })?;
        applied += 1;
    }
    if let Some(policy) = lookup("OMXCTL_STEP_POLICY") {
        config.step_policy = policy.parse()?;
        applied += 1;
    }
    if let Some(unit) = lookup("OMXCTL_POSITION_UNIT") {
        config.position.unit = unit.parse()?;
        applied += 1;
    }

    Ok(applied)
}

/// Apply command-line flags; returns how many were set
pub fn apply_cli_overrides(config: &mut PlayerConfig, cli: &Cli) -> usize {
    let mut applied = 0;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
        applied += 1;
    }
    if cli.json_logs {
        config.json_logs = true;
        applied += 1;
    }

    match &cli.command {
        Commands::Play(args) => {
            if args.paused {
                config.start_playing = false;
                applied += 1;
            }
            if args.show_subtitles {
                config.show_subtitles = true;
                applied += 1;
            }
            if args.no_refresh {
                config.adjust_refresh = false;
                applied += 1;
            }
            if let Some(program) = &args.program {
                config.program = program.clone();
                applied += 1;
            }
            if let Some(timeout) = args.handshake_timeout_ms {
                config.handshake_timeout_ms = timeout;
                applied += 1;
            }
        }
        Commands::Parse(args) => {
            if let Some(unit) = args.unit {
                config.position.unit = unit;
                applied += 1;
            }
            if let Some(marker) = &args.marker {
                config.position.marker = marker.clone();
                applied += 1;
            }
        }
        Commands::ProbeFlag(args) => {
            if let Some(program) = &args.program {
                config.program = program.clone();
                applied += 1;
            }
        }
    }

    applied
}
