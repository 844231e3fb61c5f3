// TOML config adapter - Player settings loaded from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::player_binary::{resolve_player, DEFAULT_PLAYER_PATH};
use crate::adapters::pty_process::{LaunchOptions, DEFAULT_STATS_FLAG};
use crate::adapters::tracing_log;
use crate::app::PlayerOptions;
use crate::domain::rules::StepPolicy;
use crate::engine::WatcherConfig;
use crate::error::{PlayerError, PlayerResult};
use crate::parser::PositionFormat;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "omxctl.toml";

/// Every tunable of a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Player binary; searched for on PATH when it does not exist
    pub program: PathBuf,
    pub stats_flag: String,
    pub adjust_refresh: bool,
    pub extra_args: Vec<String>,
    pub start_playing: bool,
    pub show_subtitles: bool,
    pub handshake_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub watcher_throttle_ms: u64,
    pub stop_grace_ms: u64,
    pub position: PositionFormat,
    pub step_policy: StepPolicy,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PLAYER_PATH),
            stats_flag: DEFAULT_STATS_FLAG.to_string(),
            adjust_refresh: true,
            extra_args: Vec::new(),
            start_playing: true,
            show_subtitles: false,
            handshake_timeout_ms: 10_000,
            read_timeout_ms: 1_000,
            watcher_throttle_ms: 100,
            stop_grace_ms: 2_000,
            position: PositionFormat::default(),
            step_policy: StepPolicy::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    player: PlayerConfig,
}

impl PlayerConfig {
    /// Parse the `[player]` table of a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> PlayerResult<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| PlayerError::config(format!("failed to parse TOML config: {}", e)))?;
        Ok(file.player)
    }

    pub fn load(path: &Path) -> PlayerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlayerError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml_str(&content)
    }

    /// Render as a `[player]` table
    pub fn to_toml_string(&self) -> PlayerResult<String> {
        let file = ConfigFile {
            player: self.clone(),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| PlayerError::config(format!("failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> PlayerResult<()> {
        let timeouts = [
            ("handshake_timeout_ms", self.handshake_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("stop_grace_ms", self.stop_grace_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(PlayerError::config(format!("{} must be greater than zero", name)));
            }
        }

        if self.position.marker.trim().is_empty() {
            return Err(PlayerError::config("position marker must not be empty"));
        }
        if self.program.as_os_str().is_empty() {
            return Err(PlayerError::config("program must not be empty"));
        }

        tracing_log::validate_level(&self.log_level)
    }

    /// Launch settings with the player binary resolved
    pub fn launch_options(&self) -> PlayerResult<LaunchOptions> {
        let program = resolve_player(&self.program)?;
        Ok(LaunchOptions {
            program,
            stats_flag: self.stats_flag.clone(),
            adjust_refresh: self.adjust_refresh,
            extra_args: self.extra_args.clone(),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
            position: self.position.clone(),
        })
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            start_playing: self.start_playing,
            show_subtitles: self.show_subtitles,
            step_policy: self.step_policy,
            watcher: WatcherConfig {
                read_timeout: Duration::from_millis(self.read_timeout_ms),
                throttle: Duration::from_millis(self.watcher_throttle_ms),
            },
        }
    }
}

/// Candidate config files, most specific first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];

    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
    if let Some(dir) = config_home {
        paths.push(dir.join("omxctl").join("config.toml"));
    }
    paths
}
