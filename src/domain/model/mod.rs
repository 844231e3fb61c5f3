// Domain models - Core types and data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlayerError;


/// Video stream properties announced by the player during the handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProperties {
    /// Decoder name (e.g. `omx-h264`)
    pub decoder: String,
    pub width: u32,
    pub height: u32,
    pub profile: i32,
    /// Frame rate, always strictly positive
    pub fps: f64,
}

impl VideoProperties {
    /// Frame dimensions as `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Audio stream properties announced by the player during the handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioProperties {
    pub decoder: String,
    pub channels: u32,
    pub sample_rate: u32,
    pub bits_per_sample: u32,
}

/// Playback speed levels understood by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedLevel {
    Slow,
    Normal,
    Fast,
    VFast,
}

impl SpeedLevel {
    /// All levels, slowest first
    pub const ALL: [SpeedLevel; 4] = [Self::Slow, Self::Normal, Self::Fast, Self::VFast];

    /// Signed numeric level (-1, 0, 1, 2)
    pub fn value(self) -> i32 {
        match self {
            Self::Slow => -1,
            Self::Normal => 0,
            Self::Fast => 1,
            Self::VFast => 2,
        }
    }

    /// Level one step faster, or `None` at the top
    pub fn faster(self) -> Option<Self> {
        Self::try_from(self.value() + 1).ok()
    }

    /// Level one step slower, or `None` at the bottom
    pub fn slower(self) -> Option<Self> {
        Self::try_from(self.value() - 1).ok()
    }
}

impl Default for SpeedLevel {
    fn default() -> Self {
        Self::Normal
    }
}

impl TryFrom<i32> for SpeedLevel {
    type Error = PlayerError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Slow),
            0 => Ok(Self::Normal),
            1 => Ok(Self::Fast),
            2 => Ok(Self::VFast),
            other => Err(PlayerError::InvalidSpeed {
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for SpeedLevel {
    type Err = PlayerError;

    /// Accepts the numeric level or its name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<i32>() {
            return Self::try_from(value);
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            "vfast" | "very-fast" => Ok(Self::VFast),
            _ => Err(PlayerError::InvalidSpeed {
                value: trimmed.to_string(),
            }),
        }
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
            Self::VFast => "vfast",
        };
        write!(f, "{}", name)
    }
}

/// Facade lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Fields owned by the facade thread.
///
/// Position lives in the watcher's shared state; it is never written from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub paused: bool,
    pub subtitles_visible: bool,
    pub volume_db: f64,
    pub speed: SpeedLevel,
}

impl PlaybackState {
    /// State of a freshly launched player, before any startup commands
    pub fn initial() -> Self {
        Self {
            paused: false,
            subtitles_visible: true,
            volume_db: 0.0,
            speed: SpeedLevel::Normal,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Why the position watcher stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchExit {
    /// Player printed its farewell banner
    Farewell,
    /// Output stream closed without a farewell
    EndOfStream,
    /// Session was stopped by the facade
    Cancelled,
}

/// Serializable view of a player at one instant
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    #[serde(flatten)]
    pub state: PlaybackState,
    pub position_seconds: f64,
    pub video: VideoProperties,
    pub audio: AudioProperties,
    pub exit: Option<WatchExit>,
}
