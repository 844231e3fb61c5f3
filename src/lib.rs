//! omxctl - omxplayer supervision library
//!
//! Spawns the player on a pseudo-terminal, drives it with single-byte
//! keystrokes and recovers playback state from its text output.
//!
//! ```no_run
//! use omxctl::{LaunchOptions, Player, PlayerOptions};
//!
//! # fn main() -> omxctl::PlayerResult<()> {
//! let launch = LaunchOptions::new("/usr/bin/omxplayer");
//! let mut player = Player::launch(&launch, &PlayerOptions::default(), "movie.mp4", &[])?;
//! player.set_volume(-3.0)?;
//! println!("at {:.1}s", player.position_seconds());
//! player.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod parser;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use adapters::{LaunchOptions, PlaybackSession, PlayerConfig};
pub use app::{Player, PlayerOptions};
pub use domain::command::ControlCommand;
pub use domain::model::{
    AudioProperties, PlaybackState, PlayerSnapshot, PlayerStatus, SpeedLevel, VideoProperties,
    WatchExit,
};
pub use domain::rules::StepPolicy;
pub use error::{PlayerError, PlayerResult};
pub use parser::{ClockUnit, OutputParser, OutputRecord, PositionFormat};
