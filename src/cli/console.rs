//! Interactive console driving a running player from stdin

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::app::Player;
use crate::domain::model::{PlayerSnapshot, SpeedLevel};
use crate::error::{PlayerError, PlayerResult};
use crate::utils::{format_position, format_volume};

/// One line typed at the console
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Pause,
    Play,
    TogglePause,
    ToggleSubtitles,
    VolumeUp,
    VolumeDown,
    Volume(f64),
    SpeedUp,
    SpeedDown,
    Speed(SpeedLevel),
    Status,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line; `Ok(None)` for an empty line
    pub fn parse(line: &str) -> Result<Option<Self>> {
        // A bare space toggles, like the player's own space bar
        if !line.is_empty() && line.trim().is_empty() {
            return Ok(Some(Self::TogglePause));
        }

        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();

        let command = match (word.to_ascii_lowercase().as_str(), argument) {
            ("p" | "pause", None) => Self::Pause,
            ("play" | "resume", None) => Self::Play,
            ("space" | "toggle", None) => Self::TogglePause,
            ("s" | "subs" | "subtitles", None) => Self::ToggleSubtitles,
            ("+", None) => Self::VolumeUp,
            ("-", None) => Self::VolumeDown,
            ("vol" | "volume", Some(value)) => {
                let db: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid volume: {}", value))?;
                Self::Volume(db)
            }
            (">", None) => Self::SpeedUp,
            ("<", None) => Self::SpeedDown,
            ("speed", Some(value)) => Self::Speed(value.parse()?),
            ("status", None) => Self::Status,
            ("q" | "quit" | "stop" | "exit", None) => Self::Quit,
            ("vol" | "volume" | "speed", None) => bail!("'{}' needs a value", word),
            _ => return Err(anyhow!("Unknown command: {}", line.trim())),
        };

        if words.next().is_some() {
            bail!("Too many arguments: {}", line.trim());
        }
        Ok(Some(command))
    }
}

/// How the console reports
#[derive(Debug, Clone, Copy)]
pub struct ConsoleOptions {
    pub json: bool,
    pub status_interval: Duration,
}

/// Apply one command to the player
pub fn apply(player: &mut Player, command: &ConsoleCommand) -> PlayerResult<()> {
    match command {
        ConsoleCommand::Pause => player.pause(),
        ConsoleCommand::Play => player.play(),
        ConsoleCommand::TogglePause => player.toggle_pause(),
        ConsoleCommand::ToggleSubtitles => player.toggle_subtitles(),
        ConsoleCommand::VolumeUp => player.volume_up(),
        ConsoleCommand::VolumeDown => player.volume_down(),
        ConsoleCommand::Volume(db) => player.set_volume(*db),
        ConsoleCommand::SpeedUp => player.speed_up(),
        ConsoleCommand::SpeedDown => player.speed_down(),
        ConsoleCommand::Speed(level) => player.set_speed(*level),
        ConsoleCommand::Status | ConsoleCommand::Quit => Ok(()),
    }
}

/// Run until the user quits or the player ends on its own, then stop the player
pub async fn run(mut player: Player, options: ConsoleOptions) -> Result<PlayerSnapshot> {
    let shared = player.shared();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(options.status_interval);
    let mut stdin_open = true;

    report(&player.snapshot(), options.json, "started");

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read console input")? else {
                    // Keep playing without a console
                    stdin_open = false;
                    continue;
                };

                let command = match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                if command == ConsoleCommand::Quit {
                    info!("Quit requested from console");
                    break;
                }

                match apply(&mut player, &command) {
                    Ok(()) => report(&player.snapshot(), options.json, "status"),
                    Err(PlayerError::SessionClosed) => break,
                    Err(e) => {
                        warn!(?command, error = %e, "Command failed");
                        eprintln!("{}", e);
                    }
                }
            }
            _ = ticker.tick() => {
                if !shared.is_active() {
                    info!(exit = ?shared.exit_reason(), "Player finished");
                    break;
                }
                report(&player.snapshot(), options.json, "status");
            }
        }
    }

    // Stopping can wait out the quit grace period
    let snapshot = tokio::task::spawn_blocking(move || -> PlayerResult<PlayerSnapshot> {
        player.stop()?;
        Ok(player.snapshot())
    })
    .await
    .context("Stop task failed")?
    .context("Failed to stop player")?;

    report(&snapshot, options.json, "stopped");
    Ok(snapshot)
}

fn report(snapshot: &PlayerSnapshot, as_json: bool, event: &str) {
    if as_json {
        let line = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "player": snapshot,
        });
        println!("{}", line);
    } else {
        println!("{}", status_line(snapshot));
    }
}

/// Single-line human summary of a snapshot
pub fn status_line(snapshot: &PlayerSnapshot) -> String {
    format!(
        "[{}] {} | vol {} | speed {} | subs {}",
        format_position(snapshot.position_seconds),
        snapshot.status,
        format_volume(snapshot.state.volume_db),
        snapshot.state.speed,
        if snapshot.state.subtitles_visible { "on" } else { "off" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        AudioProperties, PlaybackState, PlayerStatus, VideoProperties,
    };

    fn parse(line: &str) -> ConsoleCommand {
        ConsoleCommand::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_keystroke_aliases() {
        assert_eq!(parse("p"), ConsoleCommand::Pause);
        assert_eq!(parse("PAUSE"), ConsoleCommand::Pause);
        assert_eq!(parse("play"), ConsoleCommand::Play);
        assert_eq!(parse(" "), ConsoleCommand::TogglePause);
        assert_eq!(parse("toggle"), ConsoleCommand::TogglePause);
        assert_eq!(parse("s"), ConsoleCommand::ToggleSubtitles);
        assert_eq!(parse("+"), ConsoleCommand::VolumeUp);
        assert_eq!(parse("-"), ConsoleCommand::VolumeDown);
        assert_eq!(parse(">"), ConsoleCommand::SpeedUp);
        assert_eq!(parse("<"), ConsoleCommand::SpeedDown);
        assert_eq!(parse("q"), ConsoleCommand::Quit);
        assert_eq!(parse("  stop  "), ConsoleCommand::Quit);
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse("vol -4.5"), ConsoleCommand::Volume(-4.5));
        assert_eq!(parse("speed 2"), ConsoleCommand::Speed(SpeedLevel::VFast));
        assert_eq!(parse("speed slow"), ConsoleCommand::Speed(SpeedLevel::Slow));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleCommand::parse("speed 7").is_err());
        assert!(ConsoleCommand::parse("vol loud").is_err());
        assert!(ConsoleCommand::parse("vol").is_err());
        assert!(ConsoleCommand::parse("rewind").is_err());
        assert!(ConsoleCommand::parse("pause now").is_err());
    }

    #[test]
    fn test_empty_line_is_nothing() {
        assert_eq!(ConsoleCommand::parse("").unwrap(), None);
    }

    #[test]
    fn test_status_line() {
        let snapshot = PlayerSnapshot {
            status: PlayerStatus::Paused,
            state: PlaybackState {
                paused: true,
                subtitles_visible: false,
                volume_db: -1.5,
                speed: SpeedLevel::Fast,
            },
            position_seconds: 62.25,
            video: VideoProperties {
                decoder: "omx-h264".to_string(),
                width: 1280,
                height: 720,
                profile: 100,
                fps: 25.0,
            },
            audio: AudioProperties {
                decoder: "aac".to_string(),
                channels: 2,
                sample_rate: 44100,
                bits_per_sample: 16,
            },
            exit: None,
        };

        assert_eq!(
            status_line(&snapshot),
            "[00:01:02.250] paused | vol -1.5 dB | speed fast | subs off"
        );
    }
}
