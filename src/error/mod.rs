//! Error handling module for omxctl

use thiserror::Error;

use crate::domain::command::ControlCommand;

/// Main error type for player supervision
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Child exited, closed its output or timed out before both property blocks were seen
    #[error("Handshake incomplete: {reason}")]
    HandshakeIncomplete { reason: String },

    /// A control byte could not be delivered to the child
    #[error("Failed to deliver {command:?} command to the player")]
    WriteFailed { command: ControlCommand },

    /// Requested speed is not one of the four supported levels
    #[error("Invalid speed: {value}. Expected one of -1 (slow), 0 (normal), 1 (fast), 2 (very fast)")]
    InvalidSpeed { value: String },

    /// Requested volume is not a finite number
    #[error("Invalid volume: {value} dB")]
    InvalidVolume { value: f64 },

    /// Capability that the keystroke protocol does not expose
    #[error("Not supported by the player protocol: {capability}")]
    NotSupported { capability: &'static str },

    /// Operation attempted after stop()
    #[error("Playback session is closed")]
    SessionClosed,

    /// Player binary could not be located
    #[error("Player executable not found: {program}")]
    PlayerNotFound { program: String },

    /// Player binary could not be started
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Pseudo-terminal or signal error
    #[error("Terminal error: {0}")]
    Pty(#[from] nix::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    pub(crate) fn handshake(reason: impl Into<String>) -> Self {
        Self::HandshakeIncomplete {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for player operations
pub type PlayerResult<T> = std::result::Result<T, PlayerError>;
