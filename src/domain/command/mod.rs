// Command encoder - keystroke vocabulary of the player

use serde::{Deserialize, Serialize};

/// Control commands understood by the player, one byte each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlCommand {
    Pause,
    ToggleSubtitles,
    Quit,
    VolumeUp,
    VolumeDown,
    SpeedUp,
    SpeedDown,
}

impl ControlCommand {
    /// The control byte written to the player's terminal
    pub fn byte(self) -> u8 {
        match self {
            Self::Pause => b'p',
            Self::ToggleSubtitles => b's',
            Self::Quit => b'q',
            Self::VolumeUp => b'+',
            Self::VolumeDown => b'-',
            Self::SpeedUp => b'2',
            Self::SpeedDown => b'1',
        }
    }

    pub const ALL: [ControlCommand; 7] = [
        Self::Pause,
        Self::ToggleSubtitles,
        Self::Quit,
        Self::VolumeUp,
        Self::VolumeDown,
        Self::SpeedUp,
        Self::SpeedDown,
    ];
}
