//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::parser::ClockUnit;

/// Arguments for the play command
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Playable resource locator (file path or URL), passed to the player untouched
    pub resource: String,

    /// Start paused
    #[arg(long)]
    pub paused: bool,

    /// Keep the player's subtitles visible
    #[arg(long)]
    pub show_subtitles: bool,

    /// Do not ask the player to adjust the display refresh rate
    #[arg(long)]
    pub no_refresh: bool,

    /// Player executable
    #[arg(long)]
    pub program: Option<PathBuf>,

    /// Give up if the codec headers have not appeared after this long
    #[arg(long)]
    pub handshake_timeout_ms: Option<u64>,

    /// Print status as JSON events instead of text
    #[arg(long)]
    pub json: bool,

    /// Interval between status reports
    #[arg(long, default_value_t = 1000)]
    pub status_interval_ms: u64,

    /// Extra arguments for the player, after `--`
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

/// Arguments for the parse command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Captured player output (default: stdin)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Scale of the heartbeat clock (microseconds or milliseconds)
    #[arg(long)]
    pub unit: Option<ClockUnit>,

    /// Token that starts a heartbeat line
    #[arg(long)]
    pub marker: Option<String>,
}

/// Arguments for the probe-flag command
#[derive(Args, Debug)]
pub struct ProbeFlagArgs {
    /// Flag to look for in the player's usage text, e.g. -r
    #[arg(allow_hyphen_values = true)]
    pub flag: String,

    /// Player executable
    #[arg(long)]
    pub program: Option<PathBuf>,
}
