//! CLI module for omxctl
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;
pub mod console;

/// omxctl - drive omxplayer from the terminal
///
/// Launches the player on a pseudo-terminal, sends it control keystrokes and
/// reports the playback state recovered from its output.
#[derive(Parser, Debug)]
#[command(name = "omxctl")]
#[command(about = "Supervise and control an omxplayer process")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (default: ./omxctl.toml, then $XDG_CONFIG_HOME/omxctl/config.toml)
    #[arg(long, global = true, env = "OMXCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a resource and control it interactively from stdin
    Play(args::PlayArgs),
    /// Extract structured records from captured player output
    Parse(args::ParseArgs),
    /// Check whether the player binary accepts a flag
    ProbeFlag(args::ProbeFlagArgs),
}
