// Adapters - External system implementations

pub mod player_binary;
pub mod pty_process;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use player_binary::{find_player, probe_flag, resolve_player};
pub use pty_process::{LaunchOptions, PlaybackSession};
pub use toml_config::PlayerConfig;
pub use tracing_log::init_logging;
