// Tracing log adapter - Structured logging using tracing crate

use tracing_subscriber::EnvFilter;

use crate::error::{PlayerError, PlayerResult};

/// Log levels accepted by `--log-level` and the `log_level` setting
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Check a configured level name
pub fn validate_level(level: &str) -> PlayerResult<()> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(PlayerError::config(format!(
            "unknown log level '{}', expected one of {}",
            level,
            LOG_LEVELS.join(", ")
        )))
    }
}

/// Build the filter for `level`; `RUST_LOG` wins when it is set
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber, writing to stderr so stdout stays usable for
/// JSON output. Later calls are ignored.
pub fn init_logging(level: &str, json: bool) -> PlayerResult<()> {
    validate_level(level)?;
    let filter = build_filter(level);

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialised");
    }
    Ok(())
}
