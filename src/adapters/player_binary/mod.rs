//! Player executable detection and capability probing.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use tracing::debug;

use crate::error::{PlayerError, PlayerResult};

/// Name of the player executable on PATH
pub const PLAYER_NAME: &str = "omxplayer";

/// Install location on Raspberry Pi OS
pub const DEFAULT_PLAYER_PATH: &str = "/usr/bin/omxplayer";

/// Find the player executable in common locations.
pub fn find_player() -> Option<PathBuf> {
    let default = PathBuf::from(DEFAULT_PLAYER_PATH);
    if default.exists() {
        return Some(default);
    }

    if let Ok(path) = which::which(PLAYER_NAME) {
        return Some(path);
    }

    let common_paths = ["/usr/local/bin/omxplayer", "/opt/vc/bin/omxplayer"];
    common_paths
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Resolve the configured program.
///
/// Only the default install path falls back to detection. Any other path
/// or name must exist as given or be found on PATH.
pub fn resolve_player(program: &Path) -> PlayerResult<PathBuf> {
    let not_found = || PlayerError::PlayerNotFound {
        program: program.display().to_string(),
    };

    if program == Path::new(DEFAULT_PLAYER_PATH) {
        debug!("No player configured, searching");
        return find_player().ok_or_else(not_found);
    }
    if program.exists() {
        return Ok(program.to_path_buf());
    }
    which::which(program).map_err(|_| not_found())
}

/// Whether `usage` lists `flag` as a standalone token
pub fn usage_lists_flag(usage: &str, flag: &str) -> bool {
    let flag = flag.trim();
    if flag.is_empty() {
        return false;
    }
    let pattern = format!(r"(?m)(^|\s){}(\s|,|$)", regex::escape(flag));
    Regex::new(&pattern)
        .map(|re| re.is_match(usage))
        .unwrap_or(false)
}

/// Run the player without arguments and look for `flag` in its usage text
pub fn probe_flag(program: &Path, flag: &str) -> PlayerResult<bool> {
    let output = Command::new(program)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| PlayerError::SpawnFailed {
            program: program.display().to_string(),
            source,
        })?;

    let mut usage = String::from_utf8_lossy(&output.stdout).into_owned();
    usage.push('\n');
    usage.push_str(&String::from_utf8_lossy(&output.stderr));

    let supported = usage_lists_flag(&usage, flag);
    debug!(program = %program.display(), flag, supported, "Probed player flag");
    Ok(supported)
}
