//! Time formatting utilities

/// Format a playback position as `HH:MM:SS.mmm`.
///
/// Negative and non-finite positions render as zero.
pub fn format_position(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Format a volume as a signed dB value, e.g. `+1.5 dB`
pub fn format_volume(volume_db: f64) -> String {
    format!("{:+.1} dB", volume_db)
}
