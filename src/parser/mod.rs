//! Output parser for the player's terminal output
//!
//! The player writes free-form diagnostics to its terminal. A handful of
//! lines carry structure: the codec headers printed at startup, the status
//! heartbeat carrying the media clock, and the farewell banner printed on a
//! clean exit. Everything else is noise and yields no match.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::model::{AudioProperties, VideoProperties};
use crate::error::{PlayerError, PlayerResult};

pub mod splitter;

pub use splitter::LineSplitter;

static VIDEO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Video codec ([\w-]+) width (\d+) height (\d+) profile (-?\d+) fps (\d+(?:\.\d*)?)",
    )
    .expect("video header pattern")
});

static AUDIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Audio codec ([\w-]+) channels (\d+) samplerate (\d+) bitspersample (\d+)")
        .expect("audio header pattern")
});

/// Banner printed by the player right before a clean exit
pub const FAREWELL_BANNER: &str = "have a nice day";

/// Marker that prefixes the media clock in status lines
pub const DEFAULT_POSITION_MARKER: &str = "M:";

/// Scale of the number following the position marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockUnit {
    #[default]
    Microseconds,
    Milliseconds,
}

impl ClockUnit {
    /// Ticks per second
    pub fn divisor(self) -> f64 {
        match self {
            Self::Microseconds => 1_000_000.0,
            Self::Milliseconds => 1_000.0,
        }
    }
}

impl std::str::FromStr for ClockUnit {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "usec" | "micros" | "microseconds" => Ok(Self::Microseconds),
            "ms" | "msec" | "millis" | "milliseconds" => Ok(Self::Milliseconds),
            other => Err(PlayerError::config(format!("unknown clock unit: {}", other))),
        }
    }
}

/// Heartbeat format emitted by a given player version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionFormat {
    /// Token at the start of a heartbeat line
    pub marker: String,
    pub unit: ClockUnit,
}

impl PositionFormat {
    pub fn new(marker: impl Into<String>, unit: ClockUnit) -> Self {
        Self {
            marker: marker.into(),
            unit,
        }
    }

    /// `M:` followed by microseconds
    pub fn microseconds() -> Self {
        Self::new(DEFAULT_POSITION_MARKER, ClockUnit::Microseconds)
    }

    /// `M:` followed by milliseconds
    pub fn milliseconds() -> Self {
        Self::new(DEFAULT_POSITION_MARKER, ClockUnit::Milliseconds)
    }
}

impl Default for PositionFormat {
    fn default() -> Self {
        Self::microseconds()
    }
}

/// One structured record recovered from a line of output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRecord {
    Video(VideoProperties),
    Audio(AudioProperties),
    Position { seconds: f64 },
    Farewell,
}

/// Match a video codec header line
pub fn parse_video(line: &str) -> Option<VideoProperties> {
    let caps = VIDEO_RE.captures(line)?;
    let fps: f64 = caps[5].parse().ok()?;
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }

    Some(VideoProperties {
        decoder: caps[1].to_string(),
        width: caps[2].parse().ok()?,
        height: caps[3].parse().ok()?,
        profile: caps[4].parse().ok()?,
        fps,
    })
}

/// Match an audio codec header line
pub fn parse_audio(line: &str) -> Option<AudioProperties> {
    let caps = AUDIO_RE.captures(line)?;
    Some(AudioProperties {
        decoder: caps[1].to_string(),
        channels: caps[2].parse().ok()?,
        sample_rate: caps[3].parse().ok()?,
        bits_per_sample: caps[4].parse().ok()?,
    })
}

/// Match the farewell banner
pub fn is_farewell(line: &str) -> bool {
    line.contains(FAREWELL_BANNER)
}

/// Compiled matchers for one player flavour
#[derive(Debug, Clone)]
pub struct OutputParser {
    format: PositionFormat,
    position_re: Regex,
}

impl OutputParser {
    /// Build a parser for the given heartbeat format
    pub fn new(format: PositionFormat) -> PlayerResult<Self> {
        if format.marker.trim().is_empty() {
            return Err(PlayerError::config("position marker must not be empty"));
        }

        let pattern = format!(r"^\s*{}\s*(\d+(?:\.\d*)?)", regex::escape(format.marker.trim()));
        let position_re = Regex::new(&pattern)
            .map_err(|e| PlayerError::config(format!("bad position marker: {}", e)))?;

        Ok(Self {
            format,
            position_re,
        })
    }

    pub fn format(&self) -> &PositionFormat {
        &self.format
    }

    /// Match a heartbeat line and convert its clock to seconds
    pub fn parse_position(&self, line: &str) -> Option<f64> {
        let caps = self.position_re.captures(line)?;
        let ticks: f64 = caps[1].parse().ok()?;
        Some(ticks / self.format.unit.divisor())
    }

    /// Classify a line; `None` is the common case
    pub fn parse_line(&self, line: &str) -> Option<OutputRecord> {
        if let Some(seconds) = self.parse_position(line) {
            return Some(OutputRecord::Position { seconds });
        }
        if is_farewell(line) {
            return Some(OutputRecord::Farewell);
        }
        if let Some(video) = parse_video(line) {
            return Some(OutputRecord::Video(video));
        }
        parse_audio(line).map(OutputRecord::Audio)
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        // The default marker is a fixed literal, so compilation cannot fail
        Self::new(PositionFormat::default()).expect("default position format")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_LINE: &str =
        "Video codec omx-h264 width 1280 height 720 profile 100 fps 25.000000";
    const AUDIO_LINE: &str = "Audio codec aac channels 2 samplerate 44100 bitspersample 16";

    #[test]
    fn test_parse_video_header() {
        let video = parse_video(VIDEO_LINE).unwrap();
        assert_eq!(video.decoder, "omx-h264");
        assert_eq!(video.dimensions(), (1280, 720));
        assert_eq!(video.profile, 100);
        assert_eq!(video.fps, 25.0);
    }

    #[test]
    fn test_parse_video_embedded_in_noise() {
        let line = format!("[omx] {} extra", VIDEO_LINE);
        assert!(parse_video(&line).is_some());
    }

    #[test]
    fn test_parse_video_rejects_zero_fps() {
        let line = "Video codec omx-h264 width 1280 height 720 profile 100 fps 0.000000";
        assert_eq!(parse_video(line), None);
    }

    #[test]
    fn test_parse_video_rejects_truncated_line() {
        assert_eq!(parse_video("Video codec omx-h264 width 1280 height"), None);
    }

    #[test]
    fn test_parse_audio_header() {
        let audio = parse_audio(AUDIO_LINE).unwrap();
        assert_eq!(audio.decoder, "aac");
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.bits_per_sample, 16);
    }

    #[test]
    fn test_parse_audio_overflowing_number_is_no_match() {
        let line = "Audio codec aac channels 99999999999 samplerate 44100 bitspersample 16";
        assert_eq!(parse_audio(line), None);
    }

    #[test]
    fn test_position_microseconds() {
        let parser = OutputParser::default();
        assert_eq!(parser.parse_position("M: 2500000 V: 2483000 "), Some(2.5));
        assert_eq!(parser.parse_position("M:2500000"), Some(2.5));
    }

    #[test]
    fn test_position_milliseconds() {
        let parser = OutputParser::new(PositionFormat::milliseconds()).unwrap();
        assert_eq!(parser.parse_position("M: 2500"), Some(2.5));
    }

    #[test]
    fn test_position_custom_marker_is_escaped() {
        let parser = OutputParser::new(PositionFormat::new("V :", ClockUnit::Microseconds)).unwrap();
        assert_eq!(parser.parse_position("V : 1000000"), Some(1.0));
        assert_eq!(parser.parse_position("M: 1000000"), None);
    }

    #[test]
    fn test_position_must_lead_the_line() {
        let parser = OutputParser::default();
        assert_eq!(parser.parse_position("seek to M: 100"), None);
        assert_eq!(parser.parse_position("M: abc"), None);
    }

    #[test]
    fn test_empty_marker_rejected() {
        assert!(OutputParser::new(PositionFormat::new("  ", ClockUnit::Milliseconds)).is_err());
    }

    #[test]
    fn test_farewell() {
        assert!(is_farewell("have a nice day ;)"));
        assert!(!is_farewell("have a nice"));
    }

    #[test]
    fn test_parse_line_noise() {
        let parser = OutputParser::default();
        for noise in ["", "   ", "file : movie.mp4 result 0 format mov,mp4", "Subtitle count: 0"] {
            assert_eq!(parser.parse_line(noise), None);
        }
    }

    #[test]
    fn test_clock_unit_parse() {
        assert_eq!("ms".parse::<ClockUnit>().unwrap(), ClockUnit::Milliseconds);
        assert_eq!("Microseconds".parse::<ClockUnit>().unwrap(), ClockUnit::Microseconds);
        assert!("ns".parse::<ClockUnit>().is_err());
    }
}
