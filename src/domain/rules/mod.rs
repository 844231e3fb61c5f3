// Domain rules - step-counted volume and speed changes

use serde::{Deserialize, Serialize};

use crate::domain::command::ControlCommand;
use crate::domain::model::SpeedLevel;
use crate::error::PlayerError;


/// Volume change applied by one `VolumeUp`/`VolumeDown` keystroke, in dB
pub const VOLUME_STEP_DB: f64 = 0.5;

/// Quietest volume a target may ask for, in dB
pub const MIN_VOLUME_DB: f64 = -60.0;

/// Loudest volume a target may ask for, in dB
pub const MAX_VOLUME_DB: f64 = 60.0;

/// Whether `target_db` is a finite value inside the accepted volume range
pub fn volume_in_range(target_db: f64) -> bool {
    target_db.is_finite() && (MIN_VOLUME_DB..=MAX_VOLUME_DB).contains(&target_db)
}

/// How many keystrokes a step-counted change sends for N requested steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPolicy {
    /// N steps send N keystrokes
    #[default]
    Exact,
    /// N steps send N-1 keystrokes, as older wrappers did
    Legacy,
}

impl StepPolicy {
    /// Number of keystrokes actually sent for `steps` requested steps
    pub fn keystrokes(self, steps: u32) -> u32 {
        match self {
            Self::Exact => steps,
            Self::Legacy => steps.saturating_sub(1),
        }
    }
}

impl std::str::FromStr for StepPolicy {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "legacy" => Ok(Self::Legacy),
            other => Err(PlayerError::config(format!("unknown step policy: {}", other))),
        }
    }
}

/// A planned step-counted change: which key and how many times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub command: ControlCommand,
    pub count: u32,
}

impl StepPlan {
    fn from_delta(delta: i64, up: ControlCommand, down: ControlCommand, policy: StepPolicy) -> Option<Self> {
        if delta == 0 {
            return None;
        }

        let command = if delta > 0 { up } else { down };
        let steps = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
        Some(Self {
            command,
            count: policy.keystrokes(steps),
        })
    }
}

/// Signed number of volume steps between two levels, rounded to the nearest step
pub fn volume_steps(current_db: f64, target_db: f64) -> i64 {
    ((target_db - current_db) / VOLUME_STEP_DB).round() as i64
}

/// Keystrokes needed to move the volume from `current_db` to `target_db`
pub fn plan_volume(current_db: f64, target_db: f64, policy: StepPolicy) -> Option<StepPlan> {
    StepPlan::from_delta(
        volume_steps(current_db, target_db),
        ControlCommand::VolumeUp,
        ControlCommand::VolumeDown,
        policy,
    )
}

/// Keystrokes needed to move from one speed level to another
pub fn plan_speed(current: SpeedLevel, target: SpeedLevel, policy: StepPolicy) -> Option<StepPlan> {
    StepPlan::from_delta(
        i64::from(target.value() - current.value()),
        ControlCommand::SpeedUp,
        ControlCommand::SpeedDown,
        policy,
    )
}
