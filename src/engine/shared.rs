//! Fields written by the position watcher and read from any thread

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::domain::model::WatchExit;

/// Watcher-owned playback fields.
///
/// `position` has a single writer (the watcher) and is stored as raw `f64`
/// bits so readers never take a lock.
#[derive(Debug)]
pub struct SharedPlayback {
    position_bits: AtomicU64,
    active: AtomicBool,
    exit: Mutex<Option<WatchExit>>,
}

impl SharedPlayback {
    pub fn new() -> Self {
        Self {
            position_bits: AtomicU64::new(0f64.to_bits()),
            active: AtomicBool::new(true),
            exit: Mutex::new(None),
        }
    }

    pub fn position_seconds(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Acquire))
    }

    pub(crate) fn set_position(&self, seconds: f64) {
        self.position_bits.store(seconds.to_bits(), Ordering::Release);
    }

    /// False once the watcher has stopped for any reason
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn exit_reason(&self) -> Option<WatchExit> {
        *self.exit.lock()
    }

    pub(crate) fn finish(&self, reason: WatchExit) {
        let mut exit = self.exit.lock();
        if exit.is_none() {
            *exit = Some(reason);
        }
        self.active.store(false, Ordering::Release);
    }
}

impl Default for SharedPlayback {
    fn default() -> Self {
        Self::new()
    }
}
