//! Position watching engine
//!
//! The watcher runs next to the caller's thread for the lifetime of a
//! session: it is the only writer of the playback position.

pub mod shared;
pub mod watcher;

pub use shared::SharedPlayback;
pub use watcher::{PositionWatcher, WatcherConfig};
