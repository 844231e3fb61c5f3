//! Background task tracking the player's media clock

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info, trace, warn};

use crate::domain::model::WatchExit;
use crate::engine::shared::SharedPlayback;
use crate::error::PlayerResult;
use crate::parser::{OutputParser, OutputRecord};

/// Watcher pacing
#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    /// Longest single wait for output before looping again
    pub read_timeout: Duration,
    /// Pause after each burst of output; zero disables throttling
    pub throttle: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(1),
            throttle: Duration::from_millis(100),
        }
    }
}

enum Step {
    Line(String),
    Idle,
    Exit(WatchExit),
}

/// Handle to the running watcher thread.
///
/// Dropping the shutdown sender is the cancellation signal; the thread also
/// ends on its own when the player says goodbye or its output closes.
pub struct PositionWatcher {
    shared: Arc<SharedPlayback>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PositionWatcher {
    /// Start watching `lines` on a dedicated thread
    pub fn spawn(
        lines: Receiver<String>,
        parser: OutputParser,
        config: WatcherConfig,
    ) -> PlayerResult<Self> {
        let shared = Arc::new(SharedPlayback::new());
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("position-watcher".to_string())
            .spawn(move || {
                info!("Position watcher started");
                let exit = watch(&lines, &shutdown_rx, &parser, &thread_shared, config);
                thread_shared.finish(exit);
                info!(?exit, position = thread_shared.position_seconds(), "Position watcher stopped");
            })?;

        Ok(Self {
            shared,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn shared(&self) -> Arc<SharedPlayback> {
        Arc::clone(&self.shared)
    }

    /// Signal the thread and wait for it to finish. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Position watcher panicked");
            }
        }
        self.shared.finish(WatchExit::Cancelled);
    }
}

impl Drop for PositionWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch(
    lines: &Receiver<String>,
    shutdown: &Receiver<()>,
    parser: &OutputParser,
    shared: &SharedPlayback,
    config: WatcherConfig,
) -> WatchExit {
    loop {
        let step = select! {
            recv(shutdown) -> _ => Step::Exit(WatchExit::Cancelled),
            recv(lines) -> msg => match msg {
                Ok(line) => Step::Line(line),
                Err(_) => Step::Exit(WatchExit::EndOfStream),
            },
            default(config.read_timeout) => Step::Idle,
        };

        match step {
            Step::Exit(exit) => return exit,
            Step::Idle => continue,
            Step::Line(line) => {
                if let Some(exit) = apply(parser, shared, &line) {
                    return exit;
                }
            }
        }

        // Drain the backlog so throttling delays updates without falling behind
        loop {
            match lines.try_recv() {
                Ok(line) => {
                    if let Some(exit) = apply(parser, shared, &line) {
                        return exit;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return WatchExit::EndOfStream,
            }
        }

        if !config.throttle.is_zero() {
            match shutdown.recv_timeout(config.throttle) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => return WatchExit::Cancelled,
            }
        }
    }
}

fn apply(parser: &OutputParser, shared: &SharedPlayback, line: &str) -> Option<WatchExit> {
    match parser.parse_line(line) {
        Some(OutputRecord::Position { seconds }) => {
            trace!(seconds, "Position update");
            shared.set_position(seconds);
            None
        }
        Some(OutputRecord::Farewell) => {
            debug!("Farewell banner seen");
            Some(WatchExit::Farewell)
        }
        Some(OutputRecord::Video(_)) | Some(OutputRecord::Audio(_)) => {
            debug!(%line, "Stream header after handshake, ignored");
            None
        }
        None => {
            trace!(%line, "Player output");
            None
        }
    }
}
