// Player facade - user-facing control of one playback session

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::pty_process::{LaunchOptions, PlaybackSession};
use crate::domain::command::ControlCommand;
use crate::domain::model::*;
use crate::domain::rules::{
    plan_speed, plan_volume, volume_in_range, volume_steps, StepPlan, StepPolicy, VOLUME_STEP_DB,
};
use crate::engine::{PositionWatcher, SharedPlayback, WatcherConfig};
use crate::error::{PlayerError, PlayerResult};
use crate::parser::OutputParser;
use crate::ports::PlayerControl;

/// Per-session behaviour chosen at construction
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    /// Start in `Playing`; otherwise the player is paused right after the handshake
    pub start_playing: bool,
    /// Leave the player's subtitles on; otherwise they are toggled off at startup
    pub show_subtitles: bool,
    pub step_policy: StepPolicy,
    pub watcher: WatcherConfig,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            start_playing: true,
            show_subtitles: false,
            step_policy: StepPolicy::Exact,
            watcher: WatcherConfig::default(),
        }
    }
}

/// Controller for one playback session.
///
/// Write operations are synchronous keystrokes plus local bookkeeping; the
/// position is maintained by a background watcher and can be read from any
/// thread through [`Player::shared`].
pub struct Player<C: PlayerControl = PlaybackSession> {
    control: C,
    watcher: PositionWatcher,
    shared: Arc<SharedPlayback>,
    state: PlaybackState,
    video: VideoProperties,
    audio: AudioProperties,
    step_policy: StepPolicy,
    stopped: bool,
}

impl Player<PlaybackSession> {
    /// Launch the player for `resource`, complete the handshake and start watching
    pub fn launch(
        launch: &LaunchOptions,
        options: &PlayerOptions,
        resource: &str,
        extra_args: &[String],
    ) -> PlayerResult<Self> {
        let parser = OutputParser::new(launch.position.clone())?;
        let mut session = PlaybackSession::launch(launch, resource, extra_args)?;
        let lines = session
            .take_output()
            .ok_or_else(|| PlayerError::handshake("player output already claimed"))?;

        let watcher = PositionWatcher::spawn(lines, parser, options.watcher)?;
        let video = session.video().clone();
        let audio = session.audio().clone();

        info!(resource, pid = session.pid(), "Playback session ready");
        Ok(Self::with_control(session, watcher, video, audio, options))
    }
}

impl<C: PlayerControl> Player<C> {
    /// Assemble a facade over an already handshaken control channel
    pub fn with_control(
        control: C,
        watcher: PositionWatcher,
        video: VideoProperties,
        audio: AudioProperties,
        options: &PlayerOptions,
    ) -> Self {
        let shared = watcher.shared();
        let mut player = Self {
            control,
            watcher,
            shared,
            state: PlaybackState::initial(),
            video,
            audio,
            step_policy: options.step_policy,
            stopped: false,
        };

        // Failures here leave the flags untouched; the session itself is usable
        if !options.show_subtitles {
            if let Err(e) = player.toggle_subtitles() {
                warn!(error = %e, "Could not hide subtitles at startup");
            }
        }
        if !options.start_playing {
            if let Err(e) = player.pause() {
                warn!(error = %e, "Could not pause at startup");
            }
        }
        player
    }

    // --- pause -----------------------------------------------------------

    /// Pause playback; no-op when already paused
    pub fn pause(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        if self.state.paused {
            return Ok(());
        }
        self.toggle_pause()
    }

    /// Resume playback; no-op when already playing
    pub fn play(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        if !self.state.paused {
            return Ok(());
        }
        self.toggle_pause()
    }

    /// Flip between playing and paused
    pub fn toggle_pause(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        self.require(ControlCommand::Pause)?;
        self.state.paused = !self.state.paused;
        debug!(paused = self.state.paused, "Pause toggled");
        Ok(())
    }

    pub fn toggle_subtitles(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        self.require(ControlCommand::ToggleSubtitles)?;
        self.state.subtitles_visible = !self.state.subtitles_visible;
        debug!(visible = self.state.subtitles_visible, "Subtitles toggled");
        Ok(())
    }

    // --- volume ----------------------------------------------------------

    /// Move the volume to `target_db`, snapped to the nearest whole step.
    ///
    /// Targets outside `MIN_VOLUME_DB..=MAX_VOLUME_DB` are rejected before
    /// any keystroke is sent.
    ///
    /// The recorded volume is updated even if a keystroke fails, since the
    /// player offers no readback; the failure is still reported.
    pub fn set_volume(&mut self, target_db: f64) -> PlayerResult<()> {
        self.ensure_open()?;
        if !volume_in_range(target_db) {
            return Err(PlayerError::InvalidVolume { value: target_db });
        }

        let current = self.state.volume_db;
        let steps = volume_steps(current, target_db);
        let delivered = match plan_volume(current, target_db, self.step_policy) {
            Some(plan) => self.run_plan(plan),
            None => Ok(()),
        };

        self.state.volume_db = current + steps as f64 * VOLUME_STEP_DB;
        debug!(volume_db = self.state.volume_db, steps, "Volume set");
        delivered
    }

    pub fn volume_up(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        self.require(ControlCommand::VolumeUp)?;
        self.state.volume_db += VOLUME_STEP_DB;
        Ok(())
    }

    pub fn volume_down(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        self.require(ControlCommand::VolumeDown)?;
        self.state.volume_db -= VOLUME_STEP_DB;
        Ok(())
    }

    // --- speed -----------------------------------------------------------

    /// Move to `target` by unit speed steps
    pub fn set_speed(&mut self, target: SpeedLevel) -> PlayerResult<()> {
        self.ensure_open()?;
        let delivered = match plan_speed(self.state.speed, target, self.step_policy) {
            Some(plan) => self.run_plan(plan),
            None => Ok(()),
        };
        self.state.speed = target;
        debug!(speed = %target, "Speed set");
        delivered
    }

    /// Numeric form of [`Player::set_speed`]; anything outside -1..=2 is
    /// rejected before a byte is written
    pub fn set_speed_value(&mut self, level: i32) -> PlayerResult<()> {
        self.ensure_open()?;
        let target = SpeedLevel::try_from(level)?;
        self.set_speed(target)
    }

    /// One step faster; no-op at the fastest level
    pub fn speed_up(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        let Some(next) = self.state.speed.faster() else {
            return Ok(());
        };
        self.require(ControlCommand::SpeedUp)?;
        self.state.speed = next;
        Ok(())
    }

    /// One step slower; no-op at the slowest level
    pub fn speed_down(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        let Some(next) = self.state.speed.slower() else {
            return Ok(());
        };
        self.require(ControlCommand::SpeedDown)?;
        self.state.speed = next;
        Ok(())
    }

    // --- lifecycle -------------------------------------------------------

    /// Quit the player and release the session. Idempotent.
    ///
    /// Returns only once the process is gone and the watcher has stopped.
    pub fn stop(&mut self) -> PlayerResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.control.terminate()?;
        self.watcher.stop();
        self.stopped = true;
        info!(position = self.position_seconds(), "Playback stopped");
        Ok(())
    }

    // --- capabilities the keystroke protocol lacks ------------------------

    pub fn set_subtitle_track(&mut self, _index: usize) -> PlayerResult<()> {
        self.ensure_open()?;
        Err(PlayerError::NotSupported {
            capability: "subtitle track selection",
        })
    }

    pub fn set_audio_channel(&mut self, _index: usize) -> PlayerResult<()> {
        self.ensure_open()?;
        Err(PlayerError::NotSupported {
            capability: "audio channel selection",
        })
    }

    pub fn set_chapter(&mut self, _index: usize) -> PlayerResult<()> {
        self.ensure_open()?;
        Err(PlayerError::NotSupported {
            capability: "chapter selection",
        })
    }

    pub fn seek(&mut self, _seconds: f64) -> PlayerResult<()> {
        self.ensure_open()?;
        Err(PlayerError::NotSupported { capability: "seeking" })
    }

    // --- accessors -------------------------------------------------------

    pub fn status(&self) -> PlayerStatus {
        if self.stopped || !self.shared.is_active() {
            PlayerStatus::Stopped
        } else if self.state.paused {
            PlayerStatus::Paused
        } else {
            PlayerStatus::Playing
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn subtitles_visible(&self) -> bool {
        self.state.subtitles_visible
    }

    pub fn volume_db(&self) -> f64 {
        self.state.volume_db
    }

    pub fn speed(&self) -> SpeedLevel {
        self.state.speed
    }

    pub fn position_seconds(&self) -> f64 {
        self.shared.position_seconds()
    }

    pub fn video(&self) -> &VideoProperties {
        &self.video
    }

    pub fn audio(&self) -> &AudioProperties {
        &self.audio
    }

    /// Whether the player is still producing output
    pub fn is_active(&self) -> bool {
        !self.stopped && self.shared.is_active()
    }

    /// Watcher-owned fields, readable from other threads
    pub fn shared(&self) -> Arc<SharedPlayback> {
        Arc::clone(&self.shared)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            status: self.status(),
            state: self.state.clone(),
            position_seconds: self.position_seconds(),
            video: self.video.clone(),
            audio: self.audio.clone(),
            exit: self.shared.exit_reason(),
        }
    }

    // --- internals -------------------------------------------------------

    fn ensure_open(&self) -> PlayerResult<()> {
        if self.stopped {
            Err(PlayerError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn require(&mut self, command: ControlCommand) -> PlayerResult<()> {
        if self.control.write(command) {
            Ok(())
        } else {
            Err(PlayerError::WriteFailed { command })
        }
    }

    fn run_plan(&mut self, plan: StepPlan) -> PlayerResult<()> {
        for _ in 0..plan.count {
            self.require(plan.command)?;
        }
        Ok(())
    }
}

impl<C: PlayerControl> Drop for Player<C> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Failed to stop player on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;
    use parking_lot::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<ControlCommand>>>,
        broken: Arc<Mutex<bool>>,
        terminations: Arc<Mutex<u32>>,
    }

    impl Recorder {
        fn sent(&self) -> Vec<ControlCommand> {
            self.sent.lock().clone()
        }

        fn count(&self) -> usize {
            self.sent.lock().len()
        }

        fn break_pipe(&self) {
            *self.broken.lock() = true;
        }
    }

    struct RecordingControl(Recorder);

    impl PlayerControl for RecordingControl {
        fn write(&mut self, command: ControlCommand) -> bool {
            if *self.0.broken.lock() {
                return false;
            }
            self.0.sent.lock().push(command);
            true
        }

        fn terminate(&mut self) -> PlayerResult<()> {
            *self.0.terminations.lock() += 1;
            *self.0.broken.lock() = true;
            Ok(())
        }

        fn is_alive(&mut self) -> bool {
            !*self.0.broken.lock()
        }
    }

    fn video() -> VideoProperties {
        VideoProperties {
            decoder: "omx-h264".to_string(),
            width: 1920,
            height: 1080,
            profile: 100,
            fps: 23.976,
        }
    }

    fn audio() -> AudioProperties {
        AudioProperties {
            decoder: "aac".to_string(),
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
        }
    }

    fn player_with(options: PlayerOptions) -> (Player<RecordingControl>, Recorder, Sender<String>) {
        let recorder = Recorder::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        let watcher_config = WatcherConfig {
            read_timeout: Duration::from_millis(20),
            throttle: Duration::from_millis(1),
        };
        let watcher = PositionWatcher::spawn(rx, OutputParser::default(), watcher_config).unwrap();
        let player = Player::with_control(
            RecordingControl(recorder.clone()),
            watcher,
            video(),
            audio(),
            &options,
        );
        (player, recorder, tx)
    }

    fn player() -> (Player<RecordingControl>, Recorder, Sender<String>) {
        player_with(PlayerOptions {
            show_subtitles: true,
            ..PlayerOptions::default()
        })
    }

    #[test]
    fn test_startup_hides_subtitles_by_default() {
        let (player, recorder, _tx) = player_with(PlayerOptions::default());
        assert_eq!(recorder.sent(), vec![ControlCommand::ToggleSubtitles]);
        assert!(!player.subtitles_visible());
        assert_eq!(player.status(), PlayerStatus::Playing);
    }

    #[test]
    fn test_start_paused() {
        let (player, recorder, _tx) = player_with(PlayerOptions {
            start_playing: false,
            show_subtitles: true,
            ..PlayerOptions::default()
        });
        assert_eq!(recorder.sent(), vec![ControlCommand::Pause]);
        assert!(player.is_paused());
        assert_eq!(player.status(), PlayerStatus::Paused);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let (mut player, recorder, _tx) = player();
        player.pause().unwrap();
        assert_eq!(recorder.sent(), vec![ControlCommand::Pause]);
        assert!(player.is_paused());

        player.pause().unwrap();
        assert_eq!(recorder.count(), 1);
        assert!(player.is_paused());
    }

    #[test]
    fn test_play_when_playing_sends_nothing() {
        let (mut player, recorder, _tx) = player();
        player.play().unwrap();
        assert_eq!(recorder.count(), 0);

        player.pause().unwrap();
        player.play().unwrap();
        assert_eq!(recorder.sent(), vec![ControlCommand::Pause, ControlCommand::Pause]);
        assert!(!player.is_paused());
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let (mut player, recorder, _tx) = player();
        recorder.break_pipe();

        let err = player.toggle_subtitles().unwrap_err();
        assert!(matches!(err, PlayerError::WriteFailed { command: ControlCommand::ToggleSubtitles }));
        assert!(player.subtitles_visible());

        assert!(player.pause().is_err());
        assert!(!player.is_paused());
    }

    #[test]
    fn test_set_volume_steps() {
        let (mut player, recorder, _tx) = player();
        player.set_volume(2.0).unwrap();
        assert_eq!(recorder.sent(), vec![ControlCommand::VolumeUp; 4]);
        assert_eq!(player.volume_db(), 2.0);

        player.set_volume(1.0).unwrap();
        assert_eq!(recorder.count(), 6);
        assert_eq!(recorder.sent()[4..], [ControlCommand::VolumeDown; 2]);
        assert_eq!(player.volume_db(), 1.0);
    }

    #[test]
    fn test_set_volume_twice_sends_nothing_second_time() {
        let (mut player, recorder, _tx) = player();
        player.set_volume(-3.2).unwrap();
        let after_first = recorder.count();
        assert_eq!(after_first, 6);

        player.set_volume(-3.2).unwrap();
        assert_eq!(recorder.count(), after_first);
    }

    #[test]
    fn test_set_volume_snaps_to_step_grid() {
        let (mut player, _recorder, _tx) = player();
        player.set_volume(1.2).unwrap();
        assert_eq!(player.volume_db(), 1.0);
    }

    #[test]
    fn test_set_volume_rejects_nan() {
        let (mut player, recorder, _tx) = player();
        assert!(matches!(
            player.set_volume(f64::NAN),
            Err(PlayerError::InvalidVolume { .. })
        ));
        assert_eq!(recorder.count(), 0);
        assert_eq!(player.volume_db(), 0.0);
    }

    #[test]
    fn test_set_volume_rejects_out_of_range_targets_without_io() {
        use crate::domain::rules::{MAX_VOLUME_DB, MIN_VOLUME_DB};

        let (mut player, recorder, _tx) = player();
        for target in [1e12, -1e12, MAX_VOLUME_DB + 0.5, MIN_VOLUME_DB - 0.5] {
            assert!(matches!(
                player.set_volume(target),
                Err(PlayerError::InvalidVolume { .. })
            ));
        }
        assert_eq!(recorder.count(), 0);
        assert_eq!(player.volume_db(), 0.0);

        player.set_volume(MAX_VOLUME_DB).unwrap();
        assert_eq!(recorder.count(), 120);
        assert_eq!(player.volume_db(), MAX_VOLUME_DB);
    }

    #[test]
    fn test_set_volume_records_target_even_when_write_fails() {
        let (mut player, recorder, _tx) = player();
        recorder.break_pipe();
        assert!(player.set_volume(3.0).is_err());
        assert_eq!(player.volume_db(), 3.0);
    }

    #[test]
    fn test_legacy_policy_sends_one_less() {
        let (mut player, recorder, _tx) = player_with(PlayerOptions {
            show_subtitles: true,
            step_policy: StepPolicy::Legacy,
            ..PlayerOptions::default()
        });
        player.set_volume(2.0).unwrap();
        assert_eq!(recorder.count(), 3);
        assert_eq!(player.volume_db(), 2.0);

        player.set_speed(SpeedLevel::VFast).unwrap();
        assert_eq!(recorder.count(), 4);
        assert_eq!(player.speed(), SpeedLevel::VFast);
    }

    #[test]
    fn test_volume_single_steps() {
        let (mut player, recorder, _tx) = player();
        player.volume_up().unwrap();
        player.volume_up().unwrap();
        player.volume_down().unwrap();
        assert_eq!(player.volume_db(), 0.5);
        assert_eq!(recorder.count(), 3);
    }

    #[test]
    fn test_set_speed_rejects_invalid_values_without_io() {
        let (mut player, recorder, _tx) = player();
        for value in [-2, 3, 42] {
            assert!(matches!(
                player.set_speed_value(value),
                Err(PlayerError::InvalidSpeed { .. })
            ));
        }
        assert_eq!(recorder.count(), 0);
        assert_eq!(player.speed(), SpeedLevel::Normal);
    }

    #[test]
    fn test_set_speed_steps() {
        let (mut player, recorder, _tx) = player();
        player.set_speed_value(2).unwrap();
        assert_eq!(recorder.sent(), vec![ControlCommand::SpeedUp; 2]);
        assert_eq!(player.speed(), SpeedLevel::VFast);

        player.set_speed(SpeedLevel::Slow).unwrap();
        assert_eq!(recorder.sent()[2..], [ControlCommand::SpeedDown; 3]);
        assert_eq!(player.speed(), SpeedLevel::Slow);
    }

    #[test]
    fn test_speed_steps_are_clamped() {
        let (mut player, recorder, _tx) = player();
        player.set_speed(SpeedLevel::VFast).unwrap();
        let sent = recorder.count();
        player.speed_up().unwrap();
        assert_eq!(recorder.count(), sent);
        assert_eq!(player.speed(), SpeedLevel::VFast);

        player.set_speed(SpeedLevel::Slow).unwrap();
        let sent = recorder.count();
        player.speed_down().unwrap();
        assert_eq!(recorder.count(), sent);
    }

    #[test]
    fn test_unsupported_capabilities() {
        let (mut player, recorder, _tx) = player();
        assert!(matches!(player.seek(10.0), Err(PlayerError::NotSupported { .. })));
        assert!(matches!(player.set_chapter(2), Err(PlayerError::NotSupported { .. })));
        assert!(matches!(player.set_subtitle_track(1), Err(PlayerError::NotSupported { .. })));
        assert!(matches!(player.set_audio_channel(1), Err(PlayerError::NotSupported { .. })));
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_closes_session() {
        let (mut player, recorder, _tx) = player();
        player.stop().unwrap();
        player.stop().unwrap();
        assert_eq!(*recorder.terminations.lock(), 1);
        assert_eq!(player.status(), PlayerStatus::Stopped);

        assert!(matches!(player.pause(), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.set_volume(1.0), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.set_speed_value(1), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.toggle_subtitles(), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.seek(10.0), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.set_chapter(2), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.set_subtitle_track(1), Err(PlayerError::SessionClosed)));
        assert!(matches!(player.set_audio_channel(1), Err(PlayerError::SessionClosed)));
    }

    #[test]
    fn test_position_read_from_watcher() {
        let (player, _recorder, tx) = player();
        tx.send("M: 2500000 V: 2500000".to_string()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while player.position_seconds() != 2.5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(player.position_seconds(), 2.5);
        assert_eq!(player.snapshot().position_seconds, 2.5);
    }

    #[test]
    fn test_farewell_marks_session_stopped() {
        let (player, _recorder, tx) = player();
        let shared = player.shared();
        tx.send("have a nice day ;)".to_string()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while shared.is_active() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!player.is_active());
        assert_eq!(player.status(), PlayerStatus::Stopped);
        assert_eq!(player.snapshot().exit, Some(WatchExit::Farewell));
    }
}
