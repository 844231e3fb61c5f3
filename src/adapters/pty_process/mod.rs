//! Player process supervision over a pseudo-terminal
//!
//! The player formats its status output differently when it is not talking
//! to a terminal, so it is always spawned with a pty as stdin/stdout/stderr.
//! A reader thread turns the master side into a channel of lines; the
//! handshake consumes that channel on the caller's thread and then hands it
//! over to the position watcher.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use nix::errno::Errno;
use nix::pty::openpty;
use nix::sys::signal::{killpg, Signal};
use nix::sys::termios::{cfmakeraw, tcgetattr, tcsetattr, SetArg};
use nix::unistd::{setsid, Pid};
use tracing::{debug, info, trace, warn};

use crate::domain::command::ControlCommand;
use crate::domain::model::{AudioProperties, VideoProperties};
use crate::error::{PlayerError, PlayerResult};
use crate::parser::{LineSplitter, OutputParser, OutputRecord, PositionFormat};
use crate::ports::PlayerControl;

/// Flag asking the player to print its status heartbeat
pub const DEFAULT_STATS_FLAG: &str = "-s";

/// Flag asking the player to adjust the display refresh rate to the video
pub const REFRESH_FLAG: &str = "-r";

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a session is launched and torn down
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub program: PathBuf,
    pub stats_flag: String,
    pub adjust_refresh: bool,
    /// Arguments placed before the resource on every launch
    pub extra_args: Vec<String>,
    pub handshake_timeout: Duration,
    /// Time the player gets to honour `Quit` before it is signalled
    pub stop_grace: Duration,
    pub position: PositionFormat,
}

impl LaunchOptions {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            stats_flag: DEFAULT_STATS_FLAG.to_string(),
            adjust_refresh: true,
            extra_args: Vec::new(),
            handshake_timeout: Duration::from_secs(10),
            stop_grace: Duration::from_secs(2),
            position: PositionFormat::default(),
        }
    }

    /// Arguments for one launch: `<stats> [extra...] [-r] <resource>`
    pub fn command_args(&self, resource: &str, extra_args: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(self.extra_args.len() + extra_args.len() + 3);
        if !self.stats_flag.is_empty() {
            args.push(self.stats_flag.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(extra_args.iter().cloned());
        if self.adjust_refresh {
            args.push(REFRESH_FLAG.to_string());
        }
        args.push(resource.to_string());
        args
    }
}

/// Stream properties announced before playback starts
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub video: VideoProperties,
    pub audio: AudioProperties,
}

/// Consume output lines until both codec headers have been parsed.
///
/// Fails with `HandshakeIncomplete` if the stream closes, the farewell banner
/// shows up, or `timeout` elapses first.
pub fn await_handshake(
    lines: &Receiver<String>,
    parser: &OutputParser,
    timeout: Duration,
) -> PlayerResult<Handshake> {
    let deadline = Instant::now() + timeout;
    let mut video: Option<VideoProperties> = None;
    let mut audio: Option<AudioProperties> = None;

    loop {
        if let (Some(video), Some(audio)) = (&video, &audio) {
            return Ok(Handshake {
                video: video.clone(),
                audio: audio.clone(),
            });
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match lines.recv_timeout(remaining) {
            Ok(line) => match parser.parse_line(&line) {
                Some(OutputRecord::Video(props)) => {
                    debug!(?props, "Video header parsed");
                    video = Some(props);
                }
                Some(OutputRecord::Audio(props)) => {
                    debug!(?props, "Audio header parsed");
                    audio = Some(props);
                }
                Some(OutputRecord::Farewell) => {
                    return Err(PlayerError::handshake(format!(
                        "player quit before announcing {}",
                        missing_headers(&video, &audio)
                    )));
                }
                _ => trace!(%line, "Handshake noise"),
            },
            Err(RecvTimeoutError::Timeout) => {
                return Err(PlayerError::handshake(format!(
                    "no {} within {:?}",
                    missing_headers(&video, &audio),
                    timeout
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(PlayerError::handshake(format!(
                    "output closed before {}",
                    missing_headers(&video, &audio)
                )));
            }
        }
    }
}

fn missing_headers(video: &Option<VideoProperties>, audio: &Option<AudioProperties>) -> &'static str {
    match (video.is_some(), audio.is_some()) {
        (false, false) => "video and audio headers",
        (false, true) => "video header",
        _ => "audio header",
    }
}

/// A live player process and its terminal
pub struct PlaybackSession {
    child: Child,
    pgid: Pid,
    input: Option<File>,
    output: Option<Receiver<String>>,
    video: VideoProperties,
    audio: AudioProperties,
    stop_grace: Duration,
}

impl PlaybackSession {
    /// Spawn the player for `resource` and block until the handshake completes
    pub fn launch(
        options: &LaunchOptions,
        resource: &str,
        extra_args: &[String],
    ) -> PlayerResult<Self> {
        let parser = OutputParser::new(options.position.clone())?;
        let args = options.command_args(resource, extra_args);

        info!(program = %options.program.display(), ?args, "Spawning player");
        let (mut child, master) = spawn_on_pty(&options.program, &args)?;
        let pgid = Pid::from_raw(child.id() as i32);

        let (lines_tx, lines_rx) = crossbeam_channel::unbounded();
        let started = master
            .try_clone()
            .and_then(|reader| spawn_reader(reader, lines_tx));
        if let Err(e) = started {
            kill_group(pgid, Signal::SIGKILL);
            let _ = child.wait();
            return Err(e.into());
        }

        let handshake = match await_handshake(&lines_rx, &parser, options.handshake_timeout) {
            Ok(handshake) => handshake,
            Err(e) => {
                warn!(error = %e, "Handshake failed, killing player");
                kill_group(pgid, Signal::SIGKILL);
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        info!(
            video = %handshake.video.decoder,
            width = handshake.video.width,
            height = handshake.video.height,
            fps = handshake.video.fps,
            audio = %handshake.audio.decoder,
            "Handshake complete"
        );

        Ok(Self {
            child,
            pgid,
            input: Some(master),
            output: Some(lines_rx),
            video: handshake.video,
            audio: handshake.audio,
            stop_grace: options.stop_grace,
        })
    }

    pub fn video(&self) -> &VideoProperties {
        &self.video
    }

    pub fn audio(&self) -> &AudioProperties {
        &self.audio
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Hand the output channel to a watcher; `None` once taken
    pub fn take_output(&mut self) -> Option<Receiver<String>> {
        self.output.take()
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> PlayerResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.child.try_wait()?.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl PlayerControl for PlaybackSession {
    fn write(&mut self, command: ControlCommand) -> bool {
        if !self.is_alive() {
            debug!(?command, "Player not running, dropping command");
            return false;
        }
        let Some(input) = self.input.as_mut() else {
            return false;
        };

        match input.write_all(&[command.byte()]).and_then(|_| input.flush()) {
            Ok(()) => {
                debug!(?command, byte = %char::from(command.byte()), "Control byte sent");
                true
            }
            Err(e) => {
                warn!(?command, error = %e, "Failed to write control byte");
                false
            }
        }
    }

    fn terminate(&mut self) -> PlayerResult<()> {
        if self.input.is_none() {
            return Ok(());
        }

        let was_alive = self.is_alive();
        if was_alive {
            self.write(ControlCommand::Quit);
            if !self.wait_for_exit(self.stop_grace)? {
                warn!(pid = self.pid(), "Player ignored quit, sending SIGTERM");
                kill_group(self.pgid, Signal::SIGTERM);
                if !self.wait_for_exit(self.stop_grace / 2)? {
                    warn!(pid = self.pid(), "Player ignored SIGTERM, killing");
                    kill_group(self.pgid, Signal::SIGKILL);
                    let _ = self.child.kill();
                    self.child.wait()?;
                }
            }
        }

        // Helpers the player forked may still hold the terminal open. A leader
        // reaped before this call may have had its pgid recycled, so leave it alone.
        if was_alive {
            kill_group(self.pgid, Signal::SIGKILL);
        }
        self.input = None;
        info!(pid = self.pid(), "Player terminated");
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!(error = %e, "Failed to terminate player on drop");
        }
    }
}

/// Spawn `program` as a session leader with a fresh pty on all three stdio streams
fn spawn_on_pty(program: &Path, args: &[String]) -> PlayerResult<(Child, File)> {
    let pty = openpty(None, None)?;

    // No echo of our keystrokes and no output post-processing
    let mut termios = tcgetattr(&pty.slave)?;
    cfmakeraw(&mut termios);
    tcsetattr(&pty.slave, SetArg::TCSANOW, &termios)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::from(pty.slave.try_clone()?))
        .stdout(Stdio::from(pty.slave.try_clone()?))
        .stderr(Stdio::from(pty.slave));

    // SAFETY: setsid is async-signal-safe and touches no parent state
    unsafe {
        command.pre_exec(|| setsid().map(|_| ()).map_err(io::Error::from));
    }

    let child = command.spawn().map_err(|source| PlayerError::SpawnFailed {
        program: program.display().to_string(),
        source,
    })?;

    // The slave fds owned by `command` must close here, or the master never sees EOF
    drop(command);

    Ok((child, File::from(pty.master)))
}

fn spawn_reader(mut master: File, lines: Sender<String>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || {
            let mut splitter = LineSplitter::new();
            let mut buf = [0u8; 4096];

            loop {
                match master.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        for line in splitter.push(&buf[..n]) {
                            if lines.send(line).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // Linux reports EIO once every slave fd is closed
                        debug!(error = %e, "Terminal read ended");
                        break;
                    }
                }
            }

            if let Some(line) = splitter.finish() {
                let _ = lines.send(line);
            }
            debug!("Terminal reader stopped");
        })
}

fn kill_group(pgid: Pid, signal: Signal) {
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(%pgid, ?signal, error = %e, "Failed to signal player process group"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_LINE: &str = "Video codec omx-h264 width 640 height 360 profile 77 fps 29.970030";
    const AUDIO_LINE: &str = "Audio codec mp3 channels 1 samplerate 22050 bitspersample 16";

    fn feed(lines: &[&str]) -> Receiver<String> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        rx
    }

    #[test]
    fn test_command_args_template() {
        let mut options = LaunchOptions::new("/usr/bin/omxplayer");
        options.extra_args = vec!["-o".to_string(), "hdmi".to_string()];
        let args = options.command_args("movie.mp4", &["--vol".to_string(), "-600".to_string()]);
        assert_eq!(args, vec!["-s", "-o", "hdmi", "--vol", "-600", "-r", "movie.mp4"]);

        options.adjust_refresh = false;
        options.extra_args.clear();
        assert_eq!(options.command_args("x", &[]), vec!["-s", "x"]);
    }

    #[test]
    fn test_handshake_any_order_with_noise() {
        let parser = OutputParser::default();
        let rx = feed(&["file : movie.mp4", AUDIO_LINE, "Subtitle count: 0", VIDEO_LINE]);
        let handshake = await_handshake(&rx, &parser, Duration::from_secs(1)).unwrap();
        assert_eq!(handshake.video.width, 640);
        assert_eq!(handshake.video.profile, 77);
        assert_eq!(handshake.audio.sample_rate, 22050);
    }

    #[test]
    fn test_handshake_stops_at_both_headers() {
        let parser = OutputParser::default();
        let rx = feed(&[VIDEO_LINE, AUDIO_LINE, "M: 1000000"]);
        await_handshake(&rx, &parser, Duration::from_secs(1)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "M: 1000000");
    }

    #[test]
    fn test_handshake_stream_closed() {
        let parser = OutputParser::default();
        let rx = feed(&[VIDEO_LINE]);
        match await_handshake(&rx, &parser, Duration::from_secs(1)) {
            Err(PlayerError::HandshakeIncomplete { reason }) => {
                assert!(reason.contains("audio header"), "{}", reason)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_handshake_times_out() {
        let parser = OutputParser::default();
        let (_tx, rx) = crossbeam_channel::unbounded::<String>();
        let started = Instant::now();
        let result = await_handshake(&rx, &parser, Duration::from_millis(50));
        assert!(matches!(result, Err(PlayerError::HandshakeIncomplete { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_handshake_farewell_is_incomplete() {
        let parser = OutputParser::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send("have a nice day ;)".to_string()).unwrap();
        let result = await_handshake(&rx, &parser, Duration::from_secs(1));
        assert!(matches!(result, Err(PlayerError::HandshakeIncomplete { .. })));
    }
}
