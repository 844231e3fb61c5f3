//! Command implementations

use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::player_binary::{probe_flag as player_supports_flag, resolve_player};
use crate::adapters::toml_config::PlayerConfig;
use crate::app::Player;
use crate::cli::args::{ParseArgs, PlayArgs, ProbeFlagArgs};
use crate::cli::console::{self, ConsoleOptions};
use crate::parser::{LineSplitter, OutputParser, OutputRecord};

/// Execute the play command
pub async fn play(args: PlayArgs, config: &PlayerConfig) -> Result<()> {
    info!("Starting playback of {}", args.resource);

    let launch = config
        .launch_options()
        .context("Failed to locate the player")?;
    let options = config.player_options();
    let resource = args.resource.clone();
    let extra_args = args.extra_args.clone();

    // The handshake blocks until the player has printed its codec headers
    let player = tokio::task::spawn_blocking(move || {
        Player::launch(&launch, &options, &resource, &extra_args)
    })
    .await
    .context("Launch task failed")?
    .with_context(|| format!("Failed to start playback of {}", args.resource))?;

    let video = player.video();
    info!(
        "Video: {} {}x{} @ {:.3} fps",
        video.decoder, video.width, video.height, video.fps
    );
    let audio = player.audio();
    info!(
        "Audio: {} {} ch {} Hz",
        audio.decoder, audio.channels, audio.sample_rate
    );

    let console_options = ConsoleOptions {
        json: args.json,
        status_interval: Duration::from_millis(args.status_interval_ms.max(1)),
    };
    let snapshot = console::run(player, console_options).await?;

    info!(
        "Playback finished at {:.3}s ({:?})",
        snapshot.position_seconds, snapshot.exit
    );
    Ok(())
}

/// Execute the parse command
pub fn parse(args: ParseArgs, config: &PlayerConfig) -> Result<()> {
    let parser = OutputParser::new(config.position.clone())
        .context("Invalid position format")?;

    let input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let records = parse_stream(BufReader::new(input), &parser, &mut out)?;

    info!("Parsed {} records", records);
    Ok(())
}

/// Run the parser over a byte stream, writing one JSON record per line
pub fn parse_stream<R: BufRead, W: Write>(
    mut input: R,
    parser: &OutputParser,
    out: &mut W,
) -> Result<usize> {
    let mut splitter = LineSplitter::new();
    let mut records = 0;

    loop {
        let chunk = input.fill_buf().context("Failed to read player output")?;
        if chunk.is_empty() {
            break;
        }
        let lines = splitter.push(chunk);
        let consumed = chunk.len();
        input.consume(consumed);

        for line in lines {
            records += emit(parser.parse_line(&line), out)?;
        }
    }
    if let Some(line) = splitter.finish() {
        records += emit(parser.parse_line(&line), out)?;
    }

    out.flush()?;
    Ok(records)
}

fn emit<W: Write>(record: Option<OutputRecord>, out: &mut W) -> Result<usize> {
    match record {
        Some(record) => {
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
            Ok(1)
        }
        None => Ok(0),
    }
}

/// Execute the probe-flag command
pub fn probe_flag(args: ProbeFlagArgs, config: &PlayerConfig) -> Result<()> {
    let program = resolve_player(&config.program).context("Failed to locate the player")?;
    let supported = player_supports_flag(&program, &args.flag)
        .with_context(|| format!("Failed to run {}", program.display()))?;

    if supported {
        println!("{}: supported", args.flag);
    } else {
        warn!(program = %program.display(), "Flag {} not listed in usage", args.flag);
        println!("{}: not supported", args.flag);
    }
    Ok(())
}
