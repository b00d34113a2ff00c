//! Galaxy keypad bus tool
//!
//! ```text
//! galaxy master          drive a keypad: clock display, key polling
//! galaxy sniff [OUT]     capture bus traffic to OUT (default <unix-secs>.dat)
//! galaxy dump FILE       replay a capture and print decoded frames
//! ```
//!
//! Logs go to stderr; captured and decoded traffic goes to stdout.

mod settings;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use anyhow::{bail, Context};
use galaxy_bus::{display_channel, open_serial, run_clock, Bus, BusMaster};
use galaxy_capture::{analyze, read_in, record_from, CaptureCommand, PassiveCapture, Recorder};
use settings::Settings;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: galaxy master | galaxy sniff [OUT] | galaxy dump FILE";

/// Depth of the channels between capture, recorder and analyzer
const MESSAGE_QUEUE: usize = 256;

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Master,
    Sniff { out: Option<PathBuf> },
    Dump { file: PathBuf },
}

fn parse_args<I>(args: I) -> anyhow::Result<Mode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mode = match args.next().as_deref() {
        Some("master") => Mode::Master,
        Some("sniff") => Mode::Sniff {
            out: args.next().map(PathBuf::from),
        },
        Some("dump") => match args.next() {
            Some(file) => Mode::Dump {
                file: PathBuf::from(file),
            },
            None => bail!("dump needs a capture file"),
        },
        Some(other) => bail!("unknown mode '{}'", other),
        None => bail!("no mode given"),
    };

    if let Some(extra) = args.next() {
        bail!("unexpected argument '{}'", extra);
    }
    Ok(mode)
}

/// `<unix-seconds>.dat` in the working directory
fn default_capture_path(now: SystemTime) -> PathBuf {
    let secs = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("{}.dat", secs))
}

async fn run_master(settings: &Settings) -> anyhow::Result<()> {
    let port = open_serial(&settings.port, settings.baud_rate)?;
    let bus = Bus::new(port, settings.bus_timing());

    let (display_tx, display_rx) = display_channel();
    tokio::spawn(run_clock(display_tx));

    let master = BusMaster::new(bus, display_rx);
    tokio::select! {
        result = master.run() => result.context("bus master stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping bus master"),
    }
    Ok(())
}

async fn run_sniff(settings: &Settings, out: &Path) -> anyhow::Result<()> {
    let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    let port = open_serial(&settings.port, settings.baud_rate)?;
    info!("Recording {} to {}", settings.port, out.display());

    let (cmd_tx, cmd_rx) = mpsc::channel(1);
    let (frame_tx, mut frame_rx) = mpsc::channel(MESSAGE_QUEUE);

    let recording = tokio::task::spawn_blocking(move || {
        let mut recorder = Recorder::new(file);
        record_from(&mut frame_rx, &mut recorder)
    });

    let capture = PassiveCapture::new(port, std::io::stdout(), settings.capture_config());
    let mut capture_task = tokio::spawn(capture.run(cmd_rx, frame_tx));

    let captured = tokio::select! {
        result = &mut capture_task => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping capture");
            // The capture may already have stopped on its own
            let _ = cmd_tx.send(CaptureCommand::Shutdown).await;
            capture_task.await
        }
    };

    let captured = captured.context("capture task failed")?;
    let recorded = recording.await.context("recorder task failed")??;
    captured?;

    info!("Recorded {} frames to {}", recorded, out.display());
    Ok(())
}

async fn run_dump(file: &Path) -> anyhow::Result<()> {
    let source = File::open(file).with_context(|| format!("opening {}", file.display()))?;

    let (tx, rx) = mpsc::channel(MESSAGE_QUEUE);
    let replay = tokio::task::spawn_blocking(move || read_in(source, tx));

    let frames = analyze(rx, std::io::stdout()).await?;
    let messages = replay.await.context("replay task failed")??;

    info!("{} messages, {} frames", messages, frames);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "galaxy=info,galaxy_protocol=info,galaxy_bus=info,galaxy_capture=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mode = match parse_args(std::env::args().skip(1)) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("galaxy: {}\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("galaxy: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match mode {
        Mode::Master => run_master(&settings).await,
        Mode::Sniff { out } => {
            let out = out.unwrap_or_else(|| default_capture_path(SystemTime::now()));
            run_sniff(&settings, &out).await
        }
        Mode::Dump { file } => run_dump(&file).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("{:?}", e);
            // Nothing useful left to do if stderr itself is gone
            let _ = diagnose(&mut std::io::stderr(), &e);
            ExitCode::FAILURE
        }
    }
}

/// One-line diagnostic for a fatal error, with its context chain
fn diagnose<W: Write>(out: &mut W, e: &anyhow::Error) -> std::io::Result<()> {
    writeln!(out, "galaxy: {:#}", e)
}
