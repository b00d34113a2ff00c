//! Passive bus capture
//!
//! Taps the bus without ever writing to it, segments the byte stream into
//! frames with a [`FrameSegmenter`] and hands each finished frame on as a
//! [`Message`].
//!
//! Two kinds of console output are available, never both at once:
//! - per-frame summaries (default)
//! - every low-level read, idle ones included, for deep debugging

use std::io::{self, Write};
use std::time::{Duration, SystemTime};

use galaxy_protocol::{hex, is_no_data};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, trace};

use crate::error::CaptureError;
use crate::message::{format_time, Message};
use crate::segmenter::{CompletedFrame, FrameSegmenter, GapThresholds};

/// Commands that can be sent to a running capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    /// Stop after the current read; the frame in progress is dropped
    Shutdown,
}

/// Capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub thresholds: GapThresholds,
    /// Upper bound on a single read, so cancellation is noticed promptly
    pub read_timeout: Duration,
    /// Print every read instead of frame summaries
    pub dump_reads: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            thresholds: GapThresholds::default(),
            read_timeout: Duration::from_micros(500),
            dump_reads: false,
        }
    }
}

/// Frame summary line
///
/// `> start end (len gap=ms) +span: bytes`
pub fn summary_line(frame: &CompletedFrame) -> String {
    format!(
        "> {} {} ({:02} gap={:02}) {:+02}: {}",
        format_time(frame.message.timestamp),
        format_time(frame.end),
        frame.message.data.len(),
        frame.gap.as_millis(),
        frame.span.as_millis() as i64,
        hex(&frame.message.data)
    )
}

/// Read-only capture over an async byte stream
///
/// Generic over the reader so it can tap a serial port or, in tests, an
/// in-memory stream. `W` receives the console output.
pub struct PassiveCapture<R, W> {
    io: R,
    out: W,
    config: CaptureConfig,
    segmenter: FrameSegmenter,
}

impl<R, W> PassiveCapture<R, W>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    pub fn new(io: R, out: W, config: CaptureConfig) -> Self {
        Self {
            io,
            out,
            segmenter: FrameSegmenter::new(config.thresholds),
            config,
        }
    }

    /// Capture until shutdown is requested
    ///
    /// The command channel is checked once per read. A closed command channel
    /// counts as a shutdown request. Returns the console writer so callers
    /// can inspect or flush it.
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<CaptureCommand>,
        frame_tx: mpsc::Sender<Message>,
    ) -> Result<W, CaptureError> {
        info!(
            "Capturing (gaps {:?}/{:?}, read timeout {:?})",
            self.config.thresholds.inter_message,
            self.config.thresholds.slave_reply,
            self.config.read_timeout
        );

        let mut buf = [0u8; 128];
        let mut frames = 0u64;

        loop {
            match cmd_rx.try_recv() {
                Ok(CaptureCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                    info!("Capture stopping after {} frames", frames);
                    if !self.segmenter.pending().is_empty() {
                        debug!(
                            "Dropping partial frame {:02X?}",
                            self.segmenter.pending()
                        );
                    }
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            let n = match tokio::time::timeout(self.config.read_timeout, self.io.read(&mut buf)).await
            {
                Ok(Ok(0)) => return Err(CaptureError::SourceClosed),
                Ok(Ok(n)) => n,
                Ok(Err(e)) if is_no_data(&e) => 0,
                Ok(Err(e)) => return Err(CaptureError::Transport(e)),
                Err(_) => 0,
            };
            let now = SystemTime::now();
            let data = &buf[..n];

            if self.config.dump_reads {
                self.dump_read(data, now).map_err(CaptureError::Output)?;
            } else if n > 0 {
                trace!("read {:02X?}", data);
            }

            if let Some(frame) = self.segmenter.push(data, now) {
                if !self.config.dump_reads {
                    writeln!(self.out, "{}", summary_line(&frame)).map_err(CaptureError::Output)?;
                }
                frame_tx
                    .send(frame.message)
                    .await
                    .map_err(|_| CaptureError::ConsumerGone)?;
                frames += 1;
            }
        }

        self.out.flush().map_err(CaptureError::Output)?;
        Ok(self.out)
    }

    fn dump_read(&mut self, data: &[u8], at: SystemTime) -> io::Result<()> {
        if data.is_empty() {
            writeln!(self.out, ".")?;
        }
        writeln!(self.out, "{} {}", format_time(at), hex(data))
    }
}
