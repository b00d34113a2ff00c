//! Offline analysis of recorded traffic
//!
//! Replayed messages are regrouped with a fixed short gap: a message that
//! arrives more than [`ANALYSIS_GAP`] after the previous one starts a new
//! logical frame. Each frame is printed as
//!
//! ```text
//! 12:00:00.000 +0.012000: 101901D4            ....
//! > Keypad   POLL   ✓ POLL 01
//! ```
//!
//! The first line holds the start time, the seconds since the previous
//! printed frame, the raw bytes and a printable rendering pushed out to a
//! 20-column field. The second is the decoder's best guess at what the frame
//! means.
//!
//! Frames addressed to the keypad's internal prox reader are skipped.

use std::io::Write;
use std::time::{Duration, SystemTime};

use galaxy_protocol::{printable, DecodedFrame, PROX_READER_MARKER};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::CaptureError;
use crate::message::{format_time, Message};

/// Gap that separates logical frames during analysis
pub const ANALYSIS_GAP: Duration = Duration::from_millis(5);

/// Width of the field the hex and printable renderings share
const RENDER_WIDTH: usize = 20;

/// A regrouped frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalFrame {
    pub start: SystemTime,
    pub data: Vec<u8>,
}

impl LogicalFrame {
    /// Raw bytes and printable rendering, padded apart
    ///
    /// `previous` is the start of the frame printed before this one; the
    /// first frame shows no elapsed time.
    pub fn render(&self, previous: Option<SystemTime>) -> String {
        let elapsed = previous
            .and_then(|p| self.start.duration_since(p).ok())
            .unwrap_or(Duration::ZERO);
        let hex: String = self.data.iter().map(|b| format!("{:02X}", b)).collect();
        let pad = RENDER_WIDTH.saturating_sub(hex.len()).max(1);
        format!(
            "{} {:+.6}: {}{:pad$}{}",
            format_time(self.start),
            elapsed.as_secs_f64(),
            hex,
            "",
            printable(&self.data),
            pad = pad
        )
    }

    /// Decoder description, if the frame is long enough to have one
    pub fn describe(&self) -> Option<DecodedFrame> {
        DecodedFrame::decode(&self.data)
    }

    /// Traffic for the keypad's prox reader, which analysis leaves out
    pub fn is_ignored(&self) -> bool {
        self.data.first() == Some(&PROX_READER_MARKER)
    }
}

/// Regroups a replayed message stream into logical frames
#[derive(Debug)]
pub struct OfflineAnalyzer {
    gap: Duration,
    current: Option<LogicalFrame>,
    last: Option<SystemTime>,
}

impl Default for OfflineAnalyzer {
    fn default() -> Self {
        Self::with_gap(ANALYSIS_GAP)
    }
}

impl OfflineAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gap(gap: Duration) -> Self {
        Self {
            gap,
            current: None,
            last: None,
        }
    }

    /// Feed the next message; returns the previous frame if this one starts
    /// a new frame
    pub fn push(&mut self, msg: Message) -> Option<LogicalFrame> {
        let split = match self.last {
            Some(last) => msg.timestamp.duration_since(last).unwrap_or(Duration::ZERO) > self.gap,
            None => false,
        };
        self.last = Some(msg.timestamp);

        let finished = if split { self.current.take() } else { None };
        match &mut self.current {
            Some(frame) => frame.data.extend_from_slice(&msg.data),
            None => {
                self.current = Some(LogicalFrame {
                    start: msg.timestamp,
                    data: msg.data,
                })
            }
        }
        finished
    }

    /// The frame still being collected when the stream ended
    pub fn finish(self) -> Option<LogicalFrame> {
        self.current
    }
}

/// Prints frames and remembers when the last printed one started
struct Report<W> {
    out: W,
    last: Option<SystemTime>,
    frames: usize,
}

impl<W: Write> Report<W> {
    fn frame(&mut self, frame: &LogicalFrame) -> std::io::Result<()> {
        if frame.is_ignored() {
            trace!("skipping prox reader frame {:02X?}", frame.data);
            return Ok(());
        }

        writeln!(self.out, "{}", frame.render(self.last))?;
        if let Some(decoded) = frame.describe() {
            writeln!(self.out, "{}", decoded)?;
        }
        self.last = Some(frame.start);
        self.frames += 1;
        Ok(())
    }
}

/// Print every logical frame in a replayed stream
///
/// Runs until the channel closes, then prints the trailing frame. Returns
/// the number of frames printed.
pub async fn analyze<W: Write>(
    mut rx: mpsc::Receiver<Message>,
    out: W,
) -> Result<usize, CaptureError> {
    let mut analyzer = OfflineAnalyzer::new();
    let mut report = Report {
        out,
        last: None,
        frames: 0,
    };

    while let Some(msg) = rx.recv().await {
        if let Some(frame) = analyzer.push(msg) {
            report.frame(&frame).map_err(CaptureError::Output)?;
        }
    }

    if let Some(frame) = analyzer.finish() {
        report.frame(&frame).map_err(CaptureError::Output)?;
    }

    report.out.flush().map_err(CaptureError::Output)?;
    debug!("Analysed {} frames", report.frames);
    Ok(report.frames)
}
