//! Galaxy Keypad Bus Capture
//!
//! Passive tooling for reverse-engineering the keypad bus:
//!
//! - **Segmenter**: recovers frame boundaries from inter-read timing
//! - **Sniffer**: taps the bus read-only and emits timestamped messages
//! - **Recorder / Reader**: an append-only JSON-lines log of messages
//! - **Analyzer**: regroups a replayed log and renders it with descriptions
//!
//! Capture and replay are separate pipelines connected by channels:
//!
//! ```text
//! bus ──► PassiveCapture ──mpsc──► Recorder ──► file
//! file ──► Reader ──mpsc──► analyze ──► stdout
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, SystemTime};
//! use galaxy_capture::{FrameSegmenter, GapThresholds};
//!
//! let t0 = SystemTime::now();
//! let mut seg = FrameSegmenter::new(GapThresholds::default());
//!
//! seg.push(&[0x10, 0x19, 0x01, 0xD4], t0);
//! seg.push(&[0x11, 0xFE, 0xBA], t0);
//! let frame = seg.push(&[0x10, 0x0D, 0x01, 0xC8], t0 + Duration::from_millis(20));
//!
//! assert_eq!(frame.unwrap().message.data, vec![0x10, 0x19, 0x01, 0xD4, 0x11, 0xFE, 0xBA]);
//! ```

pub mod analyzer;
pub mod error;
pub mod message;
pub mod recorder;
pub mod segmenter;
pub mod sniffer;

pub use analyzer::{analyze, LogicalFrame, OfflineAnalyzer, ANALYSIS_GAP};
pub use error::{CaptureError, RecordError};
pub use message::{format_time, Message};
pub use recorder::{read_in, record_from, Reader, Recorder};
pub use segmenter::{CompletedFrame, FrameSegmenter, GapThresholds};
pub use sniffer::{summary_line, CaptureCommand, CaptureConfig, PassiveCapture};
