//! Galaxy Keypad Bus Protocol
//!
//! This crate provides the wire-level building blocks for the half-duplex
//! serial bus between a Galaxy alarm panel and its keypads:
//!
//! - **Checksum**: the additive, byte-folded checksum that ends every frame
//! - **Frames**: marker + command + payload, with the checksum derived on encode
//! - **Commands**: master-to-keypad command codes, including the ones whose
//!   purpose is still unknown
//! - **Replies**: classification of the keypad's reply command byte
//! - **Keys**: decoding of the key/tamper report byte
//! - **Display**: layout of the two-line, 16-column screen update
//! - **Decoder**: best-effort descriptions of captured frames for analysis
//!
//! # Frame Format
//! ```text
//! [marker] [command] [payload...] [checksum]
//! ```
//!
//! - `marker`: `0x10` for frames sent by the bus master (addressed to the
//!   keypad), `0x11` for replies from the keypad (addressed to the panel)
//! - `checksum`: see [`checksum`]
//!
//! The protocol is only partially reverse-engineered; anything not understood
//! is kept as an explicit "unknown" variant rather than guessed at.
//!
//! # Example
//!
//! ```rust
//! use galaxy_protocol::{Command, Frame, ReplyKind, MASTER_MARKER};
//!
//! let poll = Frame::new(MASTER_MARKER, Command::Poll).with_payload([0x01]);
//! assert_eq!(poll.encode(), vec![0x10, 0x19, 0x01, 0xD4]);
//!
//! assert_eq!(ReplyKind::classify(&[0x11, 0xFE, 0xBA]), Some(ReplyKind::Ack));
//! ```

pub mod checksum;
pub mod command;
pub mod decoder;
pub mod display;
pub mod error;
pub mod frame;
pub mod keys;

pub use checksum::{checksum, verify, Checksum};
pub use command::{Command, ReplyKind};
pub use decoder::{hex, printable, DecodedFrame, FrameOrigin};
pub use display::{pad_line, DisplayLayout, ScreenFlags, ScreenOp, LINE_WIDTH};
pub use error::{is_no_data, ChecksumError, ParseError, ProtocolAnomaly};
pub use frame::Frame;
pub use keys::{KeyReport, KEY_ALPHABET};

/// Marker byte that starts every frame sent by the bus master.
pub const MASTER_MARKER: u8 = 0x10;

/// Marker byte that starts every reply sent back to the panel.
pub const SLAVE_MARKER: u8 = 0x11;

/// Prefix used for keypad-internal prox readers, ignored by the analysis tools.
pub const PROX_READER_MARKER: u8 = 0x90;
