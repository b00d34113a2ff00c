//! Error and anomaly types for the Galaxy bus protocol

use std::io::{self, ErrorKind};

use thiserror::Error;

/// Whether an I/O error only means nothing has arrived yet
///
/// Serial drivers report an empty read as a timeout or as would-block
/// depending on platform; neither is a transport failure.
pub fn is_no_data(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Checksum verification failures
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumError {
    /// Frame has no bytes at all, so no checksum byte either
    #[error("frame is empty, no checksum byte")]
    Missing,

    /// Trailing byte does not match the computed checksum
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Mismatch { expected: u8, actual: u8 },
}

/// Errors that can occur while parsing a frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not enough bytes for marker, command and checksum
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// Checksum failure
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
}

/// Protocol anomalies observed on the bus
///
/// These are expected while the protocol is only partly understood. They are
/// reported and processing continues with a best-effort interpretation; none
/// of them is ever fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolAnomaly {
    /// Reply command byte with no known meaning
    #[error("unrecognised reply command 0x{0:02X}")]
    UnknownReply(u8),

    /// Reply checksum does not match its contents
    #[error("reply {reply:02X?} failed verification: {error}")]
    ChecksumMismatch {
        /// Raw reply bytes
        reply: Vec<u8>,
        /// What the verifier found
        error: ChecksumError,
    },

    /// Reply too short to carry a command byte
    #[error("short reply of {0} bytes")]
    ShortReply(usize),

    /// Reply not addressed to the panel, usually a sign of tamper
    #[error("reply addressed to 0x{0:02X}, not the panel")]
    UnexpectedMarker(u8),

    /// Keypad could not process the last frame we sent
    #[error("keypad reported a bad checksum for the last frame")]
    RejectedByKeypad,

    /// Nothing arrived within the reply window
    #[error("no reply within the reception window")]
    NoReply,
}
