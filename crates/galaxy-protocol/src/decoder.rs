//! Best-effort frame descriptions
//!
//! Captured traffic is reassembled purely from timing, so a "frame" handed to
//! the decoder may be garbage, a partial frame, or two frames glued together.
//! The decoder never fails: it reports what it can recognise and falls back to
//! raw bytes for the rest.

use std::fmt;

use tracing::trace;

use crate::checksum::verify;
use crate::error::ChecksumError;
use crate::keys::KeyReport;
use crate::{Command, ReplyKind, MASTER_MARKER, SLAVE_MARKER};

/// Who sent a frame, judged from its marker byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// Bus master, addressed to the keypad
    Master,
    /// Keypad reply, addressed to the panel
    Slave,
    /// Unrecognised marker
    Other(u8),
}

impl FrameOrigin {
    /// Origin for a marker byte
    pub fn from_marker(marker: u8) -> Self {
        match marker {
            MASTER_MARKER => FrameOrigin::Master,
            SLAVE_MARKER => FrameOrigin::Slave,
            x => FrameOrigin::Other(x),
        }
    }
}

// The marker is really the recipient address, so frames are shown by who
// they were sent to.
impl fmt::Display for FrameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameOrigin::Master => write!(f, "Keypad"),
            FrameOrigin::Slave => write!(f, "Panel"),
            FrameOrigin::Other(x) => write!(f, "??? {:02X}", x),
        }
    }
}

/// Human-oriented view of a captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Recipient judged from the marker byte
    pub origin: FrameOrigin,
    /// Short label for the command
    pub label: String,
    /// Description of the payload
    pub description: String,
    /// Result of checking the trailing checksum
    pub checksum: Result<(), ChecksumError>,
}

impl DecodedFrame {
    /// Decode a captured frame, returning `None` when it is too short to
    /// hold a marker, command and checksum
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let origin = FrameOrigin::from_marker(data[0]);
        let checksum = verify(data);
        if let Err(e) = checksum {
            trace!("captured frame {:02X?} unverified: {}", data, e);
        }
        let payload = &data[2..data.len() - 1];

        // Unverified frames and frames for unknown recipients are not
        // interpreted; the command tables only hold for keypad and panel.
        let (label, description) = match (checksum, origin) {
            (Ok(()), FrameOrigin::Slave) => describe_reply(data[1], payload),
            (Ok(()), FrameOrigin::Master) => describe_command(data[1], payload),
            _ => (format!("# {:02X}", data[1]), hex(payload)),
        };

        Some(Self {
            origin,
            label,
            description,
            checksum,
        })
    }
}

impl fmt::Display for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.checksum.is_ok() { '✓' } else { '⨯' };
        write!(
            f,
            "> {:<8} {:<6} {} {}",
            self.origin.to_string(),
            self.label,
            mark,
            self.description
        )
    }
}

fn describe_command(code: u8, payload: &[u8]) -> (String, String) {
    let command = Command::from(code);
    let description = match command {
        Command::Initialise => "INIT".to_string(),
        Command::Poll => format!("POLL {}", hex(payload)),
        Command::Backlight => match payload {
            [0x00] => "BACKLIGHT OFF".to_string(),
            [0x01] => "BACKLIGHT ON".to_string(),
            _ => format!("UNKNOWN BACKLIGHT OPERATION {}", hex(payload)),
        },
        Command::Beeper => match payload {
            [0x00, ..] => "BEEPER OFF".to_string(),
            [0x01, ..] => "BEEPER ON".to_string(),
            [0x03, on, off] => format!(
                "BEEPER INTERMITTENT on={}ms off={}ms",
                *on as u32 * 100,
                *off as u32 * 100
            ),
            _ => format!("BEEPER {}", hex(payload)),
        },
        Command::KeyAck => format!("KEY ACK {}", hex(payload)),
        Command::Screen => format!("SCREEN {}", printable(payload)),
        Command::OpaqueC0 => "CURRENTLY UNKNOWN COMMAND C0".to_string(),
        Command::Ping | Command::Other(_) => hex(payload),
    };

    let label = match command {
        Command::Other(x) => format!("# {:02X}", x),
        c => c.label().to_string(),
    };

    (label, description)
}

fn describe_reply(code: u8, payload: &[u8]) -> (String, String) {
    match ReplyKind::from(code) {
        ReplyKind::Initialised => ("INIT".to_string(), format!("INIT OK {}", hex(payload))),
        ReplyKind::Ack => ("OK".to_string(), "OK".to_string()),
        ReplyKind::AckWithKey => {
            let description = match payload {
                [report] => format!("OK {}", KeyReport::decode(*report)),
                _ => format!("OK KEY ? {}", hex(payload)),
            };
            ("OK KEY".to_string(), description)
        }
        ReplyKind::BadChecksum => ("BADCHK".to_string(), "BAD CHK".to_string()),
        ReplyKind::Unknown(x) => (format!("# {:02X}", x), hex(payload)),
    }
}

/// Space-separated upper-case hex
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printable ASCII kept, everything else shown as `.`
pub fn printable(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
