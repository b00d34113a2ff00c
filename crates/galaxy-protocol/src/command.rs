//! Command and reply codes
//!
//! The second byte of every frame is a command code. Codes sent by the master
//! and codes sent back by the keypad live in separate namespaces, so they are
//! modelled as separate enums.

use std::fmt;

/// Commands sent from the bus master to a keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Bring the keypad up from its power-on state. Payload byte meaning is
    /// unknown; `0x0E` is what panels send.
    ///
    /// `10 00 0E C8`
    Initialise,
    /// General liveness ping.
    ///
    /// `10 06 01`
    Ping,
    /// Screen update. Carries flags followed by screen op codes and text.
    Screen,
    /// Acknowledge the last key press. The payload alternates between `0x00`
    /// and `0x02` to guard against replays.
    ///
    /// `10 0B 02 C7`
    KeyAck,
    /// Internal sounder: mode (`00` off, `01` on, `03` intermittent), then
    /// on and off times in tenths of a second.
    ///
    /// `10 0C 03 02 F0 BC`
    Beeper,
    /// LCD backlight, `0x01` on, `0x00` off.
    ///
    /// `10 0D 01 C8`
    Backlight,
    /// Status poll used in the steady-state cycle. Its payload also selects
    /// key click volume (`01` normal, `03` off, `05` quiet).
    ///
    /// `10 19 01 D4`
    Poll,
    /// Sent frequently by panels; purpose not yet established.
    OpaqueC0,
    /// Any other code
    Other(u8),
}

impl Command {
    /// Short fixed-width label used in traffic listings
    pub fn label(&self) -> &'static str {
        match self {
            Command::Initialise => "INIT",
            Command::Ping => "PING",
            Command::Screen => "SCRN",
            Command::KeyAck => "KACK",
            Command::Beeper => "BEEP",
            Command::Backlight => "BKLT",
            Command::Poll => "POLL",
            Command::OpaqueC0 => "C0??",
            Command::Other(_) => "????",
        }
    }
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Command::Initialise,
            0x06 => Command::Ping,
            0x07 => Command::Screen,
            0x0B => Command::KeyAck,
            0x0C => Command::Beeper,
            0x0D => Command::Backlight,
            0x19 => Command::Poll,
            0xC0 => Command::OpaqueC0,
            x => Command::Other(x),
        }
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        match value {
            Command::Initialise => 0x00,
            Command::Ping => 0x06,
            Command::Screen => 0x07,
            Command::KeyAck => 0x0B,
            Command::Beeper => 0x0C,
            Command::Backlight => 0x0D,
            Command::Poll => 0x19,
            Command::OpaqueC0 => 0xC0,
            Command::Other(x) => x,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Other(x) => write!(f, "command 0x{:02X}", x),
            c => write!(f, "{}", c.label()),
        }
    }
}

/// Classification of the command byte of a keypad reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// Keypad finished initialising. Carries three opaque bytes, possibly a
    /// firmware version; `08 00 64` is what has been observed.
    ///
    /// `11 FF 08 00 64 28`
    Initialised,
    /// Plain acknowledgement, nothing to report. Also clears tamper.
    ///
    /// `11 FE BA`
    Ack,
    /// Acknowledgement carrying a key/tamper report byte.
    ///
    /// `11 F4 41 F1`
    AckWithKey,
    /// Keypad could not process the last frame.
    BadChecksum,
    /// Anything else
    Unknown(u8),
}

impl ReplyKind {
    /// Classify a raw reply by its second byte
    ///
    /// Returns `None` when the reply is too short to have a command byte.
    pub fn classify(reply: &[u8]) -> Option<Self> {
        reply.get(1).map(|&b| Self::from(b))
    }
}

impl From<u8> for ReplyKind {
    fn from(value: u8) -> Self {
        match value {
            0xF2 => ReplyKind::BadChecksum,
            0xF4 => ReplyKind::AckWithKey,
            0xFE => ReplyKind::Ack,
            0xFF => ReplyKind::Initialised,
            x => ReplyKind::Unknown(x),
        }
    }
}

impl From<ReplyKind> for u8 {
    fn from(value: ReplyKind) -> Self {
        match value {
            ReplyKind::Initialised => 0xFF,
            ReplyKind::Ack => 0xFE,
            ReplyKind::AckWithKey => 0xF4,
            ReplyKind::BadChecksum => 0xF2,
            ReplyKind::Unknown(x) => x,
        }
    }
}
