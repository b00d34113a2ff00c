//! Key and tamper reports
//!
//! A keypad answers a poll with `11 F4 <report> <checksum>` when it has
//! something to say. The report byte is decoded as:
//!
//! - `0x7F`: tamper, no key
//! - otherwise bit `0x40` flags tamper alongside a key, and the low nibble
//!   indexes [`KEY_ALPHABET`]

use std::fmt;

/// Key symbols indexed by the low nibble of the report byte
pub const KEY_ALPHABET: &[u8; 16] = b"0123456789BAEX*#";

/// Report byte meaning tamper with no key press
pub const TAMPER_ONLY: u8 = 0x7F;

/// Bit set when tamper accompanies a key press
pub const TAMPER_BIT: u8 = 0x40;

/// Decoded key/tamper report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyReport {
    /// Tamper with no resolvable key
    Tamper,
    /// A key press, possibly with tamper active
    Key { key: char, tamper: bool },
}

impl KeyReport {
    /// Decode a report byte
    pub fn decode(report: u8) -> Self {
        if report == TAMPER_ONLY {
            return KeyReport::Tamper;
        }

        KeyReport::Key {
            key: key_for_code(report),
            tamper: report & TAMPER_BIT == TAMPER_BIT,
        }
    }

    /// Whether the report indicates tamper
    pub fn tamper(&self) -> bool {
        match self {
            KeyReport::Tamper => true,
            KeyReport::Key { tamper, .. } => *tamper,
        }
    }
}

impl fmt::Display for KeyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyReport::Tamper => write!(f, "TAMPER"),
            KeyReport::Key { key, tamper: true } => write!(f, "KEY {} TAMPER", key),
            KeyReport::Key { key, tamper: false } => write!(f, "KEY {}", key),
        }
    }
}

/// Key symbol for the low nibble of `code`
pub fn key_for_code(code: u8) -> char {
    KEY_ALPHABET[(code & 0x0F) as usize] as char
}
