//! Keypad screen layout
//!
//! The keypad has a two-line, 16-column character display. A screen frame
//! sent by the master looks like:
//!
//! ```text
//! 10 07 [flags] 01 07 [line 0: 16 bytes] 02 [line 1: 16 bytes] [checksum]
//! ```
//!
//! `01` and `02` move the cursor to the start of the first and second line,
//! `07` hides the cursor. Both lines are always sent at full width so the
//! whole screen is overwritten.

use crate::frame::Frame;
use crate::{Command, MASTER_MARKER};

/// Display width in characters
pub const LINE_WIDTH: usize = 16;

/// Screen op codes understood inside a screen frame
pub struct ScreenOp;

impl ScreenOp {
    pub const CURSOR_FIRST_LINE: u8 = 0x01;
    pub const CURSOR_SECOND_LINE: u8 = 0x02;
    pub const CURSOR_SEEK: u8 = 0x03;
    pub const CURSOR_BLOCK: u8 = 0x06;
    pub const CURSOR_HIDDEN: u8 = 0x07;
    pub const CURSOR_UNDERLINE: u8 = 0x10;
    pub const DISPLAY_RESET: u8 = 0x17;
    pub const FLASH_DISPLAY: u8 = 0x18;
    pub const STOP_FLASHING: u8 = 0x19;
}

/// Bits of the flags byte that leads a screen frame
pub struct ScreenFlags;

impl ScreenFlags {
    /// Always set
    pub const BASE: u8 = 0x01;
    /// Set when the frame also acknowledges a key press
    pub const KEY_ACK: u8 = 0x10;
    /// Freshness toggle, flipped on every screen frame
    pub const BLINK: u8 = 0x80;
}

/// Replacement for characters the display cannot show
const UNPRINTABLE: u8 = b'?';

/// Truncate or space-pad `text` to exactly one display line
pub fn pad_line(text: &str) -> [u8; LINE_WIDTH] {
    let mut line = [b' '; LINE_WIDTH];
    for (slot, c) in line.iter_mut().zip(text.chars()) {
        *slot = if c.is_ascii() { c as u8 } else { UNPRINTABLE };
    }
    line
}

/// Fully laid out screen contents, ready to encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLayout {
    /// Leading flags byte, see [`ScreenFlags`]
    pub flags: u8,
    /// First line, exactly [`LINE_WIDTH`] bytes
    pub line0: [u8; LINE_WIDTH],
    /// Second line, exactly [`LINE_WIDTH`] bytes
    pub line1: [u8; LINE_WIDTH],
}

impl DisplayLayout {
    /// Build a screen frame for this layout
    pub fn to_frame(&self) -> Frame {
        let mut payload = Vec::with_capacity(4 + 2 * LINE_WIDTH);
        payload.push(self.flags);
        payload.push(ScreenOp::CURSOR_FIRST_LINE);
        payload.push(ScreenOp::CURSOR_HIDDEN);
        payload.extend_from_slice(&self.line0);
        payload.push(ScreenOp::CURSOR_SECOND_LINE);
        payload.extend_from_slice(&self.line1);

        Frame::new(MASTER_MARKER, Command::Screen).with_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pad_short_line() {
        assert_eq!(&pad_line("Hello World"), b"Hello World     ");
        assert_eq!(&pad_line(""), b"                ");
    }

    #[test]
    fn test_truncate_long_line() {
        assert_eq!(&pad_line("0123456789ABCDEFGHIJ"), b"0123456789ABCDEF");
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(&pad_line("café"), b"caf?            ");
    }

    #[test]
    fn test_frame_layout() {
        let layout = DisplayLayout {
            flags: 0x81,
            line0: pad_line("Hello World"),
            line1: pad_line("Testing 123"),
        };
        let wire = layout.to_frame().encode();

        assert_eq!(wire.len(), 2 + 3 + 16 + 1 + 16 + 1);
        assert_eq!(&wire[..5], &[0x10, 0x07, 0x81, 0x01, 0x07]);
        assert_eq!(&wire[5..21], b"Hello World     ");
        assert_eq!(wire[21], 0x02);
        assert_eq!(&wire[22..38], b"Testing 123     ");
        assert!(crate::verify(&wire).is_ok());
    }

    proptest! {
        #[test]
        fn lines_always_full_width(text in "\\PC{0,40}") {
            let line = pad_line(&text);
            prop_assert_eq!(line.len(), LINE_WIDTH);

            let shown = text.chars().count().min(LINE_WIDTH);
            prop_assert!(line[shown..].iter().all(|&b| b == b' '));
        }
    }
}
