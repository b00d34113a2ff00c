//! Keypad state owned by the bus master
//!
//! The master is the only writer. Everything that depends on the current
//! time takes it as an argument so the state stays a plain value.

use std::time::{Duration, Instant};

use galaxy_protocol::{
    pad_line, Command, DisplayLayout, Frame, KeyReport, ScreenFlags, LINE_WIDTH, MASTER_MARKER,
};

/// How long a pressed key stays visible on the display
pub const KEY_OVERLAY: Duration = Duration::from_secs(3);

/// Ack payload used for the first acknowledgement after startup
pub const INITIAL_ACK: u8 = 0x02;

/// Bit toggled between successive acknowledgements
const ACK_TOGGLE: u8 = 0x02;

/// Character shown in the last column of line 1 while tamper is active
const TAMPER_MARK: u8 = b'T';

/// A screen frame ready to send, and whether it acknowledges a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenUpdate {
    pub layout: DisplayLayout,
    pub carries_ack: bool,
}

/// What the master knows about the keypad
#[derive(Debug, Clone)]
pub struct KeypadState {
    line0: String,
    line1: String,
    ack: u8,
    ack_owed: bool,
    tamper: bool,
    last_key: Option<(char, Instant)>,
    blink: u8,
}

impl Default for KeypadState {
    fn default() -> Self {
        Self {
            line0: "Hello World".to_string(),
            line1: "Testing 123".to_string(),
            ack: INITIAL_ACK,
            ack_owed: false,
            tamper: false,
            last_key: None,
            blink: ScreenFlags::BLINK,
        }
    }
}

impl KeypadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both display lines
    pub fn set_lines(&mut self, line0: impl Into<String>, line1: impl Into<String>) {
        self.line0 = line0.into();
        self.line1 = line1.into();
    }

    pub fn lines(&self) -> (&str, &str) {
        (&self.line0, &self.line1)
    }

    /// Payload of the next acknowledgement
    pub fn ack_flag(&self) -> u8 {
        self.ack
    }

    /// Whether a key press is waiting to be acknowledged
    pub fn ack_owed(&self) -> bool {
        self.ack_owed
    }

    pub fn tamper(&self) -> bool {
        self.tamper
    }

    /// Most recent key, if any has been pressed
    pub fn last_key(&self) -> Option<char> {
        self.last_key.map(|(key, _)| key)
    }

    /// Apply a key/tamper report byte from an `F4` reply
    ///
    /// A pure tamper report leaves the last key and the ack debt alone; a key
    /// report replaces the tamper state with its own tamper bit.
    pub fn handle_report(&mut self, report: u8, now: Instant) -> KeyReport {
        let decoded = KeyReport::decode(report);
        match decoded {
            KeyReport::Tamper => self.tamper = true,
            KeyReport::Key { key, tamper } => {
                self.tamper = tamper;
                self.last_key = Some((key, now));
                self.ack_owed = true;
            }
        }
        decoded
    }

    /// Plain ack from the keypad, tamper has gone away
    pub fn clear_tamper(&mut self) {
        self.tamper = false;
    }

    /// Standalone acknowledgement frame, `10 0B <ack>`
    pub fn ack_frame(&self) -> Frame {
        Frame::new(MASTER_MARKER, Command::KeyAck).with_payload([self.ack])
    }

    /// Record that an acknowledgement has gone out on the wire
    pub fn commit_ack(&mut self) {
        self.ack ^= ACK_TOGGLE;
        self.ack_owed = false;
    }

    /// Lay out the display for the current state
    ///
    /// Nothing changes until [`KeypadState::commit_screen`] is called with
    /// the result after the frame has been sent.
    pub fn render(&self, now: Instant) -> ScreenUpdate {
        let mut flags = ScreenFlags::BASE | self.blink;
        if self.ack_owed {
            flags |= ScreenFlags::KEY_ACK | self.ack;
        }

        let mut line0 = pad_line(&self.line0);
        if let Some((key, at)) = self.last_key {
            if now.saturating_duration_since(at) <= KEY_OVERLAY {
                line0[LINE_WIDTH - 1] = key as u8;
            }
        }

        let mut line1 = pad_line(&self.line1);
        if self.tamper {
            line1[LINE_WIDTH - 1] = TAMPER_MARK;
        }

        ScreenUpdate {
            layout: DisplayLayout {
                flags,
                line0,
                line1,
            },
            carries_ack: self.ack_owed,
        }
    }

    /// Record that a rendered screen has gone out on the wire
    pub fn commit_screen(&mut self, update: &ScreenUpdate) {
        self.blink ^= ScreenFlags::BLINK;
        if update.carries_ack {
            self.commit_ack();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let state = KeypadState::new();
        let update = state.render(Instant::now());

        assert_eq!(state.lines(), ("Hello World", "Testing 123"));
        assert_eq!(update.layout.flags, 0x81);
        assert_eq!(&update.layout.line0, b"Hello World     ");
        assert_eq!(&update.layout.line1, b"Testing 123     ");
        assert!(!update.carries_ack);
    }

    #[test]
    fn test_key_overlay_boundary() {
        let mut state = KeypadState::new();
        let pressed = Instant::now();
        state.handle_report(0x05, pressed);

        let at_limit = state.render(pressed + Duration::from_millis(3000));
        assert_eq!(at_limit.layout.line0[15], b'5');

        let past_limit = state.render(pressed + Duration::from_millis(3001));
        assert_eq!(past_limit.layout.line0[15], b' ');
    }

    #[test]
    fn test_tamper_overlay() {
        let mut state = KeypadState::new();
        state.handle_report(0x7F, Instant::now());

        assert!(state.tamper());
        assert!(!state.ack_owed());
        assert_eq!(state.last_key(), None);
        assert_eq!(state.render(Instant::now()).layout.line1[15], b'T');

        state.clear_tamper();
        assert_eq!(state.render(Instant::now()).layout.line1[15], b' ');
    }

    #[test]
    fn test_key_with_tamper_sets_both() {
        let mut state = KeypadState::new();
        let now = Instant::now();
        state.handle_report(0x4E, now);

        assert!(state.tamper());
        assert!(state.ack_owed());
        assert_eq!(state.last_key(), Some('*'));

        let update = state.render(now);
        assert_eq!(update.layout.line0[15], b'*');
        assert_eq!(update.layout.line1[15], b'T');
    }

    #[test]
    fn test_key_report_replaces_tamper() {
        let mut state = KeypadState::new();
        state.handle_report(0x7F, Instant::now());
        state.handle_report(0x01, Instant::now());
        assert!(!state.tamper());
    }

    #[test]
    fn test_ack_alternates() {
        let mut state = KeypadState::new();
        let now = Instant::now();

        let mut sent = Vec::new();
        for _ in 0..4 {
            state.handle_report(0x01, now);
            sent.push(state.ack_frame().encode());
            state.commit_ack();
            assert!(!state.ack_owed());
        }

        assert_eq!(sent[0], vec![0x10, 0x0B, 0x02, 0xC7]);
        assert_eq!(sent[1][2], 0x00);
        assert_eq!(sent[2], sent[0]);
        assert_eq!(sent[3], sent[1]);
    }

    #[test]
    fn test_render_does_not_commit() {
        let mut state = KeypadState::new();
        state.handle_report(0x01, Instant::now());

        let first = state.render(Instant::now());
        let again = state.render(Instant::now());
        assert_eq!(first, again);
        assert!(state.ack_owed());
        assert_eq!(state.ack_flag(), INITIAL_ACK);
    }

    #[test]
    fn test_screen_carries_ack() {
        let mut state = KeypadState::new();
        state.handle_report(0x01, Instant::now());

        let update = state.render(Instant::now());
        assert!(update.carries_ack);
        assert_eq!(update.layout.flags, 0x01 | 0x80 | 0x10 | 0x02);

        state.commit_screen(&update);
        assert!(!state.ack_owed());
        assert_eq!(state.ack_flag(), 0x00);

        // Blink flipped, no ack bits this time
        assert_eq!(state.render(Instant::now()).layout.flags, 0x01);
    }

    #[test]
    fn test_blink_toggles_per_screen() {
        let mut state = KeypadState::new();
        let mut flags = Vec::new();
        for _ in 0..4 {
            let update = state.render(Instant::now());
            flags.push(update.layout.flags);
            state.commit_screen(&update);
        }
        assert_eq!(flags, vec![0x81, 0x01, 0x81, 0x01]);
    }

    proptest! {
        #[test]
        fn ack_flag_alternates_regardless_of_polls(polls in proptest::collection::vec(0usize..5, 1..10)) {
            let mut state = KeypadState::new();
            let now = Instant::now();
            let mut expected = INITIAL_ACK;

            for idle in polls {
                // Plain acks in between do not touch the flag
                for _ in 0..idle {
                    state.clear_tamper();
                }
                state.handle_report(0x03, now);
                prop_assert_eq!(state.ack_flag(), expected);
                state.commit_ack();
                expected ^= 0x02;
            }
        }
    }
}
