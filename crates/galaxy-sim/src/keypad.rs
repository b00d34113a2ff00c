//! Virtual keypad
//!
//! Answers master frames the way a real keypad does, as far as is known:
//! initialisation is acknowledged with the version-like `FF` reply, polls are
//! answered with a plain ack or with the oldest unacknowledged key, and a key
//! stays reported until the master acknowledges it.

use std::collections::VecDeque;

use galaxy_protocol::keys::{TAMPER_BIT, TAMPER_ONLY};
use galaxy_protocol::{
    Command, Frame, ReplyKind, ScreenFlags, KEY_ALPHABET, LINE_WIDTH, MASTER_MARKER, SLAVE_MARKER,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Opaque bytes the keypad sends back after initialisation
const INIT_REPLY: [u8; 3] = [0x08, 0x00, 0x64];

/// Errors raised by the simulator
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// The key is not on the keypad
    #[error("no such key: {0:?}")]
    UnknownKey(char),
}

/// Simulated keypad state
#[derive(Debug, Default)]
pub struct VirtualKeypad {
    pending: VecDeque<u8>,
    tamper: bool,
    initialised: bool,
    screen: Option<([u8; LINE_WIDTH], [u8; LINE_WIDTH])>,
    /// Frames received (for test verification)
    received: Vec<Vec<u8>>,
}

impl VirtualKeypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key press
    pub fn press(&mut self, key: char) -> Result<(), SimError> {
        let code = KEY_ALPHABET
            .iter()
            .position(|&k| k as char == key)
            .ok_or(SimError::UnknownKey(key))?;
        self.pending.push_back(code as u8);
        Ok(())
    }

    pub fn set_tamper(&mut self, tamper: bool) {
        self.tamper = tamper;
    }

    /// Whether an init frame has been seen
    pub fn initialised(&self) -> bool {
        self.initialised
    }

    /// Keys reported but not yet acknowledged
    pub fn pending_keys(&self) -> usize {
        self.pending.len()
    }

    /// Lines from the most recent screen frame
    pub fn screen(&self) -> Option<(&[u8; LINE_WIDTH], &[u8; LINE_WIDTH])> {
        self.screen.as_ref().map(|(a, b)| (a, b))
    }

    /// Every frame received so far, in order
    pub fn received(&self) -> &[Vec<u8>] {
        &self.received
    }

    /// Handle one frame from the master, returning the reply to send
    pub fn process(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        self.received.push(data.to_vec());

        let frame = match Frame::parse(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Virtual keypad rejecting {:02X?}: {}", data, e);
                return Some(reply(ReplyKind::BadChecksum, &[]));
            }
        };
        if frame.marker != MASTER_MARKER {
            debug!("Virtual keypad ignoring frame for 0x{:02X}", frame.marker);
            return None;
        }

        match Command::from(frame.command) {
            Command::Initialise => {
                self.initialised = true;
                return Some(reply(ReplyKind::Initialised, &INIT_REPLY));
            }
            Command::KeyAck => self.acknowledge(),
            Command::Screen => {
                self.store_screen(&frame.payload);
                if frame.payload.first().is_some_and(|f| f & ScreenFlags::KEY_ACK != 0) {
                    self.acknowledge();
                }
            }
            _ => {}
        }

        Some(self.status_reply())
    }

    fn acknowledge(&mut self) {
        if let Some(code) = self.pending.pop_front() {
            debug!("Virtual keypad key 0x{:02X} acknowledged", code);
        }
    }

    fn status_reply(&self) -> Vec<u8> {
        let tamper = if self.tamper { TAMPER_BIT } else { 0 };
        match self.pending.front() {
            Some(code) => reply(ReplyKind::AckWithKey, &[code | tamper]),
            None if self.tamper => reply(ReplyKind::AckWithKey, &[TAMPER_ONLY]),
            None => reply(ReplyKind::Ack, &[]),
        }
    }

    fn store_screen(&mut self, payload: &[u8]) {
        // flags 01 07 <line0> 02 <line1>
        if payload.len() != 4 + 2 * LINE_WIDTH {
            warn!("Virtual keypad got odd screen payload of {} bytes", payload.len());
            return;
        }
        let mut line0 = [0u8; LINE_WIDTH];
        let mut line1 = [0u8; LINE_WIDTH];
        line0.copy_from_slice(&payload[3..3 + LINE_WIDTH]);
        line1.copy_from_slice(&payload[4 + LINE_WIDTH..]);
        self.screen = Some((line0, line1));
    }
}

fn reply(kind: ReplyKind, payload: &[u8]) -> Vec<u8> {
    Frame::new(SLAVE_MARKER, kind).with_payload(payload).encode()
}
