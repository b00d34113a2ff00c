//! Bus master poll loop
//!
//! After a one-shot handshake the master runs a fixed cycle forever:
//!
//! 1. If the clock has offered new display text, render and send the screen
//! 2. If a key press is still unacknowledged, send the ack instead of a poll
//! 3. Otherwise poll and act on the reply
//!
//! Replies are checked but never trusted blindly. Anything odd is reported
//! as a [`ProtocolAnomaly`] and the cycle carries on.

use std::time::Instant;

use galaxy_protocol::{
    verify, Command, Frame, ProtocolAnomaly, ReplyKind, MASTER_MARKER, SLAVE_MARKER,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bus::Bus;
use crate::clock::ScreenText;
use crate::error::BusError;
use crate::state::KeypadState;
use crate::transport::BusTransport;

/// Init payload sent by panels; meaning unknown
const INIT_PAYLOAD: u8 = 0x0E;

/// Poll payload selecting normal key click volume
const POLL_PAYLOAD: u8 = 0x01;

const BACKLIGHT_ON: u8 = 0x01;

/// `10 19 01 D4`
pub fn poll_frame() -> Frame {
    Frame::new(MASTER_MARKER, Command::Poll).with_payload([POLL_PAYLOAD])
}

/// Frames sent once at startup, with a name for logging
pub fn handshake_frames() -> [(&'static str, Frame); 3] {
    [
        (
            "init",
            Frame::new(MASTER_MARKER, Command::Initialise).with_payload([INIT_PAYLOAD]),
        ),
        ("poll", poll_frame()),
        (
            "backlight",
            Frame::new(MASTER_MARKER, Command::Backlight).with_payload([BACKLIGHT_ON]),
        ),
    ]
}

/// Check a poll reply and classify it
///
/// Returns the reply kind when there is a command byte to act on, along with
/// every anomaly noticed on the way. A reply with a bad checksum or the wrong
/// marker is still classified.
pub fn inspect_reply(reply: &[u8]) -> (Option<ReplyKind>, Vec<ProtocolAnomaly>) {
    let mut anomalies = Vec::new();

    let kind = match reply {
        [] => {
            anomalies.push(ProtocolAnomaly::NoReply);
            return (None, anomalies);
        }
        [_] => {
            anomalies.push(ProtocolAnomaly::ShortReply(reply.len()));
            return (None, anomalies);
        }
        [marker, command, ..] => {
            if *marker != SLAVE_MARKER {
                anomalies.push(ProtocolAnomaly::UnexpectedMarker(*marker));
            }
            ReplyKind::from(*command)
        }
    };

    if let Err(error) = verify(reply) {
        anomalies.push(ProtocolAnomaly::ChecksumMismatch {
            reply: reply.to_vec(),
            error,
        });
    }

    match kind {
        ReplyKind::AckWithKey if reply.len() < 4 => {
            anomalies.push(ProtocolAnomaly::ShortReply(reply.len()));
        }
        ReplyKind::BadChecksum => anomalies.push(ProtocolAnomaly::RejectedByKeypad),
        ReplyKind::Unknown(code) => anomalies.push(ProtocolAnomaly::UnknownReply(code)),
        _ => {}
    }

    (Some(kind), anomalies)
}

/// Drives a keypad over an exclusive bus
pub struct BusMaster<T> {
    bus: Bus<T>,
    state: KeypadState,
    display_rx: watch::Receiver<ScreenText>,
}

impl<T: BusTransport> BusMaster<T> {
    /// Create a master that takes display text from `display_rx`
    pub fn new(bus: Bus<T>, display_rx: watch::Receiver<ScreenText>) -> Self {
        Self {
            bus,
            state: KeypadState::new(),
            display_rx,
        }
    }

    pub fn state(&self) -> &KeypadState {
        &self.state
    }

    /// Send the startup frames, logging whatever comes back
    pub async fn handshake(&mut self) -> Result<(), BusError> {
        for (name, frame) in handshake_frames() {
            let reply = self.bus.send_frame(&frame).await?;
            info!("Handshake {}: reply {:02X?}", name, reply);
        }
        Ok(())
    }

    /// Handshake, then poll forever
    ///
    /// Only returns on a transport error.
    pub async fn run(mut self) -> Result<(), BusError> {
        self.handshake().await?;
        info!("Handshake complete, polling");

        loop {
            self.cycle().await?;
        }
    }

    /// One pass of the poll cycle
    pub async fn cycle(&mut self) -> Result<(), BusError> {
        // A closed channel just means no more display updates
        if self.display_rx.has_changed().unwrap_or(false) {
            let text = self.display_rx.borrow_and_update().clone();
            self.state.set_lines(text.line0, text.line1);
            self.send_screen().await?;
        }

        if self.state.ack_owed() {
            return self.send_ack().await;
        }

        let reply = self.bus.send_frame(&poll_frame()).await?;
        debug!("Poll reply {:02X?}", reply);
        self.handle_poll_reply(&reply, Instant::now());

        Ok(())
    }

    /// Render and send the display
    pub async fn send_screen(&mut self) -> Result<(), BusError> {
        let update = self.state.render(Instant::now());
        let reply = self.bus.send_frame(&update.layout.to_frame()).await?;
        self.state.commit_screen(&update);

        debug!(
            "Screen sent (flags {:02X}, ack {}): reply {:02X?}",
            update.layout.flags, update.carries_ack, reply
        );
        Ok(())
    }

    async fn send_ack(&mut self) -> Result<(), BusError> {
        let frame = self.state.ack_frame();
        let reply = self.bus.send_frame(&frame).await?;
        self.state.commit_ack();

        debug!("Key ack {:02X?}: reply {:02X?}", frame.payload, reply);
        Ok(())
    }

    fn handle_poll_reply(&mut self, reply: &[u8], now: Instant) {
        let (kind, anomalies) = inspect_reply(reply);
        for anomaly in &anomalies {
            warn!("Poll reply {:02X?}: {}", reply, anomaly);
        }

        match kind {
            Some(ReplyKind::AckWithKey) if reply.len() >= 4 => {
                let report = self.state.handle_report(reply[2], now);
                info!("Keypad reports {}", report);
            }
            Some(ReplyKind::Ack) => self.state.clear_tamper(),
            Some(ReplyKind::Initialised) => {
                let version = reply.get(2..reply.len() - 1).unwrap_or_default();
                info!("Keypad reports initialised: {:02X?}", version);
            }
            _ => {}
        }
    }
}
