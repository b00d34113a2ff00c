//! Locked send-and-drain over a half-duplex bus
//!
//! Every exchange on the bus is a write followed by a fixed reception window.
//! The whole exchange runs under one lock so no other frame can be put on the
//! wire while a reply may still be arriving.
//!
//! ```text
//! write ──► wait (len+1)·10 bits ──► read until window expires ──► discard stray input
//! ```

use std::time::Duration;

use galaxy_protocol::{is_no_data, Frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};
use tracing::trace;

use crate::error::BusError;
use crate::transport::BusTransport;

/// Bits on the wire per byte at 8N1
const BITS_PER_BYTE: u64 = 10;

/// Pause after a read that returned nothing, so an idle stream is not spun on
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Timing parameters for bus exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    /// Line speed used to work out transmission time
    pub baud_rate: u32,
    /// How long to collect reply bytes after transmission has finished
    pub reply_window: Duration,
    /// Upper bound on a single read inside the window
    pub read_timeout: Duration,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            reply_window: Duration::from_millis(100),
            read_timeout: Duration::from_millis(10),
        }
    }
}

impl BusTiming {
    /// Time to clock `len` bytes onto the wire, plus one byte of margin
    pub fn transmission_time(&self, len: usize) -> Duration {
        let bits = (len as u64 + 1) * BITS_PER_BYTE;
        let baud = u64::from(self.baud_rate.max(1));
        Duration::from_micros(bits * 1_000_000 / baud)
    }
}

/// Exclusive owner of the bus transport
pub struct Bus<T> {
    io: Mutex<T>,
    timing: BusTiming,
}

impl<T: BusTransport> Bus<T> {
    /// Wrap a transport
    pub fn new(io: T, timing: BusTiming) -> Self {
        Self {
            io: Mutex::new(io),
            timing,
        }
    }

    /// Timing this bus was created with
    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Encode and send a frame, returning whatever came back in the window
    pub async fn send_frame(&self, frame: &Frame) -> Result<Vec<u8>, BusError> {
        self.send(&frame.encode()).await
    }

    /// Send raw bytes and collect the reply
    ///
    /// An empty reply is not an error; the keypad may simply not have
    /// answered. Any transport failure other than "no data yet" is.
    pub async fn send(&self, frame: &[u8]) -> Result<Vec<u8>, BusError> {
        let mut io = self.io.lock().await;

        trace!("> {:02X?}", frame);
        io.write_all(frame).await?;
        io.flush().await?;

        sleep(self.timing.transmission_time(frame.len())).await;

        let deadline = Instant::now() + self.timing.reply_window;
        let mut reply = Vec::new();
        let mut buf = [0u8; 128];

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = self.timing.read_timeout.min(deadline - now);

            match timeout(wait, io.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => reply.extend_from_slice(&buf[..n]),
                Ok(Ok(_)) => sleep(IDLE_BACKOFF.min(wait)).await,
                Ok(Err(e)) if is_no_data(&e) => sleep(IDLE_BACKOFF.min(wait)).await,
                Ok(Err(e)) => return Err(BusError::Transport(e)),
                Err(_) => {} // read timeout, window still open
            }
        }

        io.discard_input().await?;
        trace!("< {:02X?}", reply);

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::duplex;

    fn fast_timing() -> BusTiming {
        BusTiming {
            baud_rate: 115_200,
            reply_window: Duration::from_millis(30),
            read_timeout: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_transmission_time() {
        let timing = BusTiming::default();
        // (4 + 1) bytes * 10 bits at 9600 baud
        assert_eq!(timing.transmission_time(4), Duration::from_micros(5208));
        assert_eq!(timing.transmission_time(0), Duration::from_micros(1041));
    }

    #[test]
    fn test_zero_baud_does_not_divide_by_zero() {
        let timing = BusTiming {
            baud_rate: 0,
            ..Default::default()
        };
        assert_eq!(timing.transmission_time(0), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_send_collects_reply() {
        let (ours, mut keypad) = duplex(256);
        let bus = Bus::new(ours, fast_timing());

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = keypad.read(&mut buf).await.unwrap();
            // Reply in two pieces; both land inside the window
            keypad.write_all(&[0x11, 0xFE]).await.unwrap();
            keypad.write_all(&[0xBA]).await.unwrap();
            (buf[..n].to_vec(), keypad)
        });

        let reply = bus.send(&[0x10, 0x19, 0x01, 0xD4]).await.unwrap();
        let (seen, _keypad) = responder.await.unwrap();

        assert_eq!(seen, vec![0x10, 0x19, 0x01, 0xD4]);
        assert_eq!(reply, vec![0x11, 0xFE, 0xBA]);
    }

    #[tokio::test]
    async fn test_silence_is_empty_reply() {
        let (ours, _keypad) = duplex(256);
        let bus = Bus::new(ours, fast_timing());

        let reply = bus.send(&[0x10, 0x19, 0x01, 0xD4]).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_window_is_respected() {
        let (ours, _keypad) = duplex(256);
        let timing = fast_timing();
        let bus = Bus::new(ours, timing);

        let started = Instant::now();
        bus.send(&[0x10, 0x19, 0x01, 0xD4]).await.unwrap();

        assert!(started.elapsed() >= timing.reply_window + timing.transmission_time(4));
    }

    #[tokio::test]
    async fn test_closed_transport_is_fatal() {
        let (ours, keypad) = duplex(256);
        drop(keypad);
        let bus = Bus::new(ours, fast_timing());

        let err = bus.send(&[0x10, 0x19, 0x01, 0xD4]).await.unwrap_err();
        assert!(matches!(err, BusError::Transport(_)));
    }

    #[tokio::test]
    async fn test_exchanges_do_not_interleave() {
        let (ours, mut keypad) = duplex(256);
        let bus = Arc::new(Bus::new(ours, fast_timing()));

        // Echo the command byte back so each reply names its request
        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let mut seen = Vec::new();
            while let Ok(n) = keypad.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                seen.push(buf[..n].to_vec());
                keypad.write_all(&[0x11, buf[1]]).await.unwrap();
            }
            seen
        });

        let a = tokio::spawn({
            let bus = bus.clone();
            async move { bus.send(&[0x10, 0x19, 0x01, 0xD4]).await.unwrap() }
        });
        let b = tokio::spawn({
            let bus = bus.clone();
            async move { bus.send(&[0x10, 0x0D, 0x01, 0xC8]).await.unwrap() }
        });

        assert_eq!(a.await.unwrap(), vec![0x11, 0x19]);
        assert_eq!(b.await.unwrap(), vec![0x11, 0x0D]);

        drop(bus);
        let seen = responder.await.unwrap();
        assert_eq!(seen.len(), 2);
    }
}
