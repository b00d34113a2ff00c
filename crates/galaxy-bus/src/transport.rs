//! Byte transports the bus master can drive
//!
//! Anything that is `AsyncRead + AsyncWrite` can carry the bus. The only
//! extra capability needed is throwing away input that arrives after a reply
//! window has closed, which a real serial port can do in the driver and an
//! in-memory stream has to do by reading until nothing is left.

use std::future::Future;
use std::io;
use std::time::Duration;

use galaxy_protocol::is_no_data;
use serialport::{ClearBuffer, SerialPort};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, trace};

use crate::error::BusError;

/// A half-duplex byte stream the bus master has exclusive use of
pub trait BusTransport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Drop any input already received but not yet read
    fn discard_input(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        drain(self)
    }
}

impl BusTransport for SerialStream {
    async fn discard_input(&mut self) -> io::Result<()> {
        SerialPort::clear(self, ClearBuffer::Input).map_err(io::Error::from)
    }
}

impl BusTransport for DuplexStream {}

/// Read and discard until a read would block
async fn drain<T>(io: &mut T) -> io::Result<()>
where
    T: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; 256];
    loop {
        // A zero timeout still polls the read once before giving up.
        match tokio::time::timeout(Duration::ZERO, io.read(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => return Ok(()),
            Ok(Ok(n)) => trace!("discarded {:02X?}", &buf[..n]),
            Ok(Err(e)) if is_no_data(&e) => return Ok(()),
            Ok(Err(e)) => return Err(e),
        }
    }
}

/// Open a serial port for the bus, 8N1 at `baud_rate`
pub fn open_serial(port: &str, baud_rate: u32) -> Result<SerialStream, BusError> {
    debug!("Opening {} at {} baud", port, baud_rate);
    tokio_serial::new(port, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .open_native_async()
        .map_err(|source| BusError::Open {
            port: port.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_duplex_discard_drops_pending_input() {
        let (mut ours, mut theirs) = tokio::io::duplex(64);
        theirs.write_all(&[0x11, 0xFE, 0xBA]).await.unwrap();

        ours.discard_input().await.unwrap();

        theirs.write_all(&[0x42]).await.unwrap();
        let mut buf = [0u8; 8];
        let n = ours.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x42]);
    }

    #[tokio::test]
    async fn test_discard_on_idle_stream_returns() {
        let (mut ours, _theirs) = tokio::io::duplex(64);
        ours.discard_input().await.unwrap();
    }
}
