//! Virtual keypad actor task
//!
//! Owns a [`VirtualKeypad`] and serves it over an async stream. The task
//! uses a select! loop to:
//! - Read master frames from the stream and answer them
//! - Apply key presses and tamper changes from a command channel
//! - Publish every received frame on a broadcast channel

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::VirtualKeypad;

/// Commands that can be sent to a virtual keypad task
#[derive(Debug, Clone)]
pub enum VirtualKeypadCommand {
    /// Press a key
    Press(char),
    /// Open or close the tamper switch
    SetTamper(bool),
    /// Shutdown the task
    Shutdown,
}

/// Run the virtual keypad task
///
/// Each read from the stream is treated as one frame; the master writes a
/// whole frame and then waits for the reply, so frames do not run together.
/// Returns the keypad when the stream closes or shutdown is requested.
pub async fn run_virtual_keypad_task<S>(
    mut stream: S,
    mut keypad: VirtualKeypad,
    mut cmd_rx: mpsc::Receiver<VirtualKeypadCommand>,
    frame_tx: broadcast::Sender<Vec<u8>>,
) -> io::Result<VirtualKeypad>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 256];
    info!("Starting virtual keypad task");

    loop {
        tokio::select! {
            // Key presses land before the frame they race with
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualKeypadCommand::Press(key)) => {
                        if let Err(e) = keypad.press(key) {
                            warn!("Virtual keypad: {}", e);
                        }
                    }
                    Some(VirtualKeypadCommand::SetTamper(on)) => keypad.set_tamper(on),
                    Some(VirtualKeypadCommand::Shutdown) | None => {
                        info!("Shutdown requested for virtual keypad");
                        break;
                    }
                }
            }

            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual keypad stream closed");
                        break;
                    }
                    Ok(n) => {
                        let data = &buf[..n];
                        debug!("Virtual keypad received {:02X?}", data);
                        let _ = frame_tx.send(data.to_vec());

                        if let Some(reply) = keypad.process(data) {
                            stream.write_all(&reply).await?;
                            stream.flush().await?;
                        }
                    }
                    Err(e) => {
                        warn!("Virtual keypad stream error: {}", e);
                        return Err(e);
                    }
                }
            }
        }
    }

    Ok(keypad)
}
