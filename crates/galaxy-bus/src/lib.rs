//! Galaxy Keypad Bus Master
//!
//! Emulates the panel side of the keypad bus:
//!
//! - **Transport**: any async byte stream, with a serial port opener
//! - **Bus**: locked write-then-drain exchanges with a fixed reply window
//! - **State**: display lines, ack alternation, tamper and last key
//! - **Master**: handshake and the poll/ack/display cycle
//! - **Clock**: once-a-second display text through a single-slot handoff
//!
//! # Example
//!
//! ```rust,no_run
//! use galaxy_bus::{display_channel, open_serial, run_clock, Bus, BusMaster, BusTiming};
//!
//! # async fn run() -> Result<(), galaxy_bus::BusError> {
//! let port = open_serial("/dev/ttyUSB0", 9600)?;
//! let (display_tx, display_rx) = display_channel();
//!
//! tokio::spawn(run_clock(display_tx));
//! BusMaster::new(Bus::new(port, BusTiming::default()), display_rx)
//!     .run()
//!     .await
//! # }
//! ```

pub mod bus;
pub mod clock;
pub mod error;
pub mod master;
pub mod state;
pub mod transport;

pub use bus::{Bus, BusTiming};
pub use clock::{display_channel, format_clock, run_clock, ScreenText};
pub use error::BusError;
pub use master::{handshake_frames, inspect_reply, poll_frame, BusMaster};
pub use state::{KeypadState, ScreenUpdate, KEY_OVERLAY};
pub use transport::{open_serial, BusTransport};
