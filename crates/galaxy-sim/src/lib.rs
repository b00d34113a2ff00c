//! Galaxy Keypad Simulation Library
//!
//! A stand-in for keypad hardware, so the bus master can be exercised end to
//! end over an in-memory stream:
//!
//! - **VirtualKeypad**: answers master frames, queues key presses, tracks tamper
//! - **Keypad task**: serves a `VirtualKeypad` over any async stream
//!
//! # Example
//!
//! ```rust
//! use galaxy_sim::VirtualKeypad;
//!
//! let mut keypad = VirtualKeypad::new();
//! keypad.press('5').unwrap();
//!
//! // The next poll reports the key
//! let reply = keypad.process(&[0x10, 0x19, 0x01, 0xD4]).unwrap();
//! assert_eq!(&reply[..3], &[0x11, 0xF4, 0x05]);
//! ```

pub mod keypad;
pub mod keypad_task;

pub use keypad::{SimError, VirtualKeypad};
pub use keypad_task::{run_virtual_keypad_task, VirtualKeypadCommand};
