//! Captured messages

use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Bytes captured as one frame, stamped with when the frame started
///
/// Created at a detected frame boundary and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub data: Vec<u8>,
    pub timestamp: SystemTime,
}

impl Message {
    pub fn new(data: impl Into<Vec<u8>>, timestamp: SystemTime) -> Self {
        Self {
            data: data.into(),
            timestamp,
        }
    }
}

/// Local wall-clock time as `15:04:05.000`
pub fn format_time(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format("%H:%M:%S%.3f").to_string()
}
