//! Galaxy bus checksum
//!
//! Every frame ends with a single checksum byte. The checksum is the sum of
//! all preceding bytes plus a seed of `0xAA`, folded down to one byte by
//! repeatedly adding the carry back into the low byte:
//!
//! ```text
//! while sum > 0xFF { sum = (sum >> 8) + (sum & 0xFF) }
//! ```

use crate::error::ChecksumError;

/// Seed value the running sum starts from.
pub const SEED: u32 = 0xAA;

/// Running checksum over an arbitrary byte sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    acc: u32,
}

impl Checksum {
    /// Create a checksum holding only the seed
    pub fn new() -> Self {
        Self { acc: SEED }
    }

    /// Add bytes to the running sum
    pub fn write(&mut self, data: &[u8]) {
        for &b in data {
            // Fold eagerly so arbitrarily long inputs cannot overflow. Folding
            // early does not change the final folded value.
            self.acc = fold(self.acc + b as u32);
        }
    }

    /// Folded single-byte checksum of everything written so far
    pub fn sum(&self) -> u8 {
        fold(self.acc) as u8
    }

    /// Restore the seed
    pub fn reset(&mut self) {
        self.acc = SEED;
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

fn fold(mut v: u32) -> u32 {
    while v > 0xFF {
        v = (v >> 8) + (v & 0xFF);
    }
    v
}

/// Checksum of a complete frame body (everything before the checksum byte)
pub fn checksum(body: &[u8]) -> u8 {
    let mut c = Checksum::new();
    c.write(body);
    c.sum()
}

/// Verify the trailing checksum byte of a complete frame
pub fn verify(frame: &[u8]) -> Result<(), ChecksumError> {
    let (&actual, body) = frame.split_last().ok_or(ChecksumError::Missing)?;
    let expected = checksum(body);

    if actual == expected {
        Ok(())
    } else {
        Err(ChecksumError::Mismatch { expected, actual })
    }
}
