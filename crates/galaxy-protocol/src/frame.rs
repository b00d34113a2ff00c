//! Frame assembly and parsing
//!
//! A [`Frame`] holds marker, command and payload. The checksum is never
//! stored; it is derived from the other bytes every time the frame is encoded,
//! so a frame cannot carry a checksum that disagrees with its contents.

use crate::checksum::{verify, Checksum};
use crate::error::ParseError;

/// A single bus frame without its checksum
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    /// `0x10` for master frames, `0x11` for replies
    pub marker: u8,
    /// Command code
    pub command: u8,
    /// Payload bytes, possibly empty
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with an empty payload
    pub fn new(marker: u8, command: impl Into<u8>) -> Self {
        Self {
            marker,
            command: command.into(),
            payload: Vec::new(),
        }
    }

    /// Replace the payload
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Encoded length on the wire, checksum included
    pub fn wire_len(&self) -> usize {
        self.payload.len() + 3
    }

    /// Checksum byte for this frame
    pub fn checksum(&self) -> u8 {
        let mut c = Checksum::new();
        c.write(&[self.marker, self.command]);
        c.write(&self.payload);
        c.sum()
    }

    /// Encode to wire bytes with the trailing checksum appended
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.push(self.marker);
        out.push(self.command);
        out.extend_from_slice(&self.payload);
        out.push(self.checksum());
        out
    }

    /// Parse wire bytes, verifying the trailing checksum
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let frame = Self::parse_unchecked(data)?;
        verify(data)?;
        Ok(frame)
    }

    /// Split wire bytes into a frame without checking the checksum
    ///
    /// The last byte is assumed to be the checksum and is dropped.
    pub fn parse_unchecked(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < 3 {
            return Err(ParseError::TooShort(data.len()));
        }

        Ok(Self {
            marker: data[0],
            command: data[1],
            payload: data[2..data.len() - 1].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChecksumError;
    use crate::{Command, MASTER_MARKER, SLAVE_MARKER};

    #[test]
    fn test_encode_handshake_frames() {
        let init = Frame::new(MASTER_MARKER, Command::Initialise).with_payload([0x0E]);
        assert_eq!(init.encode(), vec![0x10, 0x00, 0x0E, 0xC8]);

        let backlight = Frame::new(MASTER_MARKER, Command::Backlight).with_payload([0x01]);
        assert_eq!(backlight.encode(), vec![0x10, 0x0D, 0x01, 0xC8]);

        let ack = Frame::new(MASTER_MARKER, Command::KeyAck).with_payload([0x02]);
        assert_eq!(ack.encode(), vec![0x10, 0x0B, 0x02, 0xC7]);
    }

    #[test]
    fn test_encode_empty_payload() {
        let reply = Frame::new(SLAVE_MARKER, 0xFE);
        assert_eq!(reply.encode(), vec![0x11, 0xFE, 0xBA]);
        assert_eq!(reply.wire_len(), 3);
    }

    #[test]
    fn test_parse() {
        let frame = Frame::parse(&[0x11, 0xF4, 0x41, 0xF1]).unwrap();
        assert_eq!(frame.marker, SLAVE_MARKER);
        assert_eq!(frame.command, 0xF4);
        assert_eq!(frame.payload, vec![0x41]);
    }

    #[test]
    fn test_parse_bad_checksum() {
        assert_eq!(
            Frame::parse(&[0x11, 0xFE, 0xBB]),
            Err(ParseError::Checksum(ChecksumError::Mismatch {
                expected: 0xBA,
                actual: 0xBB
            }))
        );
        // Unchecked parsing still yields the frame
        assert_eq!(
            Frame::parse_unchecked(&[0x11, 0xFE, 0xBB]).unwrap(),
            Frame::new(SLAVE_MARKER, 0xFE)
        );
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(Frame::parse(&[0x11, 0xFE]), Err(ParseError::TooShort(2)));
    }
}
