//! Relay packet and its byte frame.
//!
//! ```text
//! 0       4          5         5+N        6+N
//! +-------+----------+---------+----------+
//! | id LE | cmd|flag | body    | checksum |
//! +-------+----------+---------+----------+
//! ```
//!
//! When bit 7 of the command byte is set the body is UTF-8 error text,
//! otherwise it is an opaque payload. A packet is one or the other, never both.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};

use crate::core::command::{command_name, Command, COMMAND_MASK, ERROR_FLAG};
use crate::error::{ProtocolError, Result};

/// Id plus command byte.
pub const HEADER_SIZE: usize = 5;

pub const CHECKSUM_SIZE: usize = 1;

/// Smallest frame that holds a header and a checksum (empty body).
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Body of a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Data body, error flag clear. An absent payload is an empty one.
    Payload(Bytes),
    /// Application error reported by the peer, error flag set.
    Error(String),
}

impl Default for Body {
    fn default() -> Self {
        Body::Payload(Bytes::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    /// Correlation id, 0 when uncorrelated
    pub id: u32,
    /// Logical command, 7 bits
    pub command: u8,
    pub body: Body,
}

impl Packet {
    /// Empty data packet for `command` with no correlation id.
    pub fn new(command: Command) -> Self {
        Self {
            id: 0,
            command: command.code(),
            body: Body::default(),
        }
    }

    pub fn with_payload(command: Command, payload: impl Into<Bytes>) -> Self {
        Self {
            id: 0,
            command: command.code(),
            body: Body::Payload(payload.into()),
        }
    }

    pub fn with_error(command: Command, error: impl Into<String>) -> Self {
        Self {
            id: 0,
            command: command.code(),
            body: Body::Error(error.into()),
        }
    }

    /// Set the correlation id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    /// The packet handed to a message handler when an inbound frame cannot
    /// be decoded: no correlation id, command `None`, and the failure as
    /// error text.
    pub fn malformed(err: &ProtocolError) -> Self {
        Self::with_error(Command::None, err.malformed_text())
    }

    /// Registry command, or `None` for reserved codes.
    pub fn command(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    pub fn command_name(&self) -> String {
        command_name(self.command)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, Body::Error(_))
    }

    pub fn payload(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Payload(payload) => Some(payload),
            Body::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.body {
            Body::Error(error) => Some(error),
            Body::Payload(_) => None,
        }
    }

    /// Payload as text, lossily decoded.
    pub fn payload_text(&self) -> Option<Cow<'_, str>> {
        self.payload().map(|p| String::from_utf8_lossy(p))
    }

    fn body_bytes(&self) -> &[u8] {
        match &self.body {
            Body::Payload(payload) => payload,
            Body::Error(error) => error.as_bytes(),
        }
    }

    /// Size of the encoded frame.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.body_bytes().len() + CHECKSUM_SIZE
    }

    /// Append the encoded frame to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        let body = self.body_bytes();
        dst.reserve(self.frame_len());

        let start = dst.len();
        dst.put_u32_le(self.id);

        let mut command = self.command & COMMAND_MASK;
        if self.is_error() {
            command |= ERROR_FLAG;
        }
        dst.put_u8(command);
        dst.extend_from_slice(body);

        let sum = checksum(&dst[start..]);
        dst.put_u8(sum);
    }

    /// Encode the packet into a frame. Never fails.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.frame_len());
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// Standard base64 of the frame, for text-only transports.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decode a frame, verifying its checksum.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::decode(data, true)
    }

    /// Decode a frame. The trailing checksum byte is always stripped and
    /// only checked when `verify` is set.
    pub fn decode(data: &[u8], verify: bool) -> Result<Self> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(ProtocolError::MalformedPacket);
        }

        let (frame, sum) = data.split_at(data.len() - CHECKSUM_SIZE);
        if verify {
            let expected = checksum(frame);
            if expected != sum[0] {
                return Err(ProtocolError::ChecksumMismatch {
                    expected,
                    actual: sum[0],
                });
            }
        }

        let id = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let command = frame[4];
        let body = &frame[HEADER_SIZE..];

        let body = if command & ERROR_FLAG != 0 {
            Body::Error(String::from_utf8_lossy(body).into_owned())
        } else {
            Body::Payload(Bytes::copy_from_slice(body))
        };

        Ok(Self {
            id,
            command: command & COMMAND_MASK,
            body,
        })
    }

    /// Reverse of [`Packet::to_base64`].
    pub fn from_base64(text: &str, verify: bool) -> Result<Self> {
        let data = STANDARD.decode(text.trim())?;
        Self::decode(&data, verify)
    }
}

/// Sum of `data` modulo 256.
#[inline]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// True when the last byte of `frame` is the checksum of the rest.
pub fn verify_checksum(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((sum, rest)) => checksum(rest) == *sum,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let packet = Packet::with_payload(Command::ConnectTo, &b"ab"[..]).with_id(0x0403_0201);
        let bytes = packet.to_bytes();

        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(bytes[4], 3);
        assert_eq!(&bytes[5..7], b"ab");

        let sum = (1u32 + 2 + 3 + 4 + 3 + b'a' as u32 + b'b' as u32) % 256;
        assert_eq!(bytes[7] as u32, sum);
    }

    #[test]
    fn test_error_flag_set_on_error_body() {
        let packet = Packet::with_error(Command::SendTo, "timeout").with_id(7);
        let bytes = packet.to_bytes();
        assert_eq!(bytes[4], 0x85);

        let decoded = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.command, 5);
        assert_eq!(decoded.error(), Some("timeout"));
        assert!(decoded.payload().is_none());
    }

    #[test]
    fn test_empty_packet_is_six_bytes() {
        let bytes = Packet::new(Command::Connect).to_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_command_is_masked_on_encode() {
        let packet = Packet {
            id: 0,
            command: 0xFF,
            body: Body::default(),
        };
        let bytes = packet.to_bytes();
        assert_eq!(bytes[4], 0x7F);
    }

    #[test]
    fn test_decode_rejects_short_frames() {
        for len in 0..MIN_FRAME_SIZE {
            let data = vec![0u8; len];
            assert!(matches!(
                Packet::decode(&data, false),
                Err(ProtocolError::MalformedPacket)
            ));
        }
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = Packet::with_payload(Command::Stream, "a,b").to_bytes();
        let last = bytes.len() - 1;
        bytes[last] = bytes[last].wrapping_add(1);

        match Packet::from_bytes(&bytes) {
            Err(ProtocolError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected.wrapping_add(1), actual);
            }
            other => panic!("Unexpected result: {other:?}"),
        }

        // Verification off keeps the frame
        let decoded = Packet::decode(&bytes, false).unwrap();
        assert_eq!(decoded.payload_text().unwrap(), "a,b");
    }

    #[test]
    fn test_base64_roundtrip() {
        let packet = Packet::with_payload(Command::SendTo, "peer,cmd,data").with_id(3);
        let text = packet.to_base64();
        assert_eq!(Packet::from_base64(&text, true).unwrap(), packet);
    }

    #[test]
    fn test_base64_invalid() {
        assert!(matches!(
            Packet::from_base64("!!not base64!!", true),
            Err(ProtocolError::Base64(_))
        ));
    }

    #[test]
    fn test_malformed_packet() {
        let packet = Packet::malformed(&ProtocolError::MalformedPacket);
        assert_eq!(packet.id, 0);
        assert_eq!(packet.command(), Some(Command::None));
        assert_eq!(packet.error(), Some("packet too short"));
    }

    #[test]
    fn test_verify_checksum() {
        let bytes = Packet::with_payload(Command::ConnectTo, "peer").to_bytes();
        assert!(verify_checksum(&bytes));

        let mut corrupted = bytes.clone();
        corrupted[5] ^= 0x01;
        assert!(!verify_checksum(&corrupted));
        assert!(!verify_checksum(&[]));
    }
}
