//! Stream framing for byte-stream transports.
//!
//! Relay frames carry no length of their own, they rely on a message-oriented
//! transport. Over a raw byte stream each message is prefixed with its length:
//!
//! ```text
//! [Length(4, BE)] [Message(N)]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_FRAME_SIZE;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};

const LENGTH_PREFIX: usize = 4;

/// Length-prefixed message framing.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    /// Limits above what the u32 length prefix can express are clamped.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(u32::MAX as usize),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(len));
        }

        let total = LENGTH_PREFIX + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(item.len()));
        }

        dst.reserve(LENGTH_PREFIX + item.len());
        dst.put_u32(item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

/// Packets over length-prefixed binary frames.
///
/// Handy on the relay side of a TCP link, or for tests that stand in for it.
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    frames: FrameCodec,
    verify_checksum: bool,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(FrameCodec::default(), true)
    }
}

impl PacketCodec {
    pub fn new(frames: FrameCodec, verify_checksum: bool) -> Self {
        Self {
            frames,
            verify_checksum,
        }
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.frames.decode(src)? {
            Some(frame) => Packet::decode(&frame, self.verify_checksum).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        let len = item.frame_len();
        if len > self.frames.max_frame_size() {
            return Err(ProtocolError::OversizedFrame(len));
        }

        dst.reserve(LENGTH_PREFIX + len);
        dst.put_u32(len as u32);
        item.encode_into(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::Command;

    #[test]
    fn test_max_frame_size_clamped_to_prefix() {
        assert_eq!(FrameCodec::new(usize::MAX).max_frame_size(), u32::MAX as usize);
        assert_eq!(FrameCodec::new(1024).max_frame_size(), 1024);
    }

    #[test]
    fn test_frame_roundtrip_and_split() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"first"), &mut buf).unwrap();
        codec.encode(Bytes::from_static(b"second"), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "first");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "second");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_preserves_buffer() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 10, 1, 2][..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut codec = FrameCodec::new(8);
        let mut buf = BytesMut::from(&[0u8, 0, 0, 9][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedFrame(9))
        ));

        let mut out = BytesMut::new();
        assert!(matches!(
            codec.encode(Bytes::from(vec![0u8; 9]), &mut out),
            Err(ProtocolError::OversizedFrame(9))
        ));
    }

    #[test]
    fn test_packet_codec_roundtrip() {
        let mut codec = PacketCodec::default();
        let packet = Packet::with_payload(Command::Stream, "peer,news").with_id(11);

        let mut buf = BytesMut::new();
        codec.encode(packet.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), 4 + packet.frame_len());

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, packet);
    }
}
