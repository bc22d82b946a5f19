#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for the packet frame, stream framing and payload fields
//! Tests boundary sizes, error flag handling, reserved codes and corrupt input

use bytes::{BufMut, Bytes, BytesMut};
use teoproxy_client::core::codec::{FrameCodec, PacketCodec};
use teoproxy_client::core::command::{command_name, Command};
use teoproxy_client::core::packet::{checksum, Packet, MIN_FRAME_SIZE};
use teoproxy_client::error::ProtocolError;
use teoproxy_client::protocol::message::{SendToRequest, StreamRequest};
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// PACKET FRAME EDGE CASES
// ============================================================================

#[test]
fn test_packet_empty_payload() {
    let packet = Packet::new(Command::Connect);
    let bytes = packet.to_bytes();
    assert_eq!(bytes.len(), MIN_FRAME_SIZE);

    let decoded = Packet::from_bytes(&bytes).expect("Should decode empty payload");
    assert_eq!(decoded.payload().unwrap().len(), 0);
    assert!(!decoded.is_error());
}

#[test]
fn test_packet_five_bytes_rejected() {
    let bytes = Packet::new(Command::Connect).to_bytes();
    match Packet::from_bytes(&bytes[..5]) {
        Err(ProtocolError::MalformedPacket) => {}
        other => panic!("Expected MalformedPacket, got {other:?}"),
    }
}

#[test]
fn test_packet_every_short_length_rejected() {
    for len in 0..MIN_FRAME_SIZE {
        let data = vec![0u8; len];
        assert!(
            matches!(Packet::decode(&data, false), Err(ProtocolError::MalformedPacket)),
            "length {len} should be malformed"
        );
    }
}

#[test]
fn test_packet_max_id() {
    let packet = Packet::with_payload(Command::SendTo, "x").with_id(u32::MAX);
    let bytes = packet.to_bytes();
    assert_eq!(&bytes[..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(Packet::from_bytes(&bytes).unwrap().id, u32::MAX);
}

#[test]
fn test_packet_id_is_little_endian() {
    let bytes = Packet::new(Command::SendTo).with_id(0x0102_0304).to_bytes();
    assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn test_packet_large_payload() {
    let payload = vec![0xAB; 1024 * 1024];
    let packet = Packet::with_payload(Command::SendTo, payload.clone()).with_id(9);
    let decoded = Packet::from_bytes(&packet.to_bytes()).expect("Should decode large payload");
    assert_eq!(decoded.payload().unwrap().as_ref(), payload.as_slice());
}

#[test]
fn test_checksum_wraps() {
    // 0xFF * 2 + 0x02 = 512 = 0 mod 256
    assert_eq!(checksum(&[0xFF, 0xFF, 0x02]), 0);
    assert_eq!(checksum(&[]), 0);
}

#[test]
fn test_error_packet_with_empty_text() {
    let packet = Packet::with_error(Command::ConnectTo, "");
    let bytes = packet.to_bytes();
    assert_eq!(bytes[4], 0x83);

    let decoded = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.error(), Some(""));
    assert!(decoded.payload().is_none());
}

#[test]
fn test_error_body_invalid_utf8_is_lossy() {
    let mut frame = vec![0, 0, 0, 0, 0x85, 0xFF, 0xFE];
    frame.push(checksum(&frame));

    let decoded = Packet::from_bytes(&frame).unwrap();
    assert_eq!(decoded.command(), Some(Command::SendTo));
    assert!(decoded.error().unwrap().contains('\u{FFFD}'));
}

#[test]
fn test_reserved_command_code_survives() {
    let packet = Packet {
        id: 1,
        command: 0x42,
        ..Packet::default()
    };
    let decoded = Packet::from_bytes(&packet.to_bytes()).unwrap();
    assert_eq!(decoded.command, 0x42);
    assert!(decoded.command().is_none());
    assert_eq!(decoded.command_name(), "Unknown(66)");
    assert_eq!(command_name(5), "SendTo");
}

#[test]
fn test_command_high_bit_masked_on_encode() {
    let packet = Packet {
        command: 0x80 | Command::Stream.code(),
        ..Packet::default()
    };
    let bytes = packet.to_bytes();
    assert_eq!(bytes[4], Command::Stream.code());
}

#[test]
fn test_base64_with_surrounding_whitespace() {
    let packet = Packet::new(Command::Connect);
    let text = format!("  {}\n", packet.to_base64());
    assert_eq!(Packet::from_base64(&text, true).unwrap(), packet);
}

#[test]
fn test_base64_of_short_frame() {
    // "AAAA" decodes to three zero bytes
    assert!(matches!(
        Packet::from_base64("AAAA", true),
        Err(ProtocolError::MalformedPacket)
    ));
}

// ============================================================================
// STREAM FRAMING EDGE CASES
// ============================================================================

#[test]
fn test_frame_codec_partial_input() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::new();
    buf.put_u32(4);
    buf.extend_from_slice(b"ab");
    assert!(codec.decode(&mut buf).unwrap().is_none());

    buf.extend_from_slice(b"cd");
    assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), Bytes::from_static(b"abcd"));
    assert!(buf.is_empty());
}

#[test]
fn test_frame_codec_oversized_length_rejected() {
    let mut codec = FrameCodec::new(1024);
    let mut buf = BytesMut::new();
    buf.put_u32(2048);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::OversizedFrame(2048))
    ));

    let mut dst = BytesMut::new();
    assert!(codec.encode(Bytes::from(vec![0u8; 2048]), &mut dst).is_err());
}

#[test]
fn test_packet_codec_back_to_back() {
    let mut codec = PacketCodec::default();
    let mut buf = BytesMut::new();
    let first = Packet::with_payload(Command::ConnectTo, "peer");
    let second = Packet::with_error(Command::SendTo, "no such command").with_id(3);
    codec.encode(first.clone(), &mut buf).unwrap();
    codec.encode(second.clone(), &mut buf).unwrap();

    assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[test]
fn test_packet_codec_corrupt_frame() {
    let mut frames = FrameCodec::default();
    let mut buf = BytesMut::new();
    frames
        .encode(Bytes::from_static(&[1, 0, 0, 0, 5, 0]), &mut buf)
        .unwrap();

    let mut codec = PacketCodec::default();
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::ChecksumMismatch { expected: 6, actual: 0 })
    ));
}

// ============================================================================
// PAYLOAD FIELD EDGE CASES
// ============================================================================

#[test]
fn test_send_to_data_keeps_delimiters() {
    let payload = Bytes::from_static(b"peer,cmd,a,b,,c");
    let request = SendToRequest::parse(&payload).unwrap();
    assert_eq!(request.peer, "peer");
    assert_eq!(request.command, "cmd");
    assert_eq!(request.data, Bytes::from_static(b"a,b,,c"));
}

#[test]
fn test_send_to_missing_fields() {
    assert!(SendToRequest::parse(&Bytes::from_static(b"peer")).is_none());
    assert!(SendToRequest::parse(&Bytes::from_static(b"peer,cmd")).is_none());

    let empty = SendToRequest::parse(&Bytes::from_static(b",,")).unwrap();
    assert!(empty.peer.is_empty() && empty.command.is_empty() && empty.data.is_empty());
}

#[test]
fn test_stream_extra_fields_ignored() {
    let request = StreamRequest::parse(b"peer,news,extra").unwrap();
    assert_eq!(request.name, "peer");
    assert_eq!(request.stream, "news");
    assert!(StreamRequest::parse(b"peer").is_none());
}
