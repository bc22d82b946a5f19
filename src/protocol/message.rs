//! Outbound command packets and the comma-joined payload sub-protocol.
//!
//! `SendTo` and `Stream` carry several text fields joined with `,`. There is
//! no escaping: the relay splits on the delimiter, so only the last field of
//! a `SendTo` payload may contain it.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::command::Command;
use crate::core::packet::Packet;

/// Separator between fields of `SendTo` and `Stream` payloads.
pub const FIELD_DELIMITER: u8 = b',';

pub fn connect() -> Packet {
    Packet::new(Command::Connect)
}

pub fn disconnect() -> Packet {
    Packet::new(Command::Disconnect)
}

pub fn connect_to(name: &str) -> Packet {
    Packet::with_payload(Command::ConnectTo, Bytes::copy_from_slice(name.as_bytes()))
}

pub fn new_api_client(name: &str) -> Packet {
    Packet::with_payload(
        Command::NewApiClient,
        Bytes::copy_from_slice(name.as_bytes()),
    )
}

/// Correlated API request `"peer,command,data"`.
pub fn send_to(id: u32, peer: &str, command: &str, data: &[u8]) -> Packet {
    let request = SendToRequest {
        peer: peer.to_string(),
        command: command.to_string(),
        data: Bytes::copy_from_slice(data),
    };
    Packet::with_payload(Command::SendTo, request.to_payload()).with_id(id)
}

/// Stream subscription `"name,stream"`.
pub fn stream(name: &str, stream: &str) -> Packet {
    let request = StreamRequest {
        name: name.to_string(),
        stream: stream.to_string(),
    };
    Packet::with_payload(Command::Stream, request.to_payload())
}

/// Fields of a `SendTo` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendToRequest {
    pub peer: String,
    pub command: String,
    /// Everything after the second delimiter, byte for byte
    pub data: Bytes,
}

impl SendToRequest {
    pub fn to_payload(&self) -> Bytes {
        let mut buf =
            BytesMut::with_capacity(self.peer.len() + self.command.len() + self.data.len() + 2);
        buf.extend_from_slice(self.peer.as_bytes());
        buf.put_u8(FIELD_DELIMITER);
        buf.extend_from_slice(self.command.as_bytes());
        buf.put_u8(FIELD_DELIMITER);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    /// Split the way the relay does. `None` when fewer than three fields.
    pub fn parse(payload: &Bytes) -> Option<Self> {
        let first = payload.iter().position(|b| *b == FIELD_DELIMITER)?;
        let rest = &payload[first + 1..];
        let second = first + 1 + rest.iter().position(|b| *b == FIELD_DELIMITER)?;

        Some(Self {
            peer: String::from_utf8_lossy(&payload[..first]).into_owned(),
            command: String::from_utf8_lossy(&payload[first + 1..second]).into_owned(),
            data: payload.slice(second + 1..),
        })
    }
}

/// Fields of a `Stream` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub name: String,
    pub stream: String,
}

impl StreamRequest {
    pub fn to_payload(&self) -> Bytes {
        Bytes::from(format!("{},{}", self.name, self.stream))
    }

    /// First two fields; anything after a further delimiter is ignored.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let mut fields = payload.split(|b| *b == FIELD_DELIMITER);
        let name = fields.next()?;
        let stream = fields.next()?;

        Some(Self {
            name: String::from_utf8_lossy(name).into_owned(),
            stream: String::from_utf8_lossy(stream).into_owned(),
        })
    }
}
