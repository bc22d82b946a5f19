//! # Transport Layer
//!
//! The session never touches sockets. A transport connects, reports that it
//! is open, forwards every inbound message and writes every outbound message
//! in order. Message boundaries are the transport's job: the relay frame has
//! no length field.
//!
//! ## Implementations
//! - **WebSocket**: The relay's native transport (`tokio-tungstenite`)
//! - **TCP**: Length-prefixed frames over a plain stream
//! - **Memory**: In-process pair for tests and embedding

pub mod memory;
pub mod tcp;
pub mod websocket;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::WireFormat;
use crate::core::packet::Packet;
use crate::error::Result;

pub use memory::{MemoryPeer, MemoryTransport};
pub use tcp::TcpTransport;
pub use websocket::WebSocketTransport;

/// Outbound half held by the session: the live transport handle.
pub type Link = mpsc::UnboundedSender<WireMessage>;

/// A whole message as carried by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Bytes),
}

impl WireMessage {
    /// Render `packet` in the given wire format.
    pub fn encode(packet: &Packet, format: WireFormat) -> Self {
        match format {
            WireFormat::Text => WireMessage::Text(packet.to_base64()),
            WireFormat::Binary => WireMessage::Binary(Bytes::from(packet.to_bytes())),
        }
    }

    /// Decode according to the message kind: text is base64, binary is raw.
    pub fn decode(&self, verify_checksum: bool) -> Result<Packet> {
        match self {
            WireMessage::Text(text) => Packet::from_base64(text, verify_checksum),
            WireMessage::Binary(data) => Packet::decode(data, verify_checksum),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WireMessage::Text(text) => text.len(),
            WireMessage::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            WireMessage::Text(text) => Bytes::from(text),
            WireMessage::Binary(data) => data,
        }
    }
}

/// Notifications from a transport to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(WireMessage),
    Closed,
}

/// Message transport to the relay server.
///
/// `run` connects, sends [`TransportEvent::Opened`], then bridges both
/// channels until the remote side closes or `outgoing` is closed by the
/// session. The caller emits [`TransportEvent::Closed`] once `run` returns,
/// so implementations do not have to.
#[async_trait]
pub trait Transport: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn run(
        self,
        events: mpsc::UnboundedSender<TransportEvent>,
        outgoing: mpsc::UnboundedReceiver<WireMessage>,
    ) -> std::result::Result<(), Self::Error>;
}
