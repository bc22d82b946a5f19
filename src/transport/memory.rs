use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::{Transport, TransportEvent, WireMessage};
use crate::config::WireFormat;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};

/// Client half of an in-process link. Opens immediately.
#[derive(Debug)]
pub struct MemoryTransport {
    to_peer: mpsc::UnboundedSender<WireMessage>,
    from_peer: mpsc::UnboundedReceiver<WireMessage>,
}

/// Relay half of an in-process link. Dropping it closes the link.
#[derive(Debug)]
pub struct MemoryPeer {
    from_client: mpsc::UnboundedReceiver<WireMessage>,
    to_client: mpsc::UnboundedSender<WireMessage>,
}

impl MemoryTransport {
    /// Create a connected transport/peer pair.
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let (to_peer, from_client) = mpsc::unbounded_channel();
        let (to_client, from_peer) = mpsc::unbounded_channel();
        (
            MemoryTransport { to_peer, from_peer },
            MemoryPeer {
                from_client,
                to_client,
            },
        )
    }
}

impl MemoryPeer {
    /// Next message written by the client, `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<WireMessage> {
        self.from_client.recv().await
    }

    /// Next message written by the client, decoded.
    pub async fn recv_packet(&mut self) -> Option<Result<Packet>> {
        self.recv().await.map(|message| message.decode(true))
    }

    /// Message already written by the client, if any.
    pub fn try_recv(&mut self) -> Option<WireMessage> {
        self.from_client.try_recv().ok()
    }

    pub fn send(&self, message: WireMessage) -> Result<()> {
        self.to_client
            .send(message)
            .map_err(|_| ProtocolError::ConnectionClosed)
    }

    pub fn send_packet(&self, packet: &Packet, format: WireFormat) -> Result<()> {
        self.send(WireMessage::encode(packet, format))
    }

    /// Close the link from the relay side.
    pub fn close(self) {}
}

#[async_trait]
impl Transport for MemoryTransport {
    type Error = ProtocolError;

    async fn run(
        mut self,
        events: mpsc::UnboundedSender<TransportEvent>,
        mut outgoing: mpsc::UnboundedReceiver<WireMessage>,
    ) -> Result<()> {
        if events.send(TransportEvent::Opened).is_err() {
            return Ok(());
        }

        loop {
            tokio::select! {
                msg = self.from_peer.recv() => {
                    let Some(msg) = msg else {
                        debug!("Memory peer closed");
                        break;
                    };
                    if events.send(TransportEvent::Message(msg)).is_err() {
                        break;
                    }
                }

                out = outgoing.recv() => {
                    let Some(out) = out else {
                        debug!("Session released the transport, closing");
                        break;
                    };
                    if self.to_peer.send(out).is_err() {
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}
