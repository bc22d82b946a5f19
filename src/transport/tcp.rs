use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument};

use super::{Transport, TransportEvent, WireMessage};
use crate::config::{ClientConfig, WireFormat, DEFAULT_CONNECT_TIMEOUT};
use crate::core::codec::FrameCodec;
use crate::error::{ProtocolError, Result};

/// Relay link over plain TCP with length-prefixed messages.
///
/// TCP has no text/binary distinction, so inbound messages are tagged with
/// the configured wire format before they reach the session.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    address: String,
    codec: FrameCodec,
    wire_format: WireFormat,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            codec: FrameCodec::default(),
            wire_format: WireFormat::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn from_config(config: &ClientConfig, address: &str) -> Self {
        Self {
            address: address.to_string(),
            codec: FrameCodec::new(config.max_frame_size),
            wire_format: config.wire_format,
            connect_timeout: config.connect_timeout,
        }
    }

    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    fn tag(&self, frame: bytes::Bytes) -> WireMessage {
        match self.wire_format {
            WireFormat::Text => match String::from_utf8(frame.to_vec()) {
                Ok(text) => WireMessage::Text(text),
                Err(_) => WireMessage::Binary(frame),
            },
            WireFormat::Binary => WireMessage::Binary(frame),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Error = ProtocolError;

    #[instrument(skip_all, fields(address = %self.address))]
    async fn run(
        self,
        events: mpsc::UnboundedSender<TransportEvent>,
        mut outgoing: mpsc::UnboundedReceiver<WireMessage>,
    ) -> Result<()> {
        info!("Connecting to relay");

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.address.as_str()))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        stream.set_nodelay(true)?;

        info!("TCP connection established");
        if events.send(TransportEvent::Opened).is_err() {
            return Ok(());
        }

        let mut framed = Framed::new(stream, self.codec);

        loop {
            tokio::select! {
                frame = framed.next() => {
                    let frame = match frame {
                        Some(Ok(frame)) => frame,
                        Some(Err(e)) => return Err(e),
                        None => {
                            info!("Connection closed");
                            break;
                        }
                    };

                    if events.send(TransportEvent::Message(self.tag(frame))).is_err() {
                        debug!("Session gone, closing");
                        break;
                    }
                }

                out = outgoing.recv() => {
                    match out {
                        Some(message) => framed.send(message.into_bytes()).await?,
                        None => {
                            debug!("Session released the transport, closing");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
