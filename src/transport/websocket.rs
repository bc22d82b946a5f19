use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, instrument};

use super::{Transport, TransportEvent, WireMessage};
use crate::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT};
use crate::error::{ProtocolError, Result};

/// WebSocket connection to the relay's `/ws` endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Transport for the relay at `address`, with URL and timeout taken from `config`.
    pub fn from_config(config: &ClientConfig, address: &str) -> Self {
        Self::new(config.url_for(address)).with_connect_timeout(config.connect_timeout)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Error = ProtocolError;

    #[instrument(skip_all, fields(url = %self.url))]
    async fn run(
        self,
        events: mpsc::UnboundedSender<TransportEvent>,
        mut outgoing: mpsc::UnboundedReceiver<WireMessage>,
    ) -> Result<()> {
        info!("Connecting to relay");

        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ProtocolError::Timeout)?
            .map_err(|e| ProtocolError::TransportError(e.to_string()))?;

        info!("WebSocket connection established");
        if events.send(TransportEvent::Opened).is_err() {
            return Ok(());
        }

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    let message = match msg {
                        Some(Ok(Message::Text(text))) => WireMessage::Text(text),
                        Some(Ok(Message::Binary(data))) => WireMessage::Binary(Bytes::from(data)),
                        Some(Ok(Message::Close(_))) => {
                            info!("Relay closed connection");
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(ProtocolError::TransportError(e.to_string())),
                        None => {
                            info!("Connection closed");
                            break;
                        }
                    };

                    if events.send(TransportEvent::Message(message)).is_err() {
                        debug!("Session gone, closing");
                        break;
                    }
                }

                out = outgoing.recv() => {
                    let Some(out) = out else {
                        debug!("Session released the transport, closing");
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    };

                    let message = match out {
                        WireMessage::Text(text) => Message::Text(text),
                        WireMessage::Binary(data) => Message::Binary(data.to_vec()),
                    };
                    ws_sender
                        .send(message)
                        .await
                        .map_err(|e| ProtocolError::TransportError(e.to_string()))?;
                }
            }
        }

        Ok(())
    }
}
