//! Async driver for a relay [`Session`].
//!
//! The [`Client`] owns the session and spawns the transport on its own task.
//! Transport events come back over a channel and are fed into the session by
//! whoever polls [`Client::next_event`] or [`Client::run`], so all handlers
//! run on that task and the session needs no locking.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::protocol::session::{ReadyHandler, Session, SessionState};
use crate::transport::{Transport, TransportEvent, WebSocketTransport};

pub struct Client {
    config: ClientConfig,
    session: Session,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    task: Option<JoinHandle<()>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            session: Session::new(&config),
            config,
            events: None,
            task: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Connect over WebSocket to the relay at `address` (`host[:port]`).
    ///
    /// Returns immediately. `on_ready` runs once the handshake for `peer`
    /// has been sent.
    pub fn connect(&mut self, address: &str, peer: &str, on_ready: Option<ReadyHandler>) {
        let transport = WebSocketTransport::from_config(&self.config, address);
        self.connect_with(transport, peer, on_ready);
    }

    /// [`Client::connect`] with the address and peer from the configuration.
    pub fn connect_configured(&mut self, on_ready: Option<ReadyHandler>) {
        let address = self.config.address.clone();
        let peer = self.config.peer.clone();
        self.connect(&address, &peer, on_ready);
    }

    /// Connect over any transport. A previous transport is shut down first
    /// and its pending events are discarded.
    pub fn connect_with<T: Transport>(&mut self, transport: T, peer: &str, on_ready: Option<ReadyHandler>) {
        if let Some(task) = self.task.take() {
            debug!("Aborting previous transport");
            task.abort();
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (link, outgoing) = mpsc::unbounded_channel();
        self.session.attach(link, peer, on_ready);
        self.events = Some(events_rx);

        self.task = Some(tokio::spawn(async move {
            if let Err(e) = transport.run(events_tx.clone(), outgoing).await {
                warn!(error = %e, "Transport failed");
            }
            let _ = events_tx.send(TransportEvent::Closed);
        }));
    }

    /// Wait for the next transport event and feed it to the session.
    ///
    /// Returns false when there is no transport left to hear from.
    pub async fn next_event(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };

        match events.recv().await {
            Some(event) => {
                let closed = event == TransportEvent::Closed;
                self.session.handle_event(event);
                if closed {
                    self.events = None;
                    self.task = None;
                }
                true
            }
            None => {
                // Transport task aborted before it could report
                self.events = None;
                self.task = None;
                if self.session.state() != SessionState::Closed {
                    self.session.handle_event(TransportEvent::Closed);
                }
                false
            }
        }
    }

    /// Drive the session until the transport closes.
    pub async fn run(&mut self) {
        while self.next_event().await {}
    }

    /// Release the transport. The close is reported through the next events.
    pub fn close(&mut self) -> bool {
        self.session.close()
    }

    /// Release the transport and wait until it has closed.
    pub async fn shutdown(&mut self) {
        self.close();
        self.run().await;
    }

    pub fn on_message<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Session, Packet) + Send + 'static,
    {
        self.session.on_message(handler);
    }

    pub fn on_close<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Session) + Send + 'static,
    {
        self.session.on_close(handler);
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
    }

    pub fn connect_to(&mut self, name: &str) {
        self.session.connect_to(name);
    }

    pub fn new_api_client(&mut self, name: &str) {
        self.session.new_api_client(name);
    }

    pub fn send_to(&mut self, peer: &str, command: &str, data: impl AsRef<[u8]>) -> u32 {
        self.session.send_to(peer, command, data)
    }

    pub fn stream(&mut self, name: &str, stream: &str) {
        self.session.stream(name, stream);
    }

    /// Send `command` to `peer` and drive the session until the reply with
    /// the same id arrives.
    ///
    /// Other inbound packets keep reaching the message handler while
    /// waiting. Relay-reported failures come back as a packet with an error
    /// body, not as `Err`. Call once the session is ready; a request made
    /// before that fails with [`ProtocolError::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Timeout`] when no reply arrives within `wait`, and
    /// [`ProtocolError::ConnectionClosed`] when the transport is not open or
    /// closes first.
    pub async fn request(
        &mut self,
        peer: &str,
        command: &str,
        data: impl AsRef<[u8]>,
        wait: Duration,
    ) -> Result<Packet> {
        let id = self.session.send_to(peer, command, data);
        if !self.session.is_open() {
            return Err(ProtocolError::ConnectionClosed);
        }

        self.session.await_reply(id);
        // No deadline when `wait` is too large to add to the clock
        let deadline = Instant::now().checked_add(wait);
        let outcome = loop {
            if let Some(reply) = self.session.take_reply() {
                break Ok(reply);
            }
            let event = match deadline {
                Some(deadline) => timeout_at(deadline, self.next_event()).await,
                None => Ok(self.next_event().await),
            };
            match event {
                Ok(true) if self.session.state() != SessionState::Closed => {}
                Ok(_) => break Err(ProtocolError::ConnectionClosed),
                Err(_) => {
                    debug!(id, peer, command, "Request timed out");
                    break Err(ProtocolError::Timeout);
                }
            }
        };
        self.session.cancel_reply();
        outcome
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WireFormat;
    use crate::core::command::Command;
    use crate::transport::MemoryTransport;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_handshake_then_request() {
        let (transport, mut relay) = MemoryTransport::pair();
        let mut client = Client::default();

        client.connect_with(
            transport,
            "fortune",
            Some(Box::new(|session: &mut Session| {
                session.send_to("fortune", "fortb", "");
            })),
        );
        assert_eq!(client.state(), SessionState::Connecting);

        assert!(client.next_event().await);
        assert_eq!(client.state(), SessionState::Ready);

        let mut commands = Vec::new();
        for _ in 0..4 {
            let packet = relay.recv_packet().await.unwrap().unwrap();
            commands.push(packet.command().unwrap());
        }
        assert_eq!(
            commands,
            vec![
                Command::Connect,
                Command::ConnectTo,
                Command::NewApiClient,
                Command::SendTo
            ]
        );
    }

    #[tokio::test]
    async fn test_relay_close_runs_close_handler() {
        let (transport, relay) = MemoryTransport::pair();
        let mut client = Client::default();
        let closed = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&closed);
        client.on_close(move |_| *flag.lock().unwrap() = true);

        client.connect_with(transport, "peer", None);
        relay
            .send_packet(&Packet::with_payload(Command::SendTo, "hi"), WireFormat::Text)
            .unwrap();
        relay.close();

        client.run().await;
        assert!(*closed.lock().unwrap());
        assert_eq!(client.state(), SessionState::Closed);
        assert!(!client.next_event().await);
    }

    #[tokio::test]
    async fn test_request_before_ready_fails() {
        let (transport, _relay) = MemoryTransport::pair();
        let mut client = Client::default();
        client.connect_with(transport, "peer", None);

        let result = client
            .request("peer", "cmd", "", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
        assert_eq!(client.session().metrics().snapshot().sends_dropped, 1);
    }

    #[tokio::test]
    async fn test_request_fails_when_relay_closes() {
        let (transport, mut relay) = MemoryTransport::pair();
        let mut client = Client::default();
        client.connect_with(transport, "peer", None);
        assert!(client.next_event().await);

        tokio::spawn(async move {
            // Handshake, then the request; hang up without answering
            for _ in 0..4 {
                relay.recv().await;
            }
            relay.close();
        });

        let result = client
            .request("peer", "cmd", "", Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_closes_locally() {
        let (transport, mut relay) = MemoryTransport::pair();
        let mut client = Client::default();
        client.connect_with(transport, "peer", None);
        assert!(client.next_event().await);

        client.shutdown().await;
        assert_eq!(client.state(), SessionState::Closed);

        client.connect_to("peer");
        let mut received = 0;
        while relay.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 3);
        assert_eq!(client.session().metrics().snapshot().sends_dropped, 1);
    }
}
