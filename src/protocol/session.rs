//! Relay session: transport handle, correlation ids, handshake and handlers.
//!
//! A [`Session`] is driven by [`TransportEvent`]s and never performs I/O
//! itself. Outbound packets go to the current [`Link`], an unbounded channel
//! drained by the transport task, so every command returns immediately and
//! commands reach the transport in call order.
//!
//! ```text
//! Idle -> Connecting -> Handshaking -> Ready -> Closed
//!            ^                                   |
//!            +------------- attach --------------+
//! ```
//!
//! Commands issued while the session is not `Handshaking` or `Ready` are
//! dropped without error. Handlers run on the task that drives the session
//! and must not block.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, WireFormat};
use crate::core::packet::Packet;
use crate::error::ProtocolError;
use crate::protocol::handshake::handshake;
use crate::protocol::message;
use crate::protocol::sequence::IdSequence;
use crate::transport::{Link, TransportEvent, WireMessage};
use crate::utils::metrics::Metrics;

/// Called once, right after the handshake has been sent.
pub type ReadyHandler = Box<dyn FnOnce(&mut Session) + Send>;

/// Called for every inbound packet, malformed ones included.
pub type MessageHandler = Box<dyn FnMut(&mut Session, Packet) + Send>;

/// Called when the transport reports close.
pub type CloseHandler = Box<dyn FnMut(&mut Session) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Transport attached, open pending
    Connecting,
    /// Handshake being sent
    Handshaking,
    Ready,
    Closed,
}

impl SessionState {
    /// Whether commands reach the transport in this state.
    pub fn is_open(self) -> bool {
        matches!(self, SessionState::Handshaking | SessionState::Ready)
    }
}

pub struct Session {
    link: Option<Link>,
    state: SessionState,
    ids: IdSequence,
    peer: String,
    wire_format: WireFormat,
    verify_checksum: bool,
    on_ready: Option<ReadyHandler>,
    on_message: Option<MessageHandler>,
    on_close: Option<CloseHandler>,
    awaiting: Option<u32>,
    reply: Option<Packet>,
    metrics: Arc<Metrics>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("peer", &self.peer)
            .field("last_id", &self.ids.current())
            .field("wire_format", &self.wire_format)
            .field("verify_checksum", &self.verify_checksum)
            .field("attached", &self.link.is_some())
            .field("awaiting", &self.awaiting)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            link: None,
            state: SessionState::Idle,
            ids: IdSequence::new(),
            peer: config.peer.clone(),
            wire_format: config.wire_format,
            verify_checksum: config.verify_checksum,
            on_ready: None,
            on_message: None,
            on_close: None,
            awaiting: None,
            reply: None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some() && self.state.is_open()
    }

    /// Peer named in the last handshake.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Register the inbound packet handler, replacing any previous one.
    pub fn on_message<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Session, Packet) + Send + 'static,
    {
        self.on_message = Some(Box::new(handler));
    }

    /// Register the close handler, replacing any previous one.
    pub fn on_close<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Session) + Send + 'static,
    {
        self.on_close = Some(Box::new(handler));
    }

    /// Hold back the next inbound packet carrying `id` instead of handing it
    /// to the message handler. Collect it with [`Session::take_reply`].
    pub fn await_reply(&mut self, id: u32) {
        self.awaiting = Some(id);
        self.reply = None;
    }

    /// The packet held back by [`Session::await_reply`], once it arrived.
    pub fn take_reply(&mut self) -> Option<Packet> {
        self.reply.take()
    }

    /// Stop holding back packets. A reply that arrives later goes to the
    /// message handler.
    pub fn cancel_reply(&mut self) {
        self.awaiting = None;
        self.reply = None;
    }

    /// Bind a new transport handle for `peer`.
    ///
    /// Any previous handle is dropped, which shuts its transport down. The
    /// handshake runs when the transport reports [`TransportEvent::Opened`].
    pub fn attach(&mut self, link: Link, peer: impl Into<String>, on_ready: Option<ReadyHandler>) {
        if self.link.replace(link).is_some() {
            debug!("Replacing live transport");
        }
        if self.state.is_open() {
            self.metrics.connection_closed();
        }
        self.peer = peer.into();
        self.on_ready = on_ready;
        self.state = SessionState::Connecting;
        self.metrics.connection_attempt();
        debug!(peer = %self.peer, "Transport attached");
    }

    /// Caller-side close: release the transport handle. The transport closes
    /// its connection and reports [`TransportEvent::Closed`] afterwards.
    pub fn close(&mut self) -> bool {
        self.link.take().is_some()
    }

    /// Feed one transport notification into the session.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.handle_open(),
            TransportEvent::Message(message) => self.handle_message(message),
            TransportEvent::Closed => self.handle_close(),
        }
    }

    fn handle_open(&mut self) {
        if self.link.is_none() {
            debug!("Transport opened after release, ignoring");
            return;
        }
        if self.state != SessionState::Connecting {
            debug!(state = ?self.state, "Transport already open, ignoring");
            return;
        }

        info!(peer = %self.peer, "Transport open, sending handshake");
        self.metrics.connection_established();
        self.state = SessionState::Handshaking;

        let mut delivered = true;
        for packet in handshake(&self.peer) {
            delivered &= self.send(packet);
        }
        if !delivered {
            warn!(peer = %self.peer, "Handshake not delivered, transport gone");
            self.on_ready = None;
            return;
        }

        self.metrics.handshake_sent();
        self.state = SessionState::Ready;

        if let Some(ready) = self.on_ready.take() {
            ready(self);
        }
    }

    fn handle_message(&mut self, message: WireMessage) {
        self.metrics.message_received(message.len() as u64);

        let packet = match message.decode(self.verify_checksum) {
            Ok(packet) => {
                if let Some(error) = packet.error() {
                    debug!(id = packet.id, command = %packet.command_name(), error, "Relay reported error");
                    self.metrics.application_error();
                } else {
                    debug!(id = packet.id, command = %packet.command_name(), "Packet received");
                }
                packet
            }
            Err(e) => {
                warn!(error = %e, bytes = message.len(), "Malformed frame from relay");
                match e {
                    ProtocolError::ChecksumMismatch { .. } => self.metrics.checksum_failure(),
                    _ => self.metrics.malformed_frame(),
                }
                Packet::malformed(&e)
            }
        };

        if self.awaiting.is_some_and(|id| id == packet.id) {
            trace!(id = packet.id, "Reply held for waiting request");
            self.awaiting = None;
            self.reply = Some(packet);
            return;
        }

        if let Some(mut handler) = self.on_message.take() {
            handler(self, packet);
            // Keep a replacement registered from inside the handler
            if self.on_message.is_none() {
                self.on_message = Some(handler);
            }
        }
    }

    fn handle_close(&mut self) {
        if self.state.is_open() {
            self.metrics.connection_closed();
        }
        self.link = None;
        self.state = SessionState::Closed;
        info!(peer = %self.peer, "Transport closed");
        self.metrics.log_metrics();

        if let Some(mut handler) = self.on_close.take() {
            handler(self);
            if self.on_close.is_none() {
                self.on_close = Some(handler);
            }
        }
    }

    /// Send any packet. Dropped silently unless the transport is open.
    ///
    /// Returns whether the packet was handed to the transport.
    pub fn send(&mut self, packet: Packet) -> bool {
        let link = match &self.link {
            Some(link) if self.state.is_open() => link,
            _ => {
                trace!(command = %packet.command_name(), state = ?self.state, "Transport not open, dropping packet");
                self.metrics.send_dropped();
                return false;
            }
        };

        let message = WireMessage::encode(&packet, self.wire_format);
        let len = message.len();
        if link.send(message).is_err() {
            trace!(command = %packet.command_name(), "Transport gone, dropping packet");
            self.metrics.send_dropped();
            return false;
        }

        debug!(id = packet.id, command = %packet.command_name(), bytes = len, "Packet sent");
        self.metrics.message_sent(len as u64);
        true
    }

    /// Next correlation id. Never 0, wraps from `u32::MAX` to 1.
    pub fn next_id(&mut self) -> u32 {
        self.ids.next()
    }

    /// Ask the relay to drop this client. Local state is left as is: the
    /// session stays open until the transport reports close.
    pub fn disconnect(&mut self) {
        self.send(message::disconnect());
    }

    pub fn connect_to(&mut self, name: &str) {
        self.send(message::connect_to(name));
    }

    pub fn new_api_client(&mut self, name: &str) {
        self.send(message::new_api_client(name));
    }

    /// Send `command` with `data` to the API of `peer` through the relay.
    ///
    /// Returns the correlation id carried by the request; the reply packet
    /// has the same id. `peer` and `command` must not contain `,`.
    pub fn send_to(&mut self, peer: &str, command: &str, data: impl AsRef<[u8]>) -> u32 {
        let id = self.next_id();
        self.send(message::send_to(id, peer, command, data.as_ref()));
        id
    }

    /// Subscribe this connection to `stream` of peer `name`.
    pub fn stream(&mut self, name: &str, stream: &str) {
        self.send(message::stream(name, stream));
    }
}
