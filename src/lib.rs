//! # Teoproxy Client
//!
//! Client for the Teonet proxy relay: the relay packet codec, the command
//! session that speaks to the relay, and the transports that carry it.
//!
//! ## Layers
//! - [`core`]: Command registry, packet frame, stream codecs
//! - [`protocol`]: Session state, handshake, correlation ids, command payloads
//! - [`transport`]: WebSocket, TCP and in-memory transports
//! - [`service`]: Async [`Client`] driving a session over a transport
//! - [`config`], [`error`], [`utils`]: Configuration, errors, logging and metrics
//!
//! ## Example
//! ```no_run
//! use teoproxy_client::{Client, ClientConfig, Session};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut client = Client::new(ClientConfig::default());
//!     client.on_message(|_, packet| {
//!         if let Some(text) = packet.payload_text() {
//!             println!("{}: {}", packet.id, text);
//!         }
//!     });
//!     client.connect(
//!         "fortune-gui.teonet.dev",
//!         "fortune",
//!         Some(Box::new(|session: &mut Session| {
//!             session.send_to("fortune", "fortb", "");
//!         })),
//!     );
//!     client.run().await;
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::{ClientConfig, Config, LoggingConfig, WireFormat};
pub use crate::core::command::Command;
pub use crate::core::packet::{Body, Packet};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::session::{Session, SessionState};
pub use crate::service::client::Client;
pub use crate::transport::{Transport, TransportEvent, WireMessage};
