//! # Command and Session Layer
//!
//! Everything between the packet codec and the transport.
//!
//! ## Components
//! - **Session**: Transport handle, correlation ids, handshake, handlers
//! - **Handshake**: The fixed `Connect`, `ConnectTo`, `NewApiClient` sequence
//! - **Message**: Builders for each relay command and its payload
//! - **Sequence**: Wrapping correlation id generator
//! - **Dispatcher**: Optional per-command routing of inbound packets

pub mod dispatcher;
pub mod handshake;
pub mod message;
pub mod sequence;
pub mod session;

pub use session::{CloseHandler, MessageHandler, ReadyHandler, Session, SessionState};
