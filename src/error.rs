//! # Error Types
//!
//! Error handling for the proxy client.
//!
//! This module defines every error variant that can occur while encoding,
//! decoding or transporting packets.
//!
//! ## Error Categories
//! - **Frame Errors**: Frames too short to hold a header, checksum mismatches,
//!   invalid base64 text frames
//! - **Transport Errors**: I/O failures, WebSocket failures, connect timeouts
//! - **Configuration Errors**: Unreadable or invalid configuration
//!
//! Frame errors never stop a session. The session turns them into a malformed
//! packet (see [`Packet::malformed`](crate::core::packet::Packet::malformed))
//! and hands it to the message handler.
//!
//! ## Example Usage
//! ```rust
//! use teoproxy_client::core::packet::Packet;
//! use teoproxy_client::error::ProtocolError;
//! use tracing::{error, info};
//!
//! match Packet::from_bytes(&[0x01, 0x02]) {
//!     Ok(packet) => info!(id = packet.id, "Decoded packet"),
//!     Err(ProtocolError::MalformedPacket) => error!("Frame too short"),
//!     Err(e) => error!(error = %e, "Decode failed"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants shared by error variants and malformed packets.
pub mod constants {
    /// Frame validation errors
    pub const ERR_PACKET_TOO_SHORT: &str = "packet too short";
    pub const ERR_PACKET_CHECKSUM: &str = "packet checksum error";
    pub const ERR_INVALID_BASE64: &str = "packet base64 decode error";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_TIMEOUT: &str = "Operation timed out";
}

// ProtocolError is the primary error type for all client operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{}", constants::ERR_PACKET_TOO_SHORT)]
    MalformedPacket,

    #[error("{}: expected {expected:#04x}, got {actual:#04x}", constants::ERR_PACKET_CHECKSUM)]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("{}: {}", constants::ERR_INVALID_BASE64, .0)]
    Base64(#[from] base64::DecodeError),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("{}", constants::ERR_CONNECTION_CLOSED)]
    ConnectionClosed,

    #[error("{}", constants::ERR_TIMEOUT)]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Short text placed in the error body of a malformed packet.
    pub fn malformed_text(&self) -> String {
        match self {
            ProtocolError::MalformedPacket => constants::ERR_PACKET_TOO_SHORT.to_string(),
            ProtocolError::ChecksumMismatch { .. } => constants::ERR_PACKET_CHECKSUM.to_string(),
            ProtocolError::Base64(_) => constants::ERR_INVALID_BASE64.to_string(),
            other => other.to_string(),
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
