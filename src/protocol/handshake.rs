//! Relay handshake.
//!
//! Once the transport opens, the client activates its relay channel, registers
//! with the target peer and creates an API client for it, in exactly this
//! order. The relay relies on the order: peer registration must follow channel
//! activation and precede API client creation. Replies are not awaited.

use crate::core::command::Command;
use crate::core::packet::Packet;
use crate::protocol::message;

/// Commands of the handshake, in the order they are sent.
pub const HANDSHAKE_ORDER: [Command; 3] =
    [Command::Connect, Command::ConnectTo, Command::NewApiClient];

/// The three handshake packets for `peer`, in send order.
pub fn handshake(peer: &str) -> [Packet; 3] {
    [
        message::connect(),
        message::connect_to(peer),
        message::new_api_client(peer),
    ]
}

/// True when `packets` is a complete handshake for `peer`.
pub fn is_handshake_for(packets: &[Packet], peer: &str) -> bool {
    packets == handshake(peer).as_slice()
}
