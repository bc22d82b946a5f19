//! # Client Service
//!
//! Async driver that connects a [`Session`](crate::protocol::Session) to a
//! transport task and pumps its events.

pub mod client;

pub use client::Client;
