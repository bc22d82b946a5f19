//! # Core Protocol Components
//!
//! Low-level packet handling, the command registry and stream framing.
//!
//! This module is pure data transformation: no I/O and no state.
//!
//! ## Components
//! - **Command**: The closed set of relay operation codes
//! - **Packet**: Binary packet format with error flag and checksum
//! - **Codec**: Tokio codec giving message boundaries over byte streams
//!
//! ## Wire Format
//! ```text
//! [Id(4, LE)] [Command|ErrorFlag(1)] [Body(N)] [Checksum(1)]
//! ```
//!
//! The checksum is the sum of all preceding bytes modulo 256. It catches
//! corruption, it does not authenticate anything.

pub mod codec;
pub mod command;
pub mod packet;
