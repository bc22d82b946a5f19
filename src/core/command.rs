//! Relay command registry.

use std::fmt;

/// Number of defined commands. Codes at or above this value are reserved.
pub const COMMAND_COUNT: u8 = 7;

/// Bit 7 of the wire command byte marks an error body.
pub const ERROR_FLAG: u8 = 0x80;

/// Bits 0-6 of the wire command byte carry the logical command.
pub const COMMAND_MASK: u8 = 0x7F;

/// Operations understood by the relay server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Command {
    None = 0,
    /// Activate the relay channel
    Connect = 1,
    /// Leave the relay
    Disconnect = 2,
    /// Register with a peer
    ConnectTo = 3,
    /// Create an API client for a peer
    NewApiClient = 4,
    /// Correlated API request to a peer
    SendTo = 5,
    /// Subscribe this connection to a peer stream
    Stream = 6,
}

impl Command {
    pub const ALL: [Command; COMMAND_COUNT as usize] = [
        Command::None,
        Command::Connect,
        Command::Disconnect,
        Command::ConnectTo,
        Command::NewApiClient,
        Command::SendTo,
        Command::Stream,
    ];

    /// Look up a command from its logical code.
    ///
    /// Returns `None` for reserved codes. Those are still valid on the wire.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::None => "None",
            Command::Connect => "Connect",
            Command::Disconnect => "Disconnect",
            Command::ConnectTo => "ConnectTo",
            Command::NewApiClient => "NewApiClient",
            Command::SendTo => "SendTo",
            Command::Stream => "Stream",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

/// Display name for a raw command code, reserved codes included.
pub fn command_name(code: u8) -> String {
    match Command::from_code(code) {
        Some(command) => command.name().to_string(),
        None => format!("Unknown({code})"),
    }
}
