//! # Configuration Management
//!
//! Centralized configuration for the proxy client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults
//!
//! ## Defaults
//! - Text (base64) wire format, which is what the relay server reads and writes
//! - Checksum verification on inbound frames

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Max allowed frame size on byte-stream transports (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default connect timeout for transports
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for a correlated reply in [`crate::Client::request`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How outbound packets are rendered on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Base64 of the frame in a text message
    #[default]
    Text,
    /// Raw frame in a binary message
    Binary,
}

impl std::str::FromStr for WireFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(WireFormat::Text),
            "binary" => Ok(WireFormat::Binary),
            other => Err(ProtocolError::ConfigError(format!(
                "Unknown wire format: '{other}' (expected 'text' or 'binary')"
            ))),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("TEOPROXY_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(peer) = std::env::var("TEOPROXY_PEER") {
            config.client.peer = peer;
        }

        if let Ok(format) = std::env::var("TEOPROXY_WIRE_FORMAT") {
            config.client.wire_format = format.parse()?;
        }

        if let Ok(verify) = std::env::var("TEOPROXY_VERIFY_CHECKSUM") {
            config.client.verify_checksum = verify.trim().parse::<bool>().map_err(|_| {
                ProtocolError::ConfigError(format!(
                    "Invalid TEOPROXY_VERIFY_CHECKSUM: '{verify}' (expected 'true' or 'false')"
                ))
            })?;
        }

        if let Ok(timeout) = std::env::var("TEOPROXY_CONNECT_TIMEOUT_MS") {
            let millis = timeout.trim().parse::<u64>().map_err(|_| {
                ProtocolError::ConfigError(format!(
                    "Invalid TEOPROXY_CONNECT_TIMEOUT_MS: '{timeout}' (expected milliseconds)"
                ))
            })?;
            config.client.connect_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Relay server host, with optional port (e.g., "fortune-gui.teonet.dev")
    pub address: String,

    /// Peer to register with during the handshake
    #[serde(default)]
    pub peer: String,

    /// URL scheme for the WebSocket transport
    pub scheme: String,

    /// URL path of the relay endpoint
    pub path: String,

    /// How outbound packets are rendered
    #[serde(default)]
    pub wire_format: WireFormat,

    /// Reject inbound frames whose checksum does not match
    pub verify_checksum: bool,

    /// Timeout for transport connect attempts
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Maximum frame size on byte-stream transports
    pub max_frame_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("localhost:8081"),
            peer: String::new(),
            scheme: String::from("wss"),
            path: String::from("/ws"),
            wire_format: WireFormat::default(),
            verify_checksum: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// WebSocket URL for the relay at `address`
    pub fn url_for(&self, address: &str) -> String {
        format!("{}://{}{}", self.scheme, address, self.path)
    }

    /// WebSocket URL for the configured address
    pub fn url(&self) -> String {
        self.url_for(&self.address)
    }

    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if self.address.contains("://") || self.address.contains('/') {
            errors.push(format!(
                "Invalid client address: '{}' (expected host or host:port, without scheme or path)",
                self.address
            ));
        }

        if self.peer.contains(',') {
            errors.push(format!(
                "Peer name must not contain ',': '{}'",
                self.peer
            ));
        }

        if !matches!(self.scheme.as_str(), "ws" | "wss") {
            errors.push(format!(
                "Invalid scheme: '{}' (expected 'ws' or 'wss')",
                self.scheme
            ));
        }

        if !self.path.starts_with('/') {
            errors.push(format!("Path must start with '/': '{}'", self.path));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_frame_size
            ));
        }

        if !self.verify_checksum {
            errors.push(
                "WARNING: Checksum verification is disabled - corrupted frames will be accepted"
                    .to_string(),
            );
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("teoproxy-client"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
