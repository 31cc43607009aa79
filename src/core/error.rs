use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the UDP gateway
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Timed out after {}ms waiting for a reply", .0.as_millis())]
    Timeout(Duration),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Can not parse '{text}' to match command {command} on item {item}")]
    StateMapping {
        /// Item the reply belonged to
        item: String,
        /// Command that triggered the reply
        command: String,
        /// Transformed reply text
        text: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transformation error: {0}")]
    Transform(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Error::Encoding(msg.into())
    }

    /// Creates a new configuration parse error
    pub fn config_parse(msg: impl Into<String>) -> Self {
        Error::ConfigParse(msg.into())
    }

    /// Creates a new state mapping failure
    pub fn state_mapping(
        item: impl Into<String>,
        command: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Error::StateMapping {
            item: item.into(),
            command: command.into(),
            text: text.into(),
        }
    }

    /// Creates a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Creates a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new transformation error
    pub fn transform(msg: impl Into<String>) -> Self {
        Error::Transform(msg.into())
    }

    /// Whether the error is a blocking-send deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
