//! Error types for the flare reconciler
//!
//! Startup code treats every variant as fatal. Inside the reconcile loop,
//! `Network`, `Http`, `Parse` and `Decode` are recoverable and only skip the
//! current tick.

use thiserror::Error;

/// Result type alias for flare operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the flare reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure (connect, TLS, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from a remote service
    #[error("HTTP error ({status}): {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Human-readable description of the failure
        message: String,
    },

    /// Response body is not a valid IP literal
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response body could not be decoded into the expected structure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors (reading the configuration file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
