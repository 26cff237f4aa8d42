//! Error types for ObjectIO
//!
//! Guard-word corruption inside the registry is not represented here: it is
//! an invariant violation and terminates the process instead of being
//! returned. Everything below is recoverable.

use thiserror::Error;

/// Common result type for ObjectIO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for ObjectIO
#[derive(Debug, Error)]
pub enum Error {
    // Registry errors
    #[error("identifier space exhausted: gave up after {attempts} attempts in a {bits}-bit space")]
    IdSpaceExhausted { attempts: u64, bits: u32 },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// An exhausted identifier space may free up as other callers remove
    /// their values.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IdSpaceExhausted { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
