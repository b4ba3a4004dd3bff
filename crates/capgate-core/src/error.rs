//! Error types for the `capgate` core library.

use thiserror::Error;

/// Result type alias using the `capgate` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `capgate` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty capability identifier, or one the platform shim does not know.
    #[error("Invalid capability: {0:?}")]
    InvalidCapability(String),

    /// Every request token is held by an outstanding request.
    #[error("No free request token: all {0} tokens are outstanding")]
    TokensExhausted(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
