//! Common error types for klang services

use thiserror::Error;

/// Common result type for klang operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the klang services
///
/// `Input` and `Decode` are client faults and may carry their message to
/// the caller. Everything else is a server fault whose detail is logged
/// but not exposed.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid request input (bad scheme, non-audio content, unreachable resource)
    #[error("Invalid input: {0}")]
    Input(String),

    /// Resource bytes could not be parsed as audio
    #[error("Audio decode failed: {0}")]
    Decode(String),

    /// Tagger model or its label vocabulary failed to load (fatal at startup)
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// Result cache store operation failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the request itself rather than the service
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Error::Input(_) | Error::Decode(_))
    }
}
