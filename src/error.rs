//! Error types for the poster pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the poster pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected or malformed caller input (oversized text, unknown event type)
    #[error("Invalid input: {0}")]
    InputError(String),

    /// The background image could not be loaded
    #[error("Failed to load image: {0}")]
    ImageLoadError(String),

    /// The raster surface could not be serialized to an image blob
    #[error("Image serialization failed: {0}")]
    SerializationError(String),

    /// No usable font could be resolved for text drawing
    #[error("Font unavailable: {0}")]
    FontError(String),

    /// The platform SDK is not initialized, not logged in, or refused a call
    #[error("Platform SDK error: {0}")]
    PlatformError(String),

    /// The requested platform capability is disabled or not reported available
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// A share is already in flight; only one may run at a time
    #[error("Share already in progress")]
    ShareInProgress,

    /// Remote image-store request failed
    #[error("Store error: {0}")]
    StoreError(String),

    /// Network-level failure talking to a remote host
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid runtime settings
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::NetworkError(format!("request timed out: {}", err))
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}
