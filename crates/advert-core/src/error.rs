//! Error types for the advert system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for advert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the advert system
#[derive(Error, Debug)]
pub enum Error {
    /// A raw advert entry is missing required fields
    #[error("Invalid advert data: {0}")]
    InvalidAdvert(String),

    /// A raw size entry is not a `[width, height]` pair
    #[error("Invalid advert size data: {0}")]
    InvalidAdvertSize(String),

    /// A raw bid entry lacks a bidder name or placement id
    #[error("Invalid advert bidder data: {0}")]
    InvalidAdvertBidder(String),

    /// Network failure or non-2xx response from the configuration API
    #[error("Transport error: {0}")]
    Transport(String),

    /// The configuration API answered with something other than an array
    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid advert error
    pub fn invalid_advert(msg: impl Into<String>) -> Self {
        Self::InvalidAdvert(msg.into())
    }

    /// Create an invalid advert size error
    pub fn invalid_size(msg: impl Into<String>) -> Self {
        Self::InvalidAdvertSize(msg.into())
    }

    /// Create an invalid advert bidder error
    pub fn invalid_bidder(msg: impl Into<String>) -> Self {
        Self::InvalidAdvertBidder(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an unexpected payload error
    pub fn unexpected_payload(msg: impl Into<String>) -> Self {
        Self::UnexpectedPayload(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from validating a raw advert entry
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAdvert(_) | Self::InvalidAdvertSize(_) | Self::InvalidAdvertBidder(_)
        )
    }

    /// Whether this error came from fetching the configuration
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::UnexpectedPayload(_) | Self::Json(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
