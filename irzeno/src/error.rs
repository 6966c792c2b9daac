//! Error types for the Zeno.fm client

/// Result type alias for Zeno.fm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when resolving endpoints or following metadata
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Station slug is empty
    #[error("Invalid station slug: {0:?}")]
    InvalidSlug(String),

    /// Metadata payload is valid JSON but not an object
    #[error("Invalid metadata payload: {0}")]
    InvalidPayload(String),

    /// Server ended the push stream
    #[error("Metadata stream closed by server")]
    StreamClosed,

    /// No bytes received on the push stream for too long
    #[error("Metadata stream idle for {0:?}")]
    StreamIdle(std::time::Duration),

    /// Configuration error (from irconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }
}
