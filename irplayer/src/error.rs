//! Error types for the playback service

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the player crate
///
/// Only endpoint resolution errors reach the callers of the playback
/// operations; everything else is logged and swallowed by the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider error (endpoint resolution, metadata feed)
    #[error(transparent)]
    Zeno(#[from] irzeno::Error),

    /// I/O error (player process, widget file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// `play` was requested before any source was loaded
    #[error("No audio source loaded")]
    NoSource,

    /// OS media session backend failure
    #[error("Media session error: {0}")]
    MediaSession(String),

    /// The service event loop is gone
    #[error("Playback service is not running")]
    ServiceStopped,

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

    /// Create a media session error
    pub fn media_session(msg: impl Into<String>) -> Self {
        Self::MediaSession(msg.into())
    }
}
