use thiserror::Error;

/// Main error type for the sync coordinator
#[derive(Error, Debug)]
pub enum SyncError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors: no response reached the client
    #[error("Network error: {0}")]
    Network(String),

    // Server errors: non-2xx or application-level failure
    #[error("Server error: {message}")]
    Server {
        status: Option<u16>,
        message: String,
    },

    /// Internal ordering guard: a response arrived for a request that is no
    /// longer the latest issued one. Never surfaced to callers or recorded
    /// as a connection failure.
    #[error("stale response discarded")]
    StaleResponseDiscarded,

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for SyncError
pub type Result<T> = std::result::Result<T, SyncError>;
