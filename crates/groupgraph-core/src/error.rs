//! Centralized error types for groupgraph.

use thiserror::Error;

/// Main error type for groupgraph operations.
#[derive(Error, Debug)]
pub enum GroupGraphError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response envelope: {0}")]
    Envelope(String),

    #[error("Request failed with code {code}: {}", errors.join("; "))]
    Status { code: i64, errors: Vec<String> },

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Graph store error: {message}")]
    Store { message: String, transient: bool },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for groupgraph operations.
pub type GgResult<T> = Result<T, GroupGraphError>;

impl GroupGraphError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a permanent store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            transient: false,
        }
    }

    /// Create a store error worth retrying (lost connection, IO).
    pub fn transient_store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            transient: true,
        }
    }

    /// Whether the error should stop a whole sync run rather than a single entity.
    ///
    /// Transport failures, rejected credentials, bad configuration and
    /// cancellation cannot be fixed by moving on to the next entity.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Config(_) | Self::Cancelled | Self::Io(_) => true,
            Self::Status { code, .. } => *code == 401 || *code == 403,
            Self::Envelope(_) | Self::Decode(_) | Self::Store { .. } | Self::Json(_) => false,
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store { transient: true, .. })
    }
}
