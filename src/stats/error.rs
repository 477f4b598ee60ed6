//! Error types for stats persistence

use std::fmt;

/// Result type alias for stats persistence
pub type StatsResult<T> = Result<T, StatsError>;

/// Errors that can occur while loading or saving the stats store
#[derive(Debug)]
pub enum StatsError {
    /// I/O error (file access, rename, etc.)
    IoError(std::io::Error),

    /// The stored document could not be encoded or decoded
    SerializationError(String),

    /// The backend refused the write
    BackendError(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::IoError(err) => write!(f, "I/O error: {}", err),
            StatsError::SerializationError(msg) => {
                write!(f, "stats serialization error: {}", msg)
            }
            StatsError::BackendError(msg) => write!(f, "stats backend error: {}", msg),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatsError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        StatsError::IoError(err)
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::SerializationError(err.to_string())
    }
}
