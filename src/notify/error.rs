//! Error types for notification delivery

use std::fmt;
use std::time::Duration;

/// Result type alias for channel operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors a single delivery attempt can end with
#[derive(Debug)]
pub enum NotifyError {
    /// The request never produced a response (connect, TLS, ...)
    Transport(String),

    /// The remote API answered with a non-success status
    Rejected { status: u16, body: String },

    /// The channel is misconfigured (bad address, missing credential)
    InvalidConfig(String),

    /// Mail could not be built or handed to the SMTP server
    Email(String),

    /// The send did not finish within the dispatcher's bound
    Timeout(Duration),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Transport(msg) => write!(f, "transport error: {}", msg),
            NotifyError::Rejected { status, body } => {
                write!(f, "rejected with status {}: {}", status, body)
            }
            NotifyError::InvalidConfig(msg) => write!(f, "invalid channel configuration: {}", msg),
            NotifyError::Email(msg) => write!(f, "email error: {}", msg),
            NotifyError::Timeout(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

impl From<lettre::address::AddressError> for NotifyError {
    fn from(err: lettre::address::AddressError) -> Self {
        NotifyError::InvalidConfig(err.to_string())
    }
}

impl From<lettre::error::Error> for NotifyError {
    fn from(err: lettre::error::Error) -> Self {
        NotifyError::Email(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        NotifyError::Email(err.to_string())
    }
}
