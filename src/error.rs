//! Error taxonomy shared by every library operation.
//!
//! The four variants are the only failure kinds callers ever see. Each one is
//! displayed verbatim to the operator; nothing here is retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied parameters violate a precondition. Raised before any
    /// network traffic happens.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An external service rejected the credential, or the credential
    /// document could not be used at all.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The sheet, range, or video could not be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure or an unexpected response from an external service.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Stable label used in logs and for picking the process exit code.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::Authentication(_) => "authentication",
            Error::NotFound(_) => "not_found",
            Error::Upstream(_) => "upstream",
        }
    }
}
