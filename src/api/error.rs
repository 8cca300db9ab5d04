//! API client error types.

use crate::auth::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected the credential. The client has already cleared it.
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success envelope. Carries the backend message verbatim.
    #[error("{0}")]
    RequestFailed(String),

    /// Input rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Session storage error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
