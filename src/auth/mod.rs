//! Authenticated identity and its persistence.
//!
//! A [`Session`] exists from a successful login (or restore) until logout or
//! until the backend rejects the credential.

mod storage;

pub use storage::{SessionStore, StoreError, TOKEN_KEY, USER_KEY};

/// The logged-in user and their bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Lifecycle notifications emitted by the API client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend rejected the credential; it has already been cleared.
    Unauthenticated,
}
