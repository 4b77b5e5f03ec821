//! Custom error types specific to authentication failures.
//!
//! `AuthError` covers what a caller of the session manager can be told.
//! `SessionFault` records why a validity check failed; it is only logged,
//! since every fault collapses to "not authenticated" for callers.

use adapters::StoreError;
use chrono::Duration;
use thiserror::Error;

/// Message returned for any credential mismatch.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Message returned when the session could not be written.
pub const SESSION_UNAVAILABLE: &str = "Unable to start session";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("session storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("failed to serialize session: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AuthError {
    /// The message shown to the operator. Storage details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => INVALID_CREDENTIALS,
            AuthError::Store(_) | AuthError::Encode(_) => SESSION_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionFault {
    #[error("stored session is corrupt: {0}")]
    Corrupt(String),

    #[error("session expired {} minutes after last refresh", .elapsed.num_minutes())]
    Expired { elapsed: Duration },

    #[error("session storage failed: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for SessionFault {
    fn from(e: serde_json::Error) -> Self {
        SessionFault::Corrupt(e.to_string())
    }
}
