//! Error types for the PinChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant; the gateway maps the
//! top-level [`Error`] onto HTTP status codes.

use thiserror::Error;

use crate::provider::BlockFeedback;

/// The top-level error type for all PinChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Invalid PIN format: {0}")]
    InvalidFormat(String),

    #[error("Message cannot be empty")]
    EmptyMessage,

    // --- Identity / session ---
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Unauthorized: {0}")]
    Auth(#[from] AuthError),

    // --- Model outcome ---
    #[error("Message blocked by model safety policy: {0}")]
    Blocked(BlockFeedback),

    // --- Collaborator failures ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is an infrastructure fault (as opposed to a
    /// client-caused rejection).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Store(_) | Error::Provider(_) | Error::Config { .. } | Error::Internal(_)
        )
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Session token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no token supplied")]
    MissingToken,

    #[error("token is not valid: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
