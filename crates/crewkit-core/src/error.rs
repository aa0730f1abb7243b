//! Error types for the CREWKIT system.
//!
//! Every variant maps to a distinct caller-visible behavior:
//! `Validation`/`Conflict`/`Forbidden`/`NotFound` are user-correctable
//! rejections, `Transient` is retryable by the caller, and `Invariant`
//! signals an internal consistency failure that should never occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// Store/network timeout. The only kind a caller may retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Internal consistency check failed. Fatal; log and surface as a
    /// 500-equivalent, never expose details to the client.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

pub type CollabResult<T> = Result<T, CollabError>;
