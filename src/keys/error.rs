//! Key store error types.

use thiserror::Error;

/// Errors from license key operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// No key with the given id exists.
    #[error("key not found")]
    NotFound,

    /// The key has been revoked.
    #[error("key revoked")]
    Revoked,

    /// The key's usage limit has been reached.
    #[error("usage limit exceeded")]
    LimitExceeded,
}
