//! Service error types and their HTTP-style mapping.

use thiserror::Error;

use crate::bridge::BridgeError;
use crate::keys::KeyError;

/// Errors surfaced to the embedding HTTP layer.
///
/// All variants are recoverable and carry enough detail for a user-facing
/// message; none should take the process down.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Start requested while the tunnel is already running.
    #[error("tunnel is already running")]
    AlreadyRunning,

    /// Stop requested while the tunnel is not running.
    #[error("tunnel is not running")]
    NotRunning,

    /// A request carried an invalid parameter.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Key store rejection.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Bridge exchange failure; local state was left unchanged.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ServiceError {
    /// HTTP status the embedding layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::Key(KeyError::NotFound) => 404,
            ServiceError::Key(KeyError::Revoked) | ServiceError::Key(KeyError::LimitExceeded) => {
                403
            }
            ServiceError::AlreadyRunning | ServiceError::NotRunning => 409,
            ServiceError::InvalidRequest(_) => 400,
            ServiceError::Bridge(_) => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ServiceError::Key(KeyError::NotFound).http_status(), 404);
        assert_eq!(ServiceError::Key(KeyError::Revoked).http_status(), 403);
        assert_eq!(
            ServiceError::Key(KeyError::LimitExceeded).http_status(),
            403
        );
        assert_eq!(ServiceError::AlreadyRunning.http_status(), 409);
        assert_eq!(ServiceError::NotRunning.http_status(), 409);
        assert_eq!(
            ServiceError::InvalidRequest("ports empty".into()).http_status(),
            400
        );
    }
}
