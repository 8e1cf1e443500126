/// Common error taxonomy for the authentication core
///
/// Every fallible operation in this crate returns `Result<T, AuthError>` so
/// callers are forced to handle each failure kind explicitly. Expected
/// control-flow outcomes (rate limit hit, account locked) and infrastructure
/// failures (store down) are separate variants, never panics.
///
/// # Client-facing messages
///
/// Credential and token failures render as generic messages. The API layer
/// must not let callers distinguish "user not found" from "wrong password"
/// or "revoked" from "never issued" beyond what the variant itself exposes.

use thiserror::Error;

/// Result alias used throughout the authentication core
pub type AuthResult<T> = Result<T, AuthError>;

/// Unified authentication error
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad input the caller can correct (e.g., password below minimum length)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Bad credentials or a token that failed a non-cryptographic check.
    /// Deliberately generic: covers unknown user, wrong password, and
    /// inactive account without distinguishing them.
    #[error("Invalid credentials")]
    Authentication,

    /// Login budget exhausted for this IP
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds until the caller may retry
        retry_after: u64,
    },

    /// Too many failed login attempts. There is no in-band unlock; the
    /// failure counter is reset through the external password-reset flow.
    #[error("Account locked after repeated failed login attempts")]
    AccountLocked,

    /// Session store unreachable, timed out, or circuit breaker open.
    /// Token state cannot be confirmed, so callers must fail closed.
    #[error("Session store unavailable")]
    StoreUnavailable,

    /// Token signature did not verify
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry
    #[error("Token has expired")]
    ExpiredToken,

    /// Token was explicitly revoked or rotated away
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Encryption key material of the wrong size
    #[error("Encryption key must be exactly 32 bytes")]
    InvalidKey,

    /// AEAD authentication tag did not verify, or a ciphertext field was
    /// missing or undecodable
    #[error("Ciphertext integrity check failed")]
    Integrity,

    /// Unexpected internal failure (database, serialization)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Internal(format!("Serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_credential_message() {
        // Never leak which factor failed
        assert_eq!(AuthError::Authentication.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let err = AuthError::RateLimited { retry_after: 300 };
        assert!(err.to_string().contains("300"));
    }
}
