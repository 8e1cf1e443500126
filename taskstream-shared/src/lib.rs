//! # TaskStream Shared Library
//!
//! This crate contains the authentication core shared by the TaskStream AI
//! backend services: credential hashing, token issuance and verification,
//! session state tracking, and the login/verify orchestration logic.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT lifecycle, and the auth orchestrator
//! - `crypto`: AEAD secret encryption and key rotation bookkeeping
//! - `store`: Session store abstraction, Redis client, and circuit breaker
//! - `ratelimit`: Per-IP login rate limiting
//! - `models`: User entity and data-access interface
//! - `db`: PostgreSQL connection pooling
//! - `metrics`: Security event counters
//! - `error`: Common error taxonomy

pub mod auth;
pub mod crypto;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ratelimit;
pub mod store;

/// Current version of the TaskStream shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
