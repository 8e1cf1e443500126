/// Authentication core
///
/// This module implements the session/token lifecycle for TaskStream AI:
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing and verification
/// - [`token`]: JWT issuance and verification (access + refresh)
/// - [`service`]: The auth orchestrator composing rate limiting, credential
///   checks, token issuance, and session-store persistence
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with configurable cost, random salts
/// - **Tokens**: HS256-signed, time-bound, revocable via the session store
/// - **Rate Limiting**: Per-IP budgets evaluated before any credential work
/// - **Fail Closed**: Unknown token state is never treated as valid

pub mod password;
pub mod service;
pub mod token;
