/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (login, verify, refresh, logout)

pub mod auth;
pub mod health;
