/// Security event counters
///
/// Lightweight process-local counters incremented by the auth orchestrator
/// on every success and failure path. The API server exposes a snapshot via
/// the health endpoint; aggregation across instances happens downstream.
///
/// Counters are atomic so the struct can sit behind an `Arc` and be bumped
/// from any request without locking.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local authentication metrics
#[derive(Debug, Default)]
pub struct AuthMetrics {
    login_success: AtomicU64,
    login_failure: AtomicU64,
    rate_limited: AtomicU64,
    account_locked: AtomicU64,
    tokens_issued: AtomicU64,
    tokens_verified: AtomicU64,
    tokens_rejected: AtomicU64,
    tokens_revoked: AtomicU64,
    store_errors: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Successful logins
    pub login_success: u64,

    /// Failed logins (bad credentials, inactive account)
    pub login_failure: u64,

    /// Logins rejected by the rate limiter
    pub rate_limited: u64,

    /// Logins rejected by the failure-streak lockout
    pub account_locked: u64,

    /// Token pairs issued
    pub tokens_issued: u64,

    /// Tokens that passed full verification
    pub tokens_verified: u64,

    /// Tokens rejected at any verification stage
    pub tokens_rejected: u64,

    /// Tokens explicitly revoked (logout or rotation)
    pub tokens_revoked: u64,

    /// Session store failures, timeouts, and breaker rejections
    pub store_errors: u64,
}

impl AuthMetrics {
    /// Creates a fresh set of zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_login_success(&self) {
        self.login_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_login_failure(&self) {
        self.login_failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_account_locked(&self) {
        self.account_locked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tokens_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tokens_verified(&self) {
        self.tokens_verified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tokens_rejected(&self) {
        self.tokens_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tokens_revoked(&self) {
        self.tokens_revoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_store_errors(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot of all counters
    ///
    /// Counters are read individually; a request landing mid-snapshot can
    /// skew a single counter by one, which is acceptable for monitoring.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            login_success: self.login_success.load(Ordering::Relaxed),
            login_failure: self.login_failure.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            account_locked: self.account_locked.load(Ordering::Relaxed),
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            tokens_verified: self.tokens_verified.load(Ordering::Relaxed),
            tokens_rejected: self.tokens_rejected.load(Ordering::Relaxed),
            tokens_revoked: self.tokens_revoked.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}
