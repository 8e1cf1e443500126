/// Login rate limiting
///
/// Fixed per-IP budget over a rolling window, enforced against the shared
/// session store so the budget holds across all service instances. Once an
/// IP exhausts its budget it is blocked outright for a longer penalty
/// period; further attempts during the block do not extend it.
///
/// Store failures surface as `AuthError::StoreUnavailable`: when limits
/// cannot be checked, logins are refused rather than admitted unthrottled.

use crate::error::{AuthError, AuthResult};
use crate::store::session::SessionStore;
use chrono::Utc;
use std::sync::Arc;

/// Rate limit policy for login attempts
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Attempts allowed per window
    pub points: i64,

    /// Counting window in seconds
    pub window_secs: u64,

    /// Block duration in seconds once the budget is exhausted
    pub block_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            points: 5,
            window_secs: 60,
            block_secs: 300,
        }
    }
}

/// Per-IP login rate limiter backed by the session store
#[derive(Clone)]
pub struct LoginRateLimiter {
    store: Arc<dyn SessionStore>,
    config: RateLimitConfig,
}

fn counter_key(ip: &str) -> String {
    format!("ratelimit:ip:{}", ip)
}

fn block_key(ip: &str) -> String {
    format!("ratelimit:block:{}", ip)
}

impl LoginRateLimiter {
    /// Creates a limiter with the given policy
    pub fn new(store: Arc<dyn SessionStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Consumes one attempt for the given client IP
    ///
    /// # Errors
    ///
    /// - `AuthError::RateLimited` with a `retry_after` hint when the IP is
    ///   blocked or just exhausted its budget
    /// - `AuthError::StoreUnavailable` when the store cannot be reached
    pub async fn consume(&self, ip: &str) -> AuthResult<()> {
        // Active block wins before any counting happens
        let blocked_until = self
            .store
            .get(&block_key(ip))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Rate limiter store read failed");
                AuthError::StoreUnavailable
            })?;

        if let Some(raw) = blocked_until {
            let now = Utc::now().timestamp();
            let until = raw.parse::<i64>().unwrap_or(now);
            let retry_after = until.saturating_sub(now).max(1) as u64;

            tracing::warn!(client_ip = ip, retry_after, "Login attempt from blocked IP");
            return Err(AuthError::RateLimited { retry_after });
        }

        let count = self
            .store
            .incr(&counter_key(ip), self.config.window_secs)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Rate limiter store increment failed");
                AuthError::StoreUnavailable
            })?;

        if count > self.config.points {
            let until = Utc::now().timestamp() + self.config.block_secs as i64;
            self.store
                .set(&block_key(ip), &until.to_string(), self.config.block_secs)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Rate limiter block write failed");
                    AuthError::StoreUnavailable
                })?;

            tracing::warn!(
                client_ip = ip,
                attempts = count,
                block_secs = self.config.block_secs,
                "Login rate limit exceeded; IP blocked"
            );
            return Err(AuthError::RateLimited {
                retry_after: self.config.block_secs,
            });
        }

        tracing::debug!(client_ip = ip, attempts = count, "Login attempt admitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::session::MemorySessionStore;

    fn limiter(points: i64) -> LoginRateLimiter {
        LoginRateLimiter::new(
            Arc::new(MemorySessionStore::new()),
            RateLimitConfig {
                points,
                window_secs: 60,
                block_secs: 300,
            },
        )
    }

    #[tokio::test]
    async fn test_attempts_within_budget_pass() {
        let limiter = limiter(5);
        for _ in 0..5 {
            limiter.consume("10.0.0.1").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_exceeding_budget_blocks() {
        let limiter = limiter(5);
        for _ in 0..5 {
            limiter.consume("10.0.0.1").await.unwrap();
        }

        let result = limiter.consume("10.0.0.1").await;
        match result {
            Err(AuthError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, 300);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_block_persists_for_later_attempts() {
        let limiter = limiter(1);
        limiter.consume("10.0.0.1").await.unwrap();
        assert!(limiter.consume("10.0.0.1").await.is_err());

        // Still blocked, with a retry hint bounded by the block duration
        match limiter.consume("10.0.0.1").await {
            Err(AuthError::RateLimited { retry_after }) => {
                assert!(retry_after >= 1 && retry_after <= 300);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_block_expires_and_attempts_are_admitted_again() {
        let limiter = LoginRateLimiter::new(
            Arc::new(MemorySessionStore::new()),
            RateLimitConfig {
                points: 2,
                window_secs: 1,
                block_secs: 1,
            },
        );

        limiter.consume("10.0.0.1").await.unwrap();
        limiter.consume("10.0.0.1").await.unwrap();
        assert!(matches!(
            limiter.consume("10.0.0.1").await,
            Err(AuthError::RateLimited { .. })
        ));

        // Both the block entry and the counting window lapse
        tokio::time::sleep(std::time::Duration::from_millis(1400)).await;

        limiter.consume("10.0.0.1").await.unwrap();
    }

    #[tokio::test]
    async fn test_budgets_are_per_ip() {
        let limiter = limiter(1);
        limiter.consume("10.0.0.1").await.unwrap();
        assert!(limiter.consume("10.0.0.1").await.is_err());

        // A different client is unaffected
        limiter.consume("10.0.0.2").await.unwrap();
    }
}
