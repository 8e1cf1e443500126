/// Token store gateway
///
/// Single entry point for token-related store state: active session records,
/// the revocation blacklist, and per-session IP tracking. Every store call
/// goes through the circuit breaker and a per-call timeout; any failure
/// (store error, timeout, open circuit) surfaces as
/// `AuthError::StoreUnavailable` so the auth service fails closed.
///
/// Tokens themselves are never stored. Records are keyed by the SHA-256 hex
/// digest of the token string, so a store compromise does not leak usable
/// credentials.

use crate::error::{AuthError, AuthResult};
use crate::store::session::{SessionStore, StoreError};
use crate::store::breaker::{BreakerConfig, CircuitBreaker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Lifecycle state of a stored token record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Token is live and accepted
    Active,

    /// Token was exchanged during refresh; no longer accepted
    Rotated,

    /// Token was explicitly revoked (logout)
    Revoked,
}

/// Server-side record for an issued token
///
/// Stored as JSON under `session:token:{digest}` with a TTL matching the
/// token's own expiry, so records vanish when the token does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenRecord {
    /// Session the token belongs to
    pub token_id: Uuid,

    /// Lifecycle state
    pub status: TokenStatus,

    /// Expiry mirrored from the token's `exp` claim
    pub expires_at: DateTime<Utc>,
}

/// Computes the store key digest for a token string
///
/// SHA-256 hex; one-way, so stored keys reveal nothing about the token.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn record_key(digest: &str) -> String {
    format!("session:token:{}", digest)
}

fn blacklist_key(digest: &str) -> String {
    format!("session:blacklist:{}", digest)
}

fn ip_key(session_id: &Uuid) -> String {
    format!("session:ip:{}", session_id)
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Per-call timeout; a timed-out call counts as a breaker failure
    pub call_timeout: Duration,

    /// Circuit breaker tuning
    pub breaker: BreakerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            breaker: BreakerConfig::default(),
        }
    }
}

/// Circuit-broken gateway over the session store
///
/// Cheap to clone; the breaker is shared.
#[derive(Clone)]
pub struct TokenStoreGateway {
    store: Arc<dyn SessionStore>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    call_timeout: Duration,
}

impl TokenStoreGateway {
    /// Creates a gateway over a session store
    pub fn new(store: Arc<dyn SessionStore>, config: GatewayConfig) -> Self {
        Self {
            store,
            breaker: Arc::new(Mutex::new(CircuitBreaker::new(config.breaker))),
            call_timeout: config.call_timeout,
        }
    }

    /// Runs a store call under the breaker and per-call timeout
    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> AuthResult<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        {
            let mut breaker = self.breaker.lock().await;
            if !breaker.try_acquire_trial() {
                tracing::warn!(operation = op, "Session store call rejected: circuit open");
                return Err(AuthError::StoreUnavailable);
            }
        }

        let outcome = tokio::time::timeout(self.call_timeout, fut).await;

        let mut breaker = self.breaker.lock().await;
        match outcome {
            Ok(Ok(value)) => {
                breaker.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                breaker.record_failure();
                tracing::error!(operation = op, error = %e, "Session store call failed");
                Err(AuthError::StoreUnavailable)
            }
            Err(_) => {
                breaker.record_failure();
                tracing::error!(operation = op, "Session store call timed out");
                Err(AuthError::StoreUnavailable)
            }
        }
    }

    /// Saves the record for a freshly issued token
    pub async fn save_record(
        &self,
        token: &str,
        record: &SessionTokenRecord,
        ttl_secs: u64,
    ) -> AuthResult<()> {
        let key = record_key(&token_digest(token));
        let payload = serde_json::to_string(record)?;
        self.guarded("save_record", self.store.set(&key, &payload, ttl_secs))
            .await
    }

    /// Fetches the record for a token, if one exists
    pub async fn record(&self, token: &str) -> AuthResult<Option<SessionTokenRecord>> {
        let key = record_key(&token_digest(token));
        let raw = self.guarded("record", self.store.get(&key)).await?;

        match raw {
            Some(json) => {
                let record: SessionTokenRecord = serde_json::from_str(&json)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Marks a token record with a terminal status and blacklists the token
    ///
    /// The blacklist entry's TTL matches the record's remaining lifetime:
    /// once the token has expired on its own there is nothing left to block.
    async fn retire(
        &self,
        token: &str,
        status: TokenStatus,
        remaining_ttl_secs: u64,
    ) -> AuthResult<()> {
        let digest = token_digest(token);

        if let Some(mut record) = self.record(token).await? {
            record.status = status;
            let payload = serde_json::to_string(&record)?;
            self.guarded(
                "retire_record",
                self.store
                    .set(&record_key(&digest), &payload, remaining_ttl_secs.max(1)),
            )
            .await?;
        }

        self.guarded(
            "blacklist",
            self.store
                .set(&blacklist_key(&digest), "1", remaining_ttl_secs.max(1)),
        )
        .await
    }

    /// Revokes a token (logout)
    pub async fn revoke(&self, token: &str, remaining_ttl_secs: u64) -> AuthResult<()> {
        self.retire(token, TokenStatus::Revoked, remaining_ttl_secs)
            .await
    }

    /// Retires a token that was exchanged during refresh
    pub async fn rotate(&self, token: &str, remaining_ttl_secs: u64) -> AuthResult<()> {
        self.retire(token, TokenStatus::Rotated, remaining_ttl_secs)
            .await
    }

    /// Checks the blacklist for a token
    pub async fn is_revoked(&self, token: &str) -> AuthResult<bool> {
        let key = blacklist_key(&token_digest(token));
        let entry = self.guarded("is_revoked", self.store.get(&key)).await?;
        Ok(entry.is_some())
    }

    /// Records the client IP a session was established from
    pub async fn save_session_ip(
        &self,
        session_id: &Uuid,
        ip: &str,
        ttl_secs: u64,
    ) -> AuthResult<()> {
        self.guarded(
            "save_session_ip",
            self.store.set(&ip_key(session_id), ip, ttl_secs),
        )
        .await
    }

    /// Fetches the IP a session was established from, if still tracked
    pub async fn session_ip(&self, session_id: &Uuid) -> AuthResult<Option<String>> {
        self.guarded("session_ip", self.store.get(&ip_key(session_id)))
            .await
    }

    /// Drops the IP tracking entry for a session
    pub async fn delete_session_ip(&self, session_id: &Uuid) -> AuthResult<()> {
        self.guarded("delete_session_ip", self.store.delete(&ip_key(session_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::session::MemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store that fails every call, for breaker behavior tests
    #[derive(Default)]
    struct FailingStore {
        failing: AtomicBool,
    }

    impl FailingStore {
        fn new() -> Self {
            Self {
                failing: AtomicBool::new(true),
            }
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Connection("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            self.check()?;
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), StoreError> {
            self.check()
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            self.check()
        }

        async fn incr(&self, _key: &str, _window: u64) -> Result<i64, StoreError> {
            self.check()?;
            Ok(1)
        }
    }

    fn gateway(store: Arc<dyn SessionStore>) -> TokenStoreGateway {
        TokenStoreGateway::new(store, GatewayConfig::default())
    }

    fn sample_record() -> SessionTokenRecord {
        SessionTokenRecord {
            token_id: Uuid::new_v4(),
            status: TokenStatus::Active,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_token_digest_is_stable_hex() {
        let a = token_digest("some.jwt.token");
        let b = token_digest("some.jwt.token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, token_digest("other.jwt.token"));
    }

    #[tokio::test]
    async fn test_save_and_fetch_record() {
        let gw = gateway(Arc::new(MemorySessionStore::new()));
        let record = sample_record();

        gw.save_record("tok", &record, 60).await.unwrap();
        let fetched = gw.record("tok").await.unwrap().unwrap();
        assert_eq!(fetched.token_id, record.token_id);
        assert_eq!(fetched.status, TokenStatus::Active);
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let gw = gateway(Arc::new(MemorySessionStore::new()));
        assert!(gw.record("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_blacklists_and_marks_record() {
        let gw = gateway(Arc::new(MemorySessionStore::new()));
        gw.save_record("tok", &sample_record(), 60).await.unwrap();

        assert!(!gw.is_revoked("tok").await.unwrap());
        gw.revoke("tok", 60).await.unwrap();

        assert!(gw.is_revoked("tok").await.unwrap());
        let record = gw.record("tok").await.unwrap().unwrap();
        assert_eq!(record.status, TokenStatus::Revoked);
    }

    #[tokio::test]
    async fn test_rotate_marks_record_rotated() {
        let gw = gateway(Arc::new(MemorySessionStore::new()));
        gw.save_record("tok", &sample_record(), 60).await.unwrap();

        gw.rotate("tok", 60).await.unwrap();

        assert!(gw.is_revoked("tok").await.unwrap());
        let record = gw.record("tok").await.unwrap().unwrap();
        assert_eq!(record.status, TokenStatus::Rotated);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_still_blacklists() {
        let gw = gateway(Arc::new(MemorySessionStore::new()));
        gw.revoke("never-issued", 60).await.unwrap();
        assert!(gw.is_revoked("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_session_ip_roundtrip() {
        let gw = gateway(Arc::new(MemorySessionStore::new()));
        let session_id = Uuid::new_v4();

        gw.save_session_ip(&session_id, "10.0.0.1", 60).await.unwrap();
        assert_eq!(
            gw.session_ip(&session_id).await.unwrap(),
            Some("10.0.0.1".to_string())
        );

        gw.delete_session_ip(&session_id).await.unwrap();
        assert_eq!(gw.session_ip(&session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_unavailable() {
        let gw = gateway(Arc::new(FailingStore::new()));
        let result = gw.record("tok").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable)));
    }

    #[tokio::test]
    async fn test_breaker_opens_after_repeated_failures() {
        let store = Arc::new(FailingStore::new());
        let gw = TokenStoreGateway::new(
            store.clone(),
            GatewayConfig {
                call_timeout: Duration::from_secs(1),
                breaker: BreakerConfig {
                    reset_timeout: Duration::from_secs(60),
                    ..BreakerConfig::default()
                },
            },
        );

        for _ in 0..4 {
            let _ = gw.record("tok").await;
        }

        // Store recovers, but the circuit is still open
        store.failing.store(false, Ordering::SeqCst);
        let result = gw.record("tok").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable)));
    }

    #[tokio::test]
    async fn test_breaker_recovers_after_reset_timeout() {
        let store = Arc::new(FailingStore::new());
        let gw = TokenStoreGateway::new(
            store.clone(),
            GatewayConfig {
                call_timeout: Duration::from_secs(1),
                breaker: BreakerConfig {
                    reset_timeout: Duration::from_millis(50),
                    ..BreakerConfig::default()
                },
            },
        );

        for _ in 0..4 {
            let _ = gw.record("tok").await;
        }
        assert!(matches!(
            gw.record("tok").await,
            Err(AuthError::StoreUnavailable)
        ));

        store.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Trial call succeeds and closes the circuit
        assert!(gw.record("tok").await.unwrap().is_none());
        assert!(gw.record("tok").await.unwrap().is_none());
    }
}
