/// Session store abstraction
///
/// A narrow key/value interface over the shared store: string get/set with
/// TTL, delete, and an atomic increment used by the rate limiter. The Redis
/// implementation is used in production; the in-memory implementation backs
/// tests and single-instance local runs.
///
/// Every logical update is a single atomic key write, so multiple stateless
/// service instances can share one store without distributed locks.

use crate::store::client::RedisClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Low-level store failure
///
/// Callers above the token store gateway never see this type; the gateway
/// translates it into `AuthError::StoreUnavailable`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection-level failure
    #[error("Store connection error: {0}")]
    Connection(String),

    /// Command rejected or failed
    #[error("Store command error: {0}")]
    Command(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => StoreError::Connection(err.to_string()),
            _ => StoreError::Command(err.to_string()),
        }
    }
}

/// Shared key/value store interface
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads a value, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value with a TTL in seconds
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// Deletes a key (no-op if absent)
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increments a counter, starting its TTL window on first
    /// increment, and returns the new count
    async fn incr(&self, key: &str, window_secs: u64) -> Result<i64, StoreError>;
}

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    client: RedisClient,
}

impl RedisSessionStore {
    /// Creates a store over an existing Redis client
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.client.get_connection();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.client.get_connection();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.client.get_connection();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str, window_secs: u64) -> Result<i64, StoreError> {
        let mut conn = self.client.get_connection();

        // INCR and EXPIRE must be atomic across instances, so both run in
        // one Lua script: the window starts when the first hit arrives.
        let script = redis::Script::new(
            r#"
            local count = redis.call('INCR', KEYS[1])
            if count == 1 then
                redis.call('EXPIRE', KEYS[1], ARGV[1])
            end
            return count
            "#,
        );

        let count: i64 = script
            .key(key)
            .arg(window_secs)
            .invoke_async(&mut conn)
            .await?;

        Ok(count)
    }
}

/// In-memory session store for tests and local development
///
/// Entries expire lazily on read. Not suitable for multi-instance
/// deployments: state is process-local.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemorySessionStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, window_secs: u64) -> Result<i64, StoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let count = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                entry.value.parse::<i64>().unwrap_or(0) + 1
            }
            _ => 1,
        };

        let expires_at = match entries.get(key) {
            // Window TTL is fixed at the first hit, not refreshed
            Some(entry) if entry.expires_at > now && count > 1 => entry.expires_at,
            _ => now + Duration::from_secs(window_secs),
        };

        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: count.to_string(),
                expires_at,
            },
        );

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_set_get_delete() {
        let store = MemorySessionStore::new();
        store.set("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_get_missing() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_expiry() {
        let store = MemorySessionStore::new();
        store.set("k", "v", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_incr_counts_up() {
        let store = MemorySessionStore::new();
        assert_eq!(store.incr("c", 60).await.unwrap(), 1);
        assert_eq!(store.incr("c", 60).await.unwrap(), 2);
        assert_eq!(store.incr("c", 60).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_memory_incr_window_resets() {
        let store = MemorySessionStore::new();
        assert_eq!(store.incr("c", 0).await.unwrap(), 1);
        // Window already elapsed, so the count starts over
        assert_eq!(store.incr("c", 60).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_redis_store_roundtrip() {
        use crate::store::client::{RedisClient, RedisConfig};

        let client = RedisClient::new(RedisConfig::default_for_test()).await.unwrap();
        let store = RedisSessionStore::new(client);

        store.set("taskstream:test:k", "v", 10).await.unwrap();
        assert_eq!(
            store.get("taskstream:test:k").await.unwrap(),
            Some("v".to_string())
        );
        store.delete("taskstream:test:k").await.unwrap();
    }
}
