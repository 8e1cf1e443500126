/// Versioned encryption key management
///
/// Keys rotate on a fixed schedule. Rotation appends a new version rather
/// than replacing the old one: sealed records name the key version that
/// produced them, and the full history stays available so any record sealed
/// under an earlier version still decrypts.
///
/// Time is injected through the [`Clock`] trait so rotation schedules are
/// testable without waiting out real intervals.

use crate::crypto::cipher::{self, EncryptedSecret, KEY_LEN};
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// Time source for rotation decisions
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One generation of key material
#[derive(Clone)]
pub struct KeyMaterial {
    /// Monotonically increasing version, starting at 1
    pub version: u32,

    /// Raw 32-byte key
    pub key: [u8; KEY_LEN],

    /// When this version was created
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key bytes never appear in debug output or logs
        f.debug_struct("KeyMaterial")
            .field("version", &self.version)
            .field("key", &"[redacted]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

/// Holds the active key and the full rotation history
pub struct KeyManager {
    keys: Vec<KeyMaterial>,
    rotation_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl KeyManager {
    /// Default rotation interval: 90 days
    pub const DEFAULT_ROTATION_DAYS: i64 = 90;

    /// Creates a manager with a freshly generated version-1 key
    pub fn new(rotation_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let initial = KeyMaterial {
            version: 1,
            key: generate_key(),
            created_at: clock.now(),
        };
        Self {
            keys: vec![initial],
            rotation_interval,
            clock,
        }
    }

    /// Creates a manager seeded with externally supplied version-1 key
    /// material (e.g., from a secret mount)
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the material is not 32 bytes.
    pub fn with_initial_key(
        material: &[u8],
        rotation_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let key: [u8; KEY_LEN] = material.try_into().map_err(|_| AuthError::InvalidKey)?;
        Ok(Self {
            keys: vec![KeyMaterial {
                version: 1,
                key,
                created_at: clock.now(),
            }],
            rotation_interval,
            clock,
        })
    }

    /// The key currently used for new encryptions
    pub fn active(&self) -> &KeyMaterial {
        // Invariant: keys is never empty and the last entry is the newest
        self.keys
            .last()
            .unwrap_or_else(|| unreachable!("key history is never empty"))
    }

    /// Looks up a historical key by version
    pub fn key_for_version(&self, version: u32) -> Option<&KeyMaterial> {
        self.keys.iter().find(|k| k.version == version)
    }

    /// Rotates to a new key version if the active key's age has reached the
    /// rotation interval
    ///
    /// Returns the new active version when a rotation happened.
    pub fn rotate_if_due(&mut self) -> Option<u32> {
        let now = self.clock.now();
        let age = now - self.active().created_at;
        if age < self.rotation_interval {
            return None;
        }

        let version = self.active().version + 1;
        self.keys.push(KeyMaterial {
            version,
            key: generate_key(),
            created_at: now,
        });

        tracing::info!(key_version = version, "Encryption key rotated");
        Some(version)
    }

    /// Forces a rotation regardless of schedule and returns the new version
    pub fn rotate_now(&mut self) -> u32 {
        let version = self.active().version + 1;
        self.keys.push(KeyMaterial {
            version,
            key: generate_key(),
            created_at: self.clock.now(),
        });
        tracing::info!(key_version = version, "Encryption key rotated (manual)");
        version
    }

    /// Encrypts a plaintext under the active key
    pub fn seal(&self, plaintext: &str) -> AuthResult<EncryptedSecret> {
        let active = self.active();
        cipher::encrypt(plaintext, &active.key, active.version)
    }

    /// Decrypts a sealed value using the key version it names
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` when the named version is not in the
    /// history; decryption failures surface as `AuthError::Integrity`.
    pub fn open(&self, secret: &EncryptedSecret) -> AuthResult<String> {
        let material = self
            .key_for_version(secret.key_version)
            .ok_or(AuthError::InvalidKey)?;
        cipher::decrypt(secret, &material.key)
    }
}
