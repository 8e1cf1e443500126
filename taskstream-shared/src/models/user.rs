/// User entity and data-access interface
///
/// The user table is owned by the external user-management subsystem; the
/// auth core consumes it through the [`UserStore`] trait and mutates only the
/// login-tracking fields (`failed_login_attempts`, `last_login`,
/// `last_failed_login`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role VARCHAR(32) NOT NULL DEFAULT 'member',
///     permissions TEXT[] NOT NULL DEFAULT '{}',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     failed_login_attempts INTEGER NOT NULL DEFAULT 0,
///     last_login TIMESTAMPTZ,
///     last_failed_login TIMESTAMPTZ,
///     mfa_enabled BOOLEAN NOT NULL DEFAULT FALSE,
///     mfa_secret VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     version INTEGER NOT NULL DEFAULT 1
/// );
/// ```

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// User role within the platform
///
/// Stored as a string column; unknown values parse to `Member` so a schema
/// addition in the user-management service cannot break token issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform administrator
    Admin,

    /// Project manager (can manage projects and members)
    ProjectManager,

    /// Regular team member
    Member,

    /// Read-only access
    Viewer,
}

impl UserRole {
    /// Role as its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::ProjectManager => "project_manager",
            UserRole::Member => "member",
            UserRole::Viewer => "viewer",
        }
    }

    /// Parses a stored role string, defaulting unknown values to `Member`
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            "project_manager" => UserRole::ProjectManager,
            "viewer" => UserRole::Viewer,
            _ => UserRole::Member,
        }
    }
}

/// User account record
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The
/// `version` column provides optimistic concurrency for login-tracking
/// updates racing with profile edits from the user-management service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Argon2id password hash (PHC string format)
    pub password_hash: String,

    /// Role string (see [`UserRole::parse`])
    pub role: String,

    /// Permission identifiers snapshot into issued tokens
    pub permissions: Vec<String>,

    /// Inactive accounts cannot log in and their tokens fail liveness checks
    pub is_active: bool,

    /// Consecutive failed login attempts since the last success
    pub failed_login_attempts: i32,

    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,

    /// Last failed login attempt
    pub last_failed_login: Option<DateTime<Utc>>,

    /// Whether the account has MFA enrolled
    pub mfa_enabled: bool,

    /// Encrypted MFA seed, managed by the MFA subsystem
    pub mfa_secret: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency version
    pub version: i32,
}

impl User {
    /// Creates a new active user record with login tracking zeroed
    ///
    /// Used by tests and seeding; account creation itself belongs to the
    /// user-management subsystem.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: role.as_str().to_string(),
            permissions: Vec::new(),
            is_active: true,
            failed_login_attempts: 0,
            last_login: None,
            last_failed_login: None,
            mfa_enabled: false,
            mfa_secret: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Parsed role
    pub fn role(&self) -> UserRole {
        UserRole::parse(&self.role)
    }
}

/// Data-access interface for user records
///
/// Implemented over Postgres in production ([`PgUserStore`]) and in memory
/// for tests and local runs ([`MemoryUserStore`]).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Finds a user by ID
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Persists login-tracking mutations on an existing user
    ///
    /// Bumps `version` and `updated_at`; fails with `AuthError::Internal` if
    /// the row was concurrently modified.
    async fn save(&self, user: &User) -> AuthResult<()>;
}

/// Postgres-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Creates a store over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, permissions, is_active,
                   failed_login_attempts, last_login, last_failed_login,
                   mfa_enabled, mfa_secret, created_at, updated_at, version
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, permissions, is_active,
                   failed_login_attempts, last_login, last_failed_login,
                   mfa_enabled, mfa_secret, created_at, updated_at, version
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = $3,
                last_login = $4,
                last_failed_login = $5,
                updated_at = NOW(),
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(user.id)
        .bind(user.version)
        .bind(user.failed_login_attempts)
        .bind(user.last_login)
        .bind(user.last_failed_login)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::Internal(format!(
                "Concurrent modification of user {}",
                user.id
            )));
        }

        Ok(())
    }
}

/// In-memory user store for tests and local development
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user directly, bypassing version checks (seeding)
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) if existing.version == user.version => {
                let mut updated = user.clone();
                updated.version += 1;
                updated.updated_at = Utc::now();
                *existing = updated;
                Ok(())
            }
            Some(existing) => Err(AuthError::Internal(format!(
                "Concurrent modification of user {} (have v{}, saw v{})",
                user.id, existing.version, user.version
            ))),
            None => Err(AuthError::Internal(format!("User {} not found", user.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [
            UserRole::Admin,
            UserRole::ProjectManager,
            UserRole::Member,
            UserRole::Viewer,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), role);
        }
    }

    #[test]
    fn test_unknown_role_defaults_to_member() {
        assert_eq!(UserRole::parse("superuser"), UserRole::Member);
        assert_eq!(UserRole::parse(""), UserRole::Member);
    }

    #[test]
    fn test_new_user_is_active_with_zero_failures() {
        let user = User::new("a@x.com", "$argon2id$...", UserRole::Member);
        assert!(user.is_active);
        assert_eq!(user.failed_login_attempts, 0);
        assert_eq!(user.version, 1);
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_find_by_email_case_insensitive() {
        let store = MemoryUserStore::new();
        store
            .insert(User::new("User@Example.com", "hash", UserRole::Member))
            .await;

        let found = store.find_by_email("user@example.com").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_memory_store_save_bumps_version() {
        let store = MemoryUserStore::new();
        let user = User::new("a@x.com", "hash", UserRole::Member);
        let id = user.id;
        store.insert(user.clone()).await;

        let mut loaded = store.find_by_id(id).await.unwrap().unwrap();
        loaded.failed_login_attempts = 3;
        store.save(&loaded).await.unwrap();

        let reloaded = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.failed_login_attempts, 3);
        assert_eq!(reloaded.version, 2);
    }

    #[tokio::test]
    async fn test_memory_store_save_detects_stale_version() {
        let store = MemoryUserStore::new();
        let user = User::new("a@x.com", "hash", UserRole::Member);
        let id = user.id;
        store.insert(user).await;

        let stale = store.find_by_id(id).await.unwrap().unwrap();
        let mut first = stale.clone();
        first.failed_login_attempts = 1;
        store.save(&first).await.unwrap();

        // Second save with the old version must fail
        let result = store.save(&stale).await;
        assert!(result.is_err());
    }
}
