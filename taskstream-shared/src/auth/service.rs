/// Authentication orchestrator
///
/// `AuthService` wires the rate limiter, user store, password verifier,
/// token issuer, and token store gateway into the four auth operations:
/// login, verify, refresh, and logout.
///
/// Failure policy:
///
/// - Credential failures (unknown user, wrong password, inactive account)
///   all surface as the generic `AuthError::Authentication` so callers
///   cannot probe which factor failed.
/// - Store persistence is mandatory. If token records cannot be written or
///   read, the operation fails with `StoreUnavailable` rather than letting
///   an untracked token into circulation.
/// - Lockout is checked after password verification: an attacker cannot
///   learn whether a password was correct by watching for the locked
///   response, and a legitimate user with correct credentials still sees
///   `AccountLocked` until an operator resets the counter.

use crate::auth::password::verify_password;
use crate::auth::token::{issue_pair, verify, TokenConfig, TokenPair, TokenType};
use crate::error::{AuthError, AuthResult};
use crate::metrics::AuthMetrics;
use crate::models::user::{User, UserStore};
use crate::ratelimit::LoginRateLimiter;
use crate::store::tokens::{SessionTokenRecord, TokenStatus, TokenStoreGateway};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Token lifetimes and issuer
    pub tokens: TokenConfig,

    /// Failed-attempt count above which the account locks
    pub max_failed_attempts: i32,

    /// HS256 signing secret
    pub jwt_secret: String,
}

impl AuthServiceConfig {
    /// Default policy with the given signing secret
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            tokens: TokenConfig::default(),
            max_failed_attempts: 10,
            jwt_secret: jwt_secret.into(),
        }
    }
}

/// Login request payload
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,

    /// Plaintext password (verified, never stored or logged)
    pub password: String,

    /// MFA code, when the account has MFA enrolled
    pub mfa_token: Option<String>,
}

/// Non-sensitive user fields returned alongside tokens
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Role string
    pub role: String,

    /// Permission identifiers
    pub permissions: Vec<String>,

    /// Whether MFA is enrolled on the account
    pub mfa_enabled: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            permissions: user.permissions.clone(),
            mfa_enabled: user.mfa_enabled,
        }
    }
}

/// Successful login response
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    /// Issued token pair
    #[serde(flatten)]
    pub tokens: TokenPair,

    /// Non-sensitive account summary
    pub user: UserSummary,

    /// Whether the session still needs an MFA step-up
    pub requires_mfa: bool,
}

/// Authentication service
///
/// Cheap to clone; all members are shared handles.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenStoreGateway,
    limiter: LoginRateLimiter,
    metrics: Arc<AuthMetrics>,
    config: Arc<AuthServiceConfig>,
}

impl AuthService {
    /// Creates the service from its collaborators
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenStoreGateway,
        limiter: LoginRateLimiter,
        metrics: Arc<AuthMetrics>,
        config: AuthServiceConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            limiter,
            metrics,
            config: Arc::new(config),
        }
    }

    /// Metrics counters
    pub fn metrics(&self) -> &AuthMetrics {
        &self.metrics
    }

    /// Authenticates credentials and issues a token pair
    ///
    /// Pipeline: rate limit → user lookup → password verify → lockout check
    /// → token issuance → record persistence.
    ///
    /// # Errors
    ///
    /// - `Validation` for empty email or password
    /// - `RateLimited` when the IP's attempt budget is exhausted
    /// - `Authentication` for unknown user, wrong password, or inactive
    ///   account (deliberately indistinguishable)
    /// - `AccountLocked` when the failure streak exceeds the limit; there is
    ///   no in-band unlock, the counter is reset through the
    ///   user-management subsystem
    /// - `StoreUnavailable` when limits or records cannot be read or written
    pub async fn login(&self, credentials: &Credentials, ip: &str) -> AuthResult<LoginOutcome> {
        if credentials.email.trim().is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        if credentials.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        if let Err(e) = self.limiter.consume(ip).await {
            match &e {
                AuthError::RateLimited { .. } => self.metrics.incr_rate_limited(),
                _ => self.metrics.incr_store_errors(),
            }
            return Err(e);
        }

        let Some(mut user) = self.users.find_by_email(&credentials.email).await? else {
            self.metrics.incr_login_failure();
            tracing::warn!(client_ip = ip, "Login failed: unknown account");
            return Err(AuthError::Authentication);
        };

        if !verify_password(&credentials.password, &user.password_hash)? {
            user.failed_login_attempts += 1;
            user.last_failed_login = Some(Utc::now());
            self.users.save(&user).await?;

            self.metrics.incr_login_failure();
            tracing::warn!(
                user_id = %user.id,
                client_ip = ip,
                failed_attempts = user.failed_login_attempts,
                "Login failed: password mismatch"
            );
            return Err(AuthError::Authentication);
        }

        // Correct password, but the streak already crossed the limit. Do not
        // reset the counter here.
        if user.failed_login_attempts > self.config.max_failed_attempts {
            self.metrics.incr_account_locked();
            tracing::warn!(
                user_id = %user.id,
                client_ip = ip,
                failed_attempts = user.failed_login_attempts,
                "Login refused: account locked"
            );
            return Err(AuthError::AccountLocked);
        }

        if !user.is_active {
            self.metrics.incr_login_failure();
            tracing::warn!(user_id = %user.id, client_ip = ip, "Login failed: inactive account");
            return Err(AuthError::Authentication);
        }

        // MFA code validation belongs to the MFA subsystem; this service
        // only threads the session's verification state into the claims.
        let mfa_verified = user.mfa_enabled && credentials.mfa_token.is_some();
        let requires_mfa = user.mfa_enabled && !mfa_verified;

        let pair = issue_pair(&user, mfa_verified, &self.config.tokens, &self.config.jwt_secret)?;

        // Persist before touching the user row: an untracked token must
        // never reach the client.
        self.persist_pair(&pair, ip).await?;

        user.failed_login_attempts = 0;
        user.last_login = Some(Utc::now());
        self.users.save(&user).await?;

        self.metrics.incr_login_success();
        self.metrics.incr_tokens_issued();
        tracing::info!(
            user_id = %user.id,
            session_id = %pair.session_id,
            client_ip = ip,
            requires_mfa,
            "Login succeeded"
        );

        Ok(LoginOutcome {
            user: UserSummary::from(&user),
            tokens: pair,
            requires_mfa,
        })
    }

    /// Writes the store records for a freshly issued pair
    async fn persist_pair(&self, pair: &TokenPair, ip: &str) -> AuthResult<()> {
        let now = Utc::now();

        let access_record = SessionTokenRecord {
            token_id: pair.session_id,
            status: TokenStatus::Active,
            expires_at: now + Duration::seconds(self.config.tokens.access_ttl_secs as i64),
        };
        let refresh_record = SessionTokenRecord {
            token_id: pair.session_id,
            status: TokenStatus::Active,
            expires_at: now + Duration::seconds(self.config.tokens.refresh_ttl_secs as i64),
        };

        self.tokens
            .save_record(&pair.access_token, &access_record, self.config.tokens.access_ttl_secs)
            .await?;
        self.tokens
            .save_record(
                &pair.refresh_token,
                &refresh_record,
                self.config.tokens.refresh_ttl_secs,
            )
            .await?;

        // Session IP lives as long as the refresh token can
        self.tokens
            .save_session_ip(&pair.session_id, ip, self.config.tokens.refresh_ttl_secs)
            .await
    }

    /// Verifies a token end to end and returns its claims
    ///
    /// Pipeline: blacklist → signature/expiry → active record → session IP
    /// presence → user liveness. A missing record means the token was
    /// revoked and its record has already expired, or it was never issued
    /// here; both are rejected.
    pub async fn verify_token(
        &self,
        token: &str,
        ip: &str,
    ) -> AuthResult<crate::auth::token::Claims> {
        if self.tokens.is_revoked(token).await? {
            self.metrics.incr_tokens_rejected();
            tracing::warn!(client_ip = ip, "Token rejected: blacklisted");
            return Err(AuthError::TokenRevoked);
        }

        let claims = verify(token, &self.config.jwt_secret, &self.config.tokens.issuer)
            .inspect_err(|_| self.metrics.incr_tokens_rejected())?;

        let Some(record) = self.tokens.record(token).await? else {
            self.metrics.incr_tokens_rejected();
            tracing::warn!(
                session_id = %claims.session_id,
                client_ip = ip,
                "Token rejected: no active record"
            );
            return Err(AuthError::TokenRevoked);
        };

        if record.status != TokenStatus::Active {
            self.metrics.incr_tokens_rejected();
            tracing::warn!(
                session_id = %claims.session_id,
                status = ?record.status,
                "Token rejected: retired record"
            );
            return Err(AuthError::TokenRevoked);
        }

        match self.tokens.session_ip(&claims.session_id).await? {
            None => {
                self.metrics.incr_tokens_rejected();
                tracing::warn!(
                    session_id = %claims.session_id,
                    "Token rejected: session tracking expired"
                );
                return Err(AuthError::TokenRevoked);
            }
            Some(origin_ip) if origin_ip != ip => {
                // Flagged, not fatal: mobile clients roam between networks
                tracing::warn!(
                    session_id = %claims.session_id,
                    origin_ip,
                    client_ip = ip,
                    "Token presented from a different IP"
                );
            }
            Some(_) => {}
        }

        let Some(user) = self.users.find_by_id(claims.sub).await? else {
            self.metrics.incr_tokens_rejected();
            return Err(AuthError::Authentication);
        };
        if !user.is_active {
            self.metrics.incr_tokens_rejected();
            tracing::warn!(user_id = %user.id, "Token rejected: inactive account");
            return Err(AuthError::Authentication);
        }

        self.metrics.incr_tokens_verified();
        Ok(claims)
    }

    /// Exchanges a refresh token for a fresh pair
    ///
    /// The presented token goes through the full verification pipeline,
    /// then rotates: its record is marked `Rotated`, the token is
    /// blacklisted, and a new pair is issued from a fresh user snapshot.
    pub async fn refresh(&self, refresh_token: &str, ip: &str) -> AuthResult<LoginOutcome> {
        let claims = self.verify_token(refresh_token, ip).await?;

        if claims.token_type != TokenType::Refresh {
            self.metrics.incr_tokens_rejected();
            return Err(AuthError::Validation("Expected a refresh token".to_string()));
        }

        // Fresh snapshot so rotated tokens pick up role/permission changes
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::Authentication)?;

        let pair = issue_pair(
            &user,
            claims.mfa_verified,
            &self.config.tokens,
            &self.config.jwt_secret,
        )?;
        self.persist_pair(&pair, ip).await?;

        self.tokens
            .rotate(refresh_token, claims.remaining_ttl_secs())
            .await?;

        self.metrics.incr_tokens_issued();
        tracing::info!(
            user_id = %user.id,
            old_session = %claims.session_id,
            new_session = %pair.session_id,
            "Refresh token rotated"
        );

        Ok(LoginOutcome {
            user: UserSummary::from(&user),
            tokens: pair,
            requires_mfa: false,
        })
    }

    /// Revokes a token and ends its session
    ///
    /// Idempotent in the ways that matter: logging out an already-expired
    /// token succeeds silently (there is nothing left to revoke), and a
    /// second logout of the same token is a no-op re-blacklist.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` for a token this service never signed
    /// - `StoreUnavailable` when the blacklist cannot be written
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let claims = match verify(token, &self.config.jwt_secret, &self.config.tokens.issuer) {
            Ok(claims) => claims,
            Err(AuthError::ExpiredToken) => {
                tracing::debug!("Logout of expired token: nothing to revoke");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.tokens
            .revoke(token, claims.remaining_ttl_secs())
            .await?;

        // Dropping the session IP invalidates the paired token too
        self.tokens.delete_session_ip(&claims.session_id).await?;

        self.metrics.incr_tokens_revoked();
        tracing::info!(
            user_id = %claims.sub,
            session_id = %claims.session_id,
            "Session revoked"
        );
        Ok(())
    }
}
