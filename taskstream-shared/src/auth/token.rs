/// JWT issuance and verification
///
/// Session tokens are HS256-signed and time-bound. Every login issues a
/// fresh access/refresh pair sharing one `session_id`; the payload carries a
/// role/permissions snapshot taken at issuance time and is immutable once
/// signed: a new payload means a new token (rotation), never in-place
/// mutation.
///
/// Expiry and signature failures are distinct errors so callers can decide
/// between a silent refresh and a re-login prompt.
///
/// # Example
///
/// ```
/// use taskstream_shared::auth::token::{issue_pair, verify, TokenConfig};
/// use taskstream_shared::models::user::{User, UserRole};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::new("a@x.com", "$argon2id$...", UserRole::Member);
/// let config = TokenConfig::default();
/// let secret = "test-secret-key-at-least-32-bytes-long";
///
/// let pair = issue_pair(&user, false, &config, secret)?;
/// let claims = verify(&pair.access_token, secret, &config.issuer)?;
/// assert_eq!(claims.sub, user.id);
/// # Ok(())
/// # }
/// ```

use crate::error::{AuthError, AuthResult};
use crate::models::user::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token presented on every API call
    Access,

    /// Long-lived token exchanged for a fresh pair
    Refresh,
}

impl TokenType {
    /// Token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Token lifetime and issuer configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,

    /// Expected `iss` claim
    pub issuer: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 3600,           // 1 hour
            refresh_ttl_secs: 7 * 24 * 3600, // 7 days
            issuer: "taskstream".to_string(),
        }
    }
}

/// Signed token payload
///
/// Role and permissions are snapshots from issuance time. They can go stale
/// until the next rotation; that staleness is a deliberate trade-off for not
/// re-deriving authorization on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,

    /// User email at issuance
    pub email: String,

    /// Role snapshot
    pub role: String,

    /// Permission snapshot
    pub permissions: Vec<String>,

    /// Session this token belongs to (shared by the pair)
    pub session_id: Uuid,

    /// Whether MFA was completed for this session
    pub mfa_verified: bool,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Access or refresh
    pub token_type: TokenType,
}

impl Claims {
    /// Builds claims for a user with the given lifetime
    pub fn new(
        user: &User,
        session_id: Uuid,
        mfa_verified: bool,
        token_type: TokenType,
        ttl_secs: u64,
        issuer: &str,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + Duration::seconds(ttl_secs as i64);

        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            permissions: user.permissions.clone(),
            session_id,
            mfa_verified,
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            token_type,
        }
    }

    /// Seconds until this token expires (zero if already expired)
    pub fn remaining_ttl_secs(&self) -> u64 {
        let now = Utc::now().timestamp();
        self.exp.saturating_sub(now).max(0) as u64
    }
}

/// An issued access/refresh pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (JWT)
    pub access_token: String,

    /// Refresh token (JWT)
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: u64,

    /// Session shared by both tokens
    pub session_id: Uuid,
}

/// Signs a single token from claims
///
/// # Errors
///
/// Returns `AuthError::Internal` if encoding fails.
pub fn sign(claims: &Claims, secret: &str) -> AuthResult<String> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
}

/// Issues a fresh access/refresh pair for a user
///
/// Both tokens share a newly generated `session_id` and carry the user's
/// role/permissions snapshot.
pub fn issue_pair(
    user: &User,
    mfa_verified: bool,
    config: &TokenConfig,
    secret: &str,
) -> AuthResult<TokenPair> {
    let session_id = Uuid::new_v4();

    let access_claims = Claims::new(
        user,
        session_id,
        mfa_verified,
        TokenType::Access,
        config.access_ttl_secs,
        &config.issuer,
    );
    let refresh_claims = Claims::new(
        user,
        session_id,
        mfa_verified,
        TokenType::Refresh,
        config.refresh_ttl_secs,
        &config.issuer,
    );

    let access_token = sign(&access_claims, secret)?;
    let refresh_token = sign(&refresh_claims, secret)?;

    tracing::debug!(user_id = %user.id, session_id = %session_id, "Issued token pair");

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: config.access_ttl_secs,
        session_id,
    })
}

/// Verifies signature, expiry, and issuer of a token
///
/// # Errors
///
/// - `AuthError::ExpiredToken` when the token is past `exp`
/// - `AuthError::InvalidSignature` for any other verification failure
///   (bad signature, malformed token, wrong issuer), deliberately not
///   distinguished further
pub fn verify(token: &str, secret: &str, issuer: &str) -> AuthResult<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidSignature,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn test_user() -> User {
        let mut user = User::new("a@x.com", "$argon2id$...", UserRole::Member);
        user.permissions = vec!["tasks:read".to_string(), "tasks:write".to_string()];
        user
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let user = test_user();
        let config = TokenConfig::default();

        let pair = issue_pair(&user, false, &config, SECRET).unwrap();
        assert_eq!(pair.expires_in, 3600);

        let access = verify(&pair.access_token, SECRET, &config.issuer).unwrap();
        assert_eq!(access.sub, user.id);
        assert_eq!(access.email, user.email);
        assert_eq!(access.permissions, user.permissions);
        assert_eq!(access.token_type, TokenType::Access);
        assert!(!access.mfa_verified);

        let refresh = verify(&pair.refresh_token, SECRET, &config.issuer).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(refresh.session_id, access.session_id);
    }

    #[test]
    fn test_verify_wrong_secret_is_invalid_signature() {
        let pair = issue_pair(&test_user(), false, &TokenConfig::default(), SECRET).unwrap();

        let result = verify(&pair.access_token, "another-secret-of-sufficient-len", "taskstream");
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_verify_garbage_is_invalid_signature() {
        let result = verify("not.a.jwt", SECRET, "taskstream");
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_verify_wrong_issuer_rejected() {
        let user = test_user();
        let config = TokenConfig {
            issuer: "someone-else".to_string(),
            ..TokenConfig::default()
        };
        let pair = issue_pair(&user, false, &config, SECRET).unwrap();

        let result = verify(&pair.access_token, SECRET, "taskstream");
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token_is_distinct_error() {
        let user = test_user();
        let session_id = Uuid::new_v4();
        let mut claims = Claims::new(
            &user,
            session_id,
            false,
            TokenType::Access,
            3600,
            "taskstream",
        );
        // Force the token into the past, beyond jsonwebtoken's default leeway
        claims.iat -= 7200;
        claims.exp -= 7200;

        let token = sign(&claims, SECRET).unwrap();
        let result = verify(&token, SECRET, "taskstream");
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_remaining_ttl() {
        let user = test_user();
        let claims = Claims::new(
            &user,
            Uuid::new_v4(),
            false,
            TokenType::Access,
            3600,
            "taskstream",
        );
        let remaining = claims.remaining_ttl_secs();
        assert!(remaining > 3590 && remaining <= 3600);
    }

    #[test]
    fn test_mfa_flag_carried_in_claims() {
        let user = test_user();
        let pair = issue_pair(&user, true, &TokenConfig::default(), SECRET).unwrap();
        let claims = verify(&pair.access_token, SECRET, "taskstream").unwrap();
        assert!(claims.mfa_verified);
    }

    #[test]
    fn test_pairs_get_distinct_sessions() {
        let user = test_user();
        let config = TokenConfig::default();
        let a = issue_pair(&user, false, &config, SECRET).unwrap();
        let b = issue_pair(&user, false, &config, SECRET).unwrap();
        assert_ne!(a.session_id, b.session_id);
    }
}
