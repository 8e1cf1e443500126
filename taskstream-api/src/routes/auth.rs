/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/login` - Authenticate credentials and get a token pair
/// - `POST /v1/auth/verify` - Verify a token end to end
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a fresh pair
/// - `POST /v1/auth/logout` - Revoke a token and end its session
///
/// The client IP used for rate limiting and session tracking comes from
/// `X-Forwarded-For` (first hop) or `X-Real-IP`; the service is expected to
/// sit behind a trusted proxy that sets one of them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use taskstream_shared::auth::service::{Credentials, LoginOutcome};
use uuid::Uuid;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// MFA code, when the account has MFA enrolled
    pub mfa_token: Option<String>,
}

/// Verify request
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Token to verify (access or refresh)
    pub token: String,
}

/// Verify response
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// User ID
    pub user_id: Uuid,

    /// Email at issuance
    pub email: String,

    /// Role snapshot
    pub role: String,

    /// Permission snapshot
    pub permissions: Vec<String>,

    /// Session the token belongs to
    pub session_id: Uuid,

    /// Whether MFA was completed for this session
    pub mfa_verified: bool,

    /// Token expiry
    pub expires_at: DateTime<Utc>,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token to exchange
    pub refresh_token: String,
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    /// Token to revoke
    pub token: String,
}

/// Extracts the client IP from proxy headers
///
/// Falls back to `"unknown"`, which still rate-limits as a single bucket
/// rather than admitting unlimited anonymous attempts.
fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let ip = real_ip.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    "unknown".to_string()
}

/// Login handler
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {"email": "a@x.com", "password": "Secret123!"}
/// ```
///
/// Returns the token pair, a user summary, and `requires_mfa`. Failures map
/// to 401 (bad credentials), 403 (locked), 422 (validation), 429 (rate
/// limited), or 503 (session store down).
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginOutcome>> {
    request.validate()?;

    let ip = client_ip(&headers);
    let credentials = Credentials {
        email: request.email,
        password: request.password,
        mfa_token: request.mfa_token,
    };

    let outcome = state.auth.login(&credentials, &ip).await?;
    Ok(Json(outcome))
}

/// Verify handler
///
/// Runs the full verification pipeline (blacklist, signature, active
/// record, session tracking, user liveness) and returns the token payload.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let ip = client_ip(&headers);
    let claims = state.auth.verify_token(&request.token, &ip).await?;

    let expires_at = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .ok_or_else(|| ApiError::InternalError("Token carries an invalid expiry".to_string()))?;

    Ok(Json(VerifyResponse {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
        permissions: claims.permissions,
        session_id: claims.session_id,
        mfa_verified: claims.mfa_verified,
        expires_at,
    }))
}

/// Refresh handler
///
/// Rotates the presented refresh token and returns a fresh pair.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<LoginOutcome>> {
    let ip = client_ip(&headers);
    let outcome = state.auth.refresh(&request.refresh_token, &ip).await?;
    Ok(Json(outcome))
}

/// Logout handler
///
/// Revokes the token and its session; responds 204 with no body. Logging
/// out an expired token also answers 204.
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> ApiResult<StatusCode> {
    state.auth.logout(&request.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 172.16.0.1".parse().unwrap());
        headers.insert("x-real-ip", "192.168.1.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "10.0.0.1");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "192.168.1.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "192.168.1.1");
    }

    #[test]
    fn test_client_ip_unknown_without_headers() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn test_login_request_validation() {
        let bad_email = LoginRequest {
            email: "not-an-email".to_string(),
            password: "Secret123!".to_string(),
            mfa_token: None,
        };
        assert!(bad_email.validate().is_err());

        let ok = LoginRequest {
            email: "a@x.com".to_string(),
            password: "Secret123!".to_string(),
            mfa_token: None,
        };
        assert!(ok.validate().is_ok());
    }
}
