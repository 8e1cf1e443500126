/// Error handling for the API server
///
/// Provides a unified error type that maps to HTTP responses. All handlers
/// return `Result<T, ApiError>` which converts automatically to the right
/// status code and a JSON body.
///
/// Credential and token failures are rendered with fixed generic messages:
/// the response never reveals whether the email, the password, or the token
/// state was the problem.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskstream_shared::error::AuthError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    RateLimitExceeded {
        retry_after: u64,
        message: String,
    },

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "unauthorized", "rate_limit_exceeded")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Rate limits carry a Retry-After header alongside the body
        if let ApiError::RateLimitExceeded { retry_after, message } = &self {
            let body = Json(ErrorResponse {
                error: "rate_limit_exceeded".to_string(),
                message: message.clone(),
                details: None,
            });

            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            return response;
        }

        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::RateLimitExceeded { message, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                message,
                None,
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but never expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Maps auth core errors onto HTTP responses
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "request".to_string(),
                message: msg,
            }]),
            AuthError::Authentication => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::InvalidSignature | AuthError::TokenRevoked => {
                ApiError::Unauthorized("Invalid token".to_string())
            }
            AuthError::ExpiredToken => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::AccountLocked => ApiError::Forbidden(
                "Account locked after repeated failed login attempts".to_string(),
            ),
            AuthError::RateLimited { retry_after } => ApiError::RateLimitExceeded {
                retry_after,
                message: "Too many login attempts, please try again later".to_string(),
            },
            AuthError::StoreUnavailable => ApiError::ServiceUnavailable(
                "Authentication service temporarily unavailable".to_string(),
            ),
            AuthError::InvalidKey | AuthError::Integrity => {
                ApiError::InternalError(err.to_string())
            }
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Converts validator output into field-level details
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");
    }

    #[test]
    fn test_credential_failures_render_generic_message() {
        let err = ApiError::from(AuthError::Authentication);
        match err {
            ApiError::Unauthorized(msg) => assert_eq!(msg, "Invalid email or password"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_revoked_and_forged_tokens_are_indistinguishable() {
        let forged = ApiError::from(AuthError::InvalidSignature);
        let revoked = ApiError::from(AuthError::TokenRevoked);
        assert_eq!(forged.to_string(), revoked.to_string());
    }

    #[test]
    fn test_rate_limit_mapping_carries_retry_after() {
        let err = ApiError::from(AuthError::RateLimited { retry_after: 300 });
        match err {
            ApiError::RateLimitExceeded { retry_after, .. } => assert_eq!(retry_after, 300),
            other => panic!("expected RateLimitExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_store_outage_maps_to_unavailable() {
        let err = ApiError::from(AuthError::StoreUnavailable);
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }
}
