//! Auth endpoints: thin shells over [`crate::auth::AuthService`].

pub mod login;
pub mod register;
pub mod session;
pub mod types;
pub mod verify;

pub use login::login;
pub use register::register;
pub use session::{logout, session};
pub use verify::verify_email;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::error;

use crate::auth::AuthError;
use crate::auth::utils::extract_client_ip;

/// Client identity used for rate limiting when no proxy header names one.
const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the rate-limiting key for a request.
pub(crate) fn client_key(headers: &HeaderMap) -> String {
    extract_client_ip(headers).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub(crate) fn rate_limited_response(retry_after: Duration) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
        headers.insert(RETRY_AFTER, value);
    }
    (
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        "Rate limited".to_string(),
    )
        .into_response()
}

/// Map a core outcome to a response. Internal failures are logged here and
/// answered opaquely; everything else is a user-facing result.
pub(crate) fn auth_error_response(err: AuthError) -> Response {
    match err {
        AuthError::InvalidInput(reason) => {
            (StatusCode::BAD_REQUEST, reason.to_string()).into_response()
        }
        AuthError::Conflict => {
            (StatusCode::CONFLICT, "Username already exists".to_string()).into_response()
        }
        AuthError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()).into_response(),
        AuthError::InvalidCode => (
            StatusCode::BAD_REQUEST,
            "Invalid verification code".to_string(),
        )
            .into_response(),
        AuthError::Expired => (
            StatusCode::BAD_REQUEST,
            "Verification code expired".to_string(),
        )
            .into_response(),
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()).into_response()
        }
        AuthError::EmailNotVerified => {
            (StatusCode::FORBIDDEN, "Email not verified".to_string()).into_response()
        }
        AuthError::RateLimited { retry_after } => rate_limited_response(retry_after),
        AuthError::DeliveryFailed => (
            StatusCode::BAD_GATEWAY,
            "Failed to send verification email".to_string(),
        )
            .into_response(),
        AuthError::Internal(err) => {
            error!("auth operation failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::{
        AuthConfig, AuthService, CodeIssuer, LogNotifier, MemoryCredentialStore,
        MemoryPendingStore, MemorySessionStore, NoopRateLimiter,
    };
    use anyhow::anyhow;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    /// Service over in-memory stores with a logging notifier, for handler
    /// tests.
    pub(crate) fn test_service() -> Arc<AuthService> {
        let config = AuthConfig::new("http://localhost:8080".to_string());
        let issuer = CodeIssuer::new(config.base_url().to_string(), Arc::new(LogNotifier));
        Arc::new(AuthService::new(
            config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryPendingStore::new()),
            Arc::new(MemorySessionStore::new()),
            issuer,
            Arc::new(NoopRateLimiter),
        ))
    }

    #[test]
    fn client_key_defaults_to_unknown() {
        assert_eq!(client_key(&HeaderMap::new()), "unknown");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_key(&headers), "9.9.9.9");
    }

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let response = rate_limited_response(Duration::from_secs(30));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER),
            Some(&HeaderValue::from_static("30"))
        );
    }

    #[test]
    fn error_mapping_covers_the_taxonomy() {
        assert_eq!(
            auth_error_response(AuthError::Conflict).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            auth_error_response(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_error_response(AuthError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            auth_error_response(AuthError::DeliveryFailed).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            auth_error_response(AuthError::Internal(anyhow!("boom"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
