//! Email verification endpoint, reached from the one-click link.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::auth::{AuthService, RateLimitAction, RateLimitDecision};

use super::{auth_error_response, client_key, rate_limited_response};

/// Consume the verification code and activate the account.
#[utoipa::path(
    get,
    path = "/v1/auth/verify-email/{username}/{code}",
    params(
        ("username" = String, Path, description = "Username the code was issued for"),
        ("code" = String, Path, description = "Single-use verification code")
    ),
    responses(
        (status = 204, description = "Email verified"),
        (status = 400, description = "Invalid or expired code", body = String),
        (status = 404, description = "No pending registration", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
    Path((username, code)): Path<(String, String)>,
) -> impl IntoResponse {
    // Rate limits are enforced before any code work to avoid amplification.
    let client = client_key(&headers);
    if let RateLimitDecision::Limited { retry_after } = service
        .rate_limiter()
        .check(&client, RateLimitAction::VerifyEmail)
    {
        return rate_limited_response(retry_after);
    }

    let code = code.trim();
    if code.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing code".to_string()).into_response();
    }

    match service.verify_email(&username, code).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => auth_error_response(err),
    }
}
