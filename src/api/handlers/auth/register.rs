//! Registration endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::auth::{AuthService, RateLimitAction, RateLimitDecision};

use super::types::RegisterRequest;
use super::{auth_error_response, client_key, rate_limited_response};

/// Submit a registration; a verification email is sent on success.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration accepted, verification email sent", body = String),
        (status = 400, description = "Invalid username, email, or password", body = String),
        (status = 409, description = "Username already exists", body = String),
        (status = 429, description = "Rate limited", body = String),
        (status = 502, description = "Verification email could not be delivered", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    // The global request budget is spent before the payload is even looked
    // at, so malformed requests cannot probe for free.
    let client = client_key(&headers);
    if let RateLimitDecision::Limited { retry_after } = service
        .rate_limiter()
        .check(&client, RateLimitAction::Register)
    {
        return rate_limited_response(retry_after);
    }

    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service
        .register(&request.username, &request.password, &request.email)
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            "Verification email sent".to_string(),
        )
            .into_response(),
        Err(err) => auth_error_response(err),
    }
}
