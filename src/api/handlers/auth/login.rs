//! Login endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::auth::{AuthService, RateLimitAction, RateLimitDecision};

use super::session::session_cookie;
use super::types::{LoginRequest, LoginResponse};
use super::{auth_error_response, client_key, rate_limited_response};

/// Authenticate and set the session cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 403, description = "Email not verified", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let client = client_key(&headers);

    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            // A garbage request is still an attempt; spend window budget so
            // malformed traffic cannot probe around the limiter.
            if let RateLimitDecision::Limited { retry_after } = service
                .rate_limiter()
                .check(&client, RateLimitAction::Login)
            {
                return rate_limited_response(retry_after);
            }
            return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
        }
    };

    // The service consults the rate limiter before touching any store.
    match service
        .login(&request.username, &request.password, &client)
        .await
    {
        Ok(success) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = session_cookie(service.config(), &success.token) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            let body = LoginResponse {
                username: success.session.username,
            };
            (StatusCode::OK, response_headers, Json(body)).into_response()
        }
        Err(err) => auth_error_response(err),
    }
}
