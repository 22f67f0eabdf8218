//! OpenAPI document for the HTTP surface.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::handlers::auth::types::{
    LoginRequest, LoginResponse, RegisterRequest, SessionResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "varco",
        description = "Identity verification and session authentication service"
    ),
    paths(
        handlers::health::health,
        handlers::auth::register::register,
        handlers::auth::login::login,
        handlers::auth::verify::verify_email,
        handlers::auth::session::session,
        handlers::auth::session::logout,
    ),
    components(schemas(RegisterRequest, LoginRequest, LoginResponse, SessionResponse)),
    tags(
        (name = "auth", description = "Registration, verification, login, logout"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
