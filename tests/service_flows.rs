//! End-to-end flows over in-memory stores: the account state machine through
//! the service API and the HTTP surface.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{
    Request, StatusCode,
    header::{CONTENT_TYPE, COOKIE, RETRY_AFTER, SET_COOKIE},
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use varco::auth::{
    AuthConfig, AuthError, AuthService, CodeIssuer, MemoryCredentialStore, MemoryPendingStore,
    MemorySessionStore, NoopRateLimiter, Notifier, RateLimiter, WindowRateLimiter,
};

/// Captures outbound mail so tests can pull the verification code out of the
/// emailed link.
#[derive(Default)]
struct MailboxNotifier {
    bodies: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl MailboxNotifier {
    fn last_code(&self) -> Option<String> {
        let bodies = self.bodies.lock().expect("lock");
        let body = bodies.last()?;
        body.rsplit('/').next().map(str::to_string)
    }

    fn set_failing(&self, fail: bool) {
        *self.fail.lock().expect("lock") = fail;
    }
}

#[async_trait]
impl Notifier for MailboxNotifier {
    async fn send(&self, _destination: &str, _subject: &str, body: &str) -> Result<()> {
        if *self.fail.lock().expect("lock") {
            bail!("relay down");
        }
        self.bodies.lock().expect("lock").push(body.to_string());
        Ok(())
    }
}

fn service_with(rate_limiter: Arc<dyn RateLimiter>) -> (Arc<AuthService>, Arc<MailboxNotifier>) {
    let config = AuthConfig::new("http://localhost:8080".to_string());
    let mailbox = Arc::new(MailboxNotifier::default());
    let issuer = CodeIssuer::new(config.base_url().to_string(), mailbox.clone());
    let service = Arc::new(AuthService::new(
        config,
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(MemoryPendingStore::new()),
        Arc::new(MemorySessionStore::new()),
        issuer,
        rate_limiter,
    ));
    (service, mailbox)
}

fn json_post(uri: &str, body: serde_json::Value) -> Result<Request<Body>> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .context("failed to build request")
}

fn get(uri: &str) -> Result<Request<Body>> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .context("failed to build request")
}

/// Pull `name=value` out of a `Set-Cookie` header.
fn cookie_pair(response: &axum::response::Response) -> Result<String> {
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?;
    cookie
        .split(';')
        .next()
        .map(str::to_string)
        .context("empty cookie")
}

#[tokio::test]
async fn register_verify_login_logout_over_http() -> Result<()> {
    let (service, mailbox) = service_with(Arc::new(NoopRateLimiter));
    let app: Router = varco::api::router(service)?;

    // Register.
    let response = app
        .clone()
        .oneshot(json_post(
            "/v1/auth/register",
            json!({
                "username": "alice",
                "password": "securepassword123",
                "email": "alice@example.com"
            }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Login before verification: the account does not exist yet.
    let response = app
        .clone()
        .oneshot(json_post(
            "/v1/auth/login",
            json!({"username": "alice", "password": "securepassword123"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Follow the emailed link.
    let code = mailbox.last_code().context("verification code issued")?;
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/auth/verify-email/alice/{code}"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The link is single-use.
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/auth/verify-email/alice/{code}"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Login sets the session cookie.
    let response = app
        .clone()
        .oneshot(json_post(
            "/v1/auth/login",
            json!({"username": "alice", "password": "securepassword123"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_pair(&response)?;
    assert!(cookie.starts_with("varco_session="));

    // The cookie resolves to an active session.
    let mut request = get("/v1/auth/session")?;
    request
        .headers_mut()
        .insert(COOKIE, cookie.parse().context("cookie header")?);
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Logout destroys it; a second logout is harmless.
    for _ in 0..2 {
        let mut request = get("/v1/auth/logout")?;
        request
            .headers_mut()
            .insert(COOKIE, cookie.parse().context("cookie header")?);
        let response = app.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let mut request = get("/v1/auth/session")?;
    request
        .headers_mut()
        .insert(COOKIE, cookie.parse().context("cookie header")?);
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn sixth_login_attempt_is_rate_limited_over_http() -> Result<()> {
    let (service, _mailbox) = service_with(Arc::new(WindowRateLimiter::new()));
    let app: Router = varco::api::router(service)?;

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(json_post(
                "/v1/auth/login",
                json!({"username": "nobody", "password": "wrongpassword1"}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(json_post(
            "/v1/auth/login",
            json!({"username": "nobody", "password": "wrongpassword1"}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(RETRY_AFTER).is_some());

    Ok(())
}

#[tokio::test]
async fn register_rejects_invalid_username_over_http() -> Result<()> {
    let (service, _mailbox) = service_with(Arc::new(NoopRateLimiter));
    let app: Router = varco::api::router(service)?;

    let response = app
        .clone()
        .oneshot(json_post(
            "/v1/auth/register",
            json!({
                "username": "bad name!",
                "password": "securepassword123",
                "email": "bad@example.com"
            }),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn health_reports_build_info() -> Result<()> {
    let (service, _mailbox) = service_with(Arc::new(NoopRateLimiter));
    let app: Router = varco::api::router(service)?;

    let response = app.clone().oneshot(get("/health")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-App").is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_verification_is_exactly_once() -> Result<()> {
    let (service, mailbox) = service_with(Arc::new(NoopRateLimiter));
    service
        .register("frank", "securepassword123", "frank@example.com")
        .await?;
    let code = mailbox.last_code().context("verification code issued")?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let code = code.clone();
        handles.push(tokio::spawn(
            async move { service.verify_email("frank", &code).await },
        ));
    }

    let mut successes = 0;
    let mut not_found = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => successes += 1,
            Err(AuthError::NotFound) => not_found += 1,
            Err(err) => bail!("unexpected outcome: {err}"),
        }
    }
    assert_eq!(successes, 1, "exactly one verification may succeed");
    assert_eq!(not_found, 7);

    // The promoted account works.
    let login = service
        .login("frank", "securepassword123", "10.0.0.1")
        .await?;
    assert_eq!(login.session.username, "frank");
    Ok(())
}

#[tokio::test]
async fn delivery_failure_leaves_no_state_behind() -> Result<()> {
    let (service, mailbox) = service_with(Arc::new(NoopRateLimiter));
    mailbox.set_failing(true);

    let result = service
        .register("erin", "securepassword123", "erin@example.com")
        .await;
    assert!(matches!(result, Err(AuthError::DeliveryFailed)));

    // Nothing pending: verification has nothing to consume.
    let result = service.verify_email("erin", "any-code").await;
    assert!(matches!(result, Err(AuthError::NotFound)));

    mailbox.set_failing(false);
    service
        .register("erin", "securepassword123", "erin@example.com")
        .await?;
    let code = mailbox.last_code().context("verification code issued")?;
    service.verify_email("erin", &code).await?;
    Ok(())
}

#[tokio::test]
async fn reregistration_replaces_pending_record() -> Result<()> {
    let (service, mailbox) = service_with(Arc::new(NoopRateLimiter));
    service
        .register("dave", "firstpassword1", "dave@example.com")
        .await?;
    let old_code = mailbox.last_code().context("first code")?;

    // Second registration wins: new password, new code.
    service
        .register("dave", "secondpassword2", "dave@example.com")
        .await?;
    let new_code = mailbox.last_code().context("second code")?;

    let result = service.verify_email("dave", &old_code).await;
    assert!(matches!(result, Err(AuthError::InvalidCode)));
    service.verify_email("dave", &new_code).await?;

    let result = service.login("dave", "firstpassword1", "10.0.0.1").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    let login = service.login("dave", "secondpassword2", "10.0.0.1").await?;
    assert_eq!(login.session.username, "dave");
    Ok(())
}
