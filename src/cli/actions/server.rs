use crate::api;
use crate::auth::{
    AuthConfig, AuthService, CodeIssuer, CredentialStore, LogNotifier, Notifier,
    PendingRegistrationStore, SessionStore, WindowRateLimiter,
    pg::{PgCredentialStore, PgPendingStore, PgSessionStore},
    session::MemorySessionStore,
    store::{MemoryCredentialStore, MemoryPendingStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

/// Handle the server action: assemble stores, notifier, and limiter, then
/// hand the service to the HTTP layer.
///
/// # Errors
/// Returns an error if configuration is invalid, the database is
/// unreachable, or the server fails to start.
pub async fn handle(action: super::Action) -> Result<()> {
    let super::Action::Server {
        port,
        dsn,
        base_url,
        code_ttl,
        session_ttl,
        notifier_url,
        notifier_token,
    } = action;

    let config = AuthConfig::new(base_url)
        .with_code_ttl_seconds(code_ttl)
        .with_session_ttl_seconds(session_ttl);

    let notifier = build_notifier(notifier_url.as_deref(), notifier_token)?;
    let issuer = CodeIssuer::new(config.base_url().to_string(), notifier);

    let (credentials, pending, sessions) = build_stores(dsn).await?;

    let service = Arc::new(AuthService::new(
        config,
        credentials,
        pending,
        sessions,
        issuer,
        Arc::new(WindowRateLimiter::new()),
    ));

    api::new(port, service).await?;

    crate::cli::telemetry::shutdown_tracer();

    Ok(())
}

fn build_notifier(
    notifier_url: Option<&str>,
    notifier_token: Option<SecretString>,
) -> Result<Arc<dyn Notifier>> {
    match notifier_url {
        Some(endpoint) => {
            let endpoint = Url::parse(endpoint).context("invalid notifier URL")?;
            let notifier = crate::auth::WebhookNotifier::new(endpoint, notifier_token)?;
            Ok(Arc::new(notifier))
        }
        None => {
            info!("no notifier configured, verification emails will be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[allow(clippy::type_complexity)]
async fn build_stores(
    dsn: Option<String>,
) -> Result<(
    Arc<dyn CredentialStore>,
    Arc<dyn PendingRegistrationStore>,
    Arc<dyn SessionStore>,
)> {
    match dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(&dsn)
                .await
                .context("Failed to connect to database")?;
            Ok((
                Arc::new(PgCredentialStore::new(pool.clone())),
                Arc::new(PgPendingStore::new(pool.clone())),
                Arc::new(PgSessionStore::new(pool)),
            ))
        }
        None => {
            info!("no DSN configured, running on in-memory stores");
            Ok((
                Arc::new(MemoryCredentialStore::new()),
                Arc::new(MemoryPendingStore::new()),
                Arc::new(MemorySessionStore::new()),
            ))
        }
    }
}
