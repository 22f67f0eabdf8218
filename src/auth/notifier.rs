//! Outbound email delivery abstraction.
//!
//! The auth flows only ever see `send -> Ok | Err`; how a message actually
//! leaves the building is the notifier's business. The default for local dev
//! is [`LogNotifier`], which logs and succeeds. [`WebhookNotifier`] posts the
//! message to an HTTP mail relay.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;
use url::Url;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message or return an error so the caller can refuse to
    /// create state that depends on the delivery.
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<()>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<()> {
        info!(
            to_email = %destination,
            subject = %subject,
            body = %body,
            "email send stub"
        );
        Ok(())
    }
}

/// Sender that hands messages to an HTTP mail relay.
#[derive(Debug)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
}

impl WebhookNotifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: Url, token: Option<SecretString>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build notifier HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<()> {
        let payload = json!({
            "to": destination,
            "subject": subject,
            "body": body,
        });

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .context("failed to reach mail relay")?;

        if !response.status().is_success() {
            bail!("mail relay rejected message: {}", response.status());
        }

        Ok(())
    }
}
