//! Verification-code issuance.
//!
//! Codes are 256-bit values from the OS generator, far past anything
//! guessable within the login rate budget. `issue` only reports success once
//! the notifier has accepted the message, so callers can make pending state
//! conditional on delivery.

use std::sync::Arc;
use tracing::warn;

use super::error::AuthError;
use super::notifier::Notifier;
use super::utils::{build_verify_url, generate_verification_code};

const VERIFY_SUBJECT: &str = "Verify your email";

/// Generates verification codes and hands the one-click link to a notifier.
pub struct CodeIssuer {
    base_url: String,
    notifier: Arc<dyn Notifier>,
}

impl CodeIssuer {
    #[must_use]
    pub fn new(base_url: String, notifier: Arc<dyn Notifier>) -> Self {
        Self { base_url, notifier }
    }

    /// Generate a fresh code and deliver the verification link for it.
    ///
    /// The raw code is returned exactly once, for the caller to store as a
    /// hash. Nothing is persisted here.
    ///
    /// # Errors
    /// `AuthError::DeliveryFailed` when the notifier refuses the message;
    /// `AuthError::Internal` when code generation itself fails.
    pub async fn issue(&self, username: &str, email: &str) -> Result<String, AuthError> {
        let code = generate_verification_code()?;
        let link = build_verify_url(&self.base_url, username, &code);
        let body = format!("Click the following link to verify your email: {link}");

        if let Err(err) = self.notifier.send(email, VERIFY_SUBJECT, &body).await {
            warn!("verification email for {username} not delivered: {err}");
            return Err(AuthError::DeliveryFailed);
        }

        Ok(code)
    }
}
