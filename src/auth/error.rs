//! Error taxonomy for the account and session flows.
//!
//! Every variant except `Internal` is a recoverable, user-facing outcome that
//! the transport layer maps to a response. `Internal` wraps unexpected storage
//! or I/O failures; callers log it and answer with an opaque error so no
//! internal detail reaches the end user.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed username, email, or password. User-correctable.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// The username is already taken by a verified account.
    #[error("Username already exists")]
    Conflict,

    /// No account, pending registration, or session for the given key.
    #[error("Not found")]
    NotFound,

    /// The presented verification code does not match the issued one.
    #[error("Invalid verification code")]
    InvalidCode,

    /// The verification code was issued too long ago.
    #[error("Verification code expired")]
    Expired,

    /// Unknown username or wrong password. Deliberately undifferentiated so
    /// login responses cannot be used to enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The account exists but its email was never verified.
    #[error("Email not verified")]
    EmailNotVerified,

    /// Too many attempts from this client; retry after the window resets.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The notifier could not deliver the verification email. No partial
    /// registration state is left behind.
    #[error("Failed to deliver verification email")]
    DeliveryFailed,

    /// Unexpected storage or I/O failure. Not exposed to end users.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// True when the outcome is safe to show to the end user as-is.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
