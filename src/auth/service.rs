//! Registration, verification, login, and logout orchestration.
//!
//! Usernames move `Unregistered -> PendingVerification -> Verified`. The
//! service owns no storage itself; it drives the injected stores and holds a
//! per-username lock around the pending-to-verified move so a code can never
//! be consumed twice.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::code::CodeIssuer;
use super::error::AuthError;
use super::rate_limit::{RateLimitAction, RateLimitDecision, RateLimiter};
use super::session::{Session, SessionStore};
use super::state::AuthConfig;
use super::store::{CredentialStore, PendingRegistration, PendingRegistrationStore, PutOutcome};
use super::utils::{
    hash_session_token, hash_verification_code, normalize_email, unix_now, valid_email,
    valid_password, valid_username,
};
use super::{password, utils};

// Unused per-username locks are swept once the map grows past this.
const LOCK_PRUNE_THRESHOLD: usize = 256;

/// Raw token plus the record it references. The token leaves the service
/// exactly once, here; stores only ever hold its hash.
#[derive(Clone, Debug)]
pub struct LoginSuccess {
    pub token: String,
    pub session: Session,
}

pub struct AuthService {
    config: AuthConfig,
    credentials: Arc<dyn CredentialStore>,
    pending: Arc<dyn PendingRegistrationStore>,
    sessions: Arc<dyn SessionStore>,
    issuer: CodeIssuer,
    rate_limiter: Arc<dyn RateLimiter>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        pending: Arc<dyn PendingRegistrationStore>,
        sessions: Arc<dyn SessionStore>,
        issuer: CodeIssuer,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            credentials,
            pending,
            sessions,
            issuer,
            rate_limiter,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    /// Submit a registration. On success the username is pending verification
    /// and a code is on its way to the mailbox; on `DeliveryFailed` nothing
    /// was written anywhere.
    ///
    /// # Errors
    /// `InvalidInput`, `Conflict`, `DeliveryFailed`, or `Internal`.
    pub async fn register(
        &self,
        username: &str,
        password_plain: &str,
        email: &str,
    ) -> Result<(), AuthError> {
        let username = username.trim();
        if !valid_username(username) {
            return Err(AuthError::InvalidInput(
                "username may only contain ASCII letters, digits, and underscore",
            ));
        }
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidInput("email address is malformed"));
        }
        if !valid_password(password_plain) {
            return Err(AuthError::InvalidInput(
                "password must be between 8 and 128 characters",
            ));
        }

        if self.credentials.exists(username).await? {
            return Err(AuthError::Conflict);
        }

        let password_hash = password::hash_password(password_plain)?;

        // The notifier may be slow or down; talk to it before taking the
        // username lock and before writing anything. A failed send must leave
        // the username exactly as it was.
        let code = self.issuer.issue(username, &email).await?;

        let record = PendingRegistration {
            username: username.to_string(),
            password_hash,
            email,
            code_hash: hash_verification_code(&code),
            issued_at_unix: unix_now(),
        };

        let lock = self.user_lock(username).await;
        let _guard = lock.lock().await;
        // The username may have been verified while the email was in flight.
        if self.credentials.exists(username).await? {
            return Err(AuthError::Conflict);
        }
        // Upsert: a re-registration replaces the old record and its code.
        self.pending.put(record).await?;
        Ok(())
    }

    /// Consume a verification code and promote the pending registration to a
    /// verified account. Exactly one of any set of concurrent calls with the
    /// same valid code succeeds; the rest observe `NotFound`.
    ///
    /// # Errors
    /// `NotFound`, `InvalidCode`, `Expired`, or `Internal`.
    pub async fn verify_email(&self, username: &str, code: &str) -> Result<(), AuthError> {
        let username = username.trim();
        if !valid_username(username) {
            // Nothing with this shape can ever have been registered.
            return Err(AuthError::NotFound);
        }

        let lock = self.user_lock(username).await;
        let _guard = lock.lock().await;

        let Some(record) = self.pending.get(username).await? else {
            return Err(AuthError::NotFound);
        };

        let ttl = self.config.code_ttl_seconds();
        if ttl > 0 && unix_now().saturating_sub(record.issued_at_unix) >= ttl {
            self.pending.remove(username).await?;
            return Err(AuthError::Expired);
        }

        if record.code_hash != hash_verification_code(code) {
            // Leave the record intact; a mistyped link is retryable.
            return Err(AuthError::InvalidCode);
        }

        match self.credentials.put(username, &record.password_hash).await? {
            PutOutcome::Created => {}
            PutOutcome::Conflict => {
                // Another writer promoted this username first; its code is
                // spent. Clear our copy and report the record gone.
                self.pending.remove(username).await?;
                return Err(AuthError::NotFound);
            }
        }
        self.pending.remove(username).await?;
        Ok(())
    }

    /// Authenticate a returning user and mint a session.
    ///
    /// The rate limiter is consulted before anything else; a limited client
    /// never reaches the credential store, and the attempt still counts
    /// against its windows.
    ///
    /// # Errors
    /// `RateLimited`, `InvalidCredentials`, `EmailNotVerified`, or `Internal`.
    pub async fn login(
        &self,
        username: &str,
        password_plain: &str,
        client_key: &str,
    ) -> Result<LoginSuccess, AuthError> {
        if let RateLimitDecision::Limited { retry_after } = self
            .rate_limiter
            .check(client_key, RateLimitAction::Login)
        {
            return Err(AuthError::RateLimited { retry_after });
        }

        let username = username.trim();
        let Some(account) = self.credentials.get(username).await? else {
            // Same answer as a wrong password; see AuthError::InvalidCredentials.
            return Err(AuthError::InvalidCredentials);
        };
        if !account.email_verified {
            // Unreachable while the store invariant holds, but cheap to keep.
            return Err(AuthError::EmailNotVerified);
        }
        if !password::verify_password(password_plain, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = utils::generate_session_token()?;
        let now = unix_now();
        let session = Session {
            username: username.to_string(),
            created_at_unix: now,
            expires_at_unix: now + self.config.session_ttl_seconds(),
        };
        self.sessions
            .put(&hash_session_token(&token), session.clone())
            .await?;
        Ok(LoginSuccess { token, session })
    }

    /// Destroy the session for a token. Unknown and already-destroyed tokens
    /// are fine; logout is idempotent.
    ///
    /// # Errors
    /// `Internal` on storage failure.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.remove(&hash_session_token(token)).await
    }

    /// Resolve a presented token into its live session, if any.
    ///
    /// # Errors
    /// `Internal` on storage failure.
    pub async fn session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        self.sessions.get(&hash_session_token(token)).await
    }

    async fn user_lock(&self, username: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        if locks.len() > LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(
            locks
                .entry(username.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
