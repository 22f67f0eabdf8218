//! Session records and storage.
//!
//! Sessions are referenced by an opaque random token handed to the client
//! once; stores only ever see the token's SHA-256 hash.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::error::AuthError;
use super::utils::unix_now;

/// Server-side record of an authenticated client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub created_at_unix: i64,
    pub expires_at_unix: i64,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix >= self.expires_at_unix
    }
}

/// Mapping of token hash to session record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, token_hash: &[u8], session: Session) -> Result<(), AuthError>;

    /// Lookup honoring expiry: expired records answer `None`.
    async fn get(&self, token_hash: &[u8]) -> Result<Option<Session>, AuthError>;

    /// Idempotent removal; logging out twice is fine.
    async fn remove(&self, token_hash: &[u8]) -> Result<(), AuthError>;
}

/// In-memory session store for local development and tests.
///
/// Expired entries are dropped lazily when touched, the same pruning scheme
/// the login-state map uses elsewhere in the service.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Vec<u8>, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, token_hash: &[u8], session: Session) -> Result<(), AuthError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let now = unix_now();
        sessions.retain(|_, existing| !existing.is_expired(now));
        sessions.insert(token_hash.to_vec(), session);
        Ok(())
    }

    async fn get(&self, token_hash: &[u8]) -> Result<Option<Session>, AuthError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let now = unix_now();
        Ok(sessions
            .get(token_hash)
            .filter(|session| !session.is_expired(now))
            .cloned())
    }

    async fn remove(&self, token_hash: &[u8]) -> Result<(), AuthError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        sessions.remove(token_hash);
        Ok(())
    }
}
