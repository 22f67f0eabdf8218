//! Account and pending-registration stores.
//!
//! Both stores are injected capabilities constructed at startup and passed by
//! handle to the auth service; there is no process-wide mutable state. The
//! in-memory backend is the default for local development and tests; the
//! Postgres backend lives in [`super::pg`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::error::AuthError;

/// A verified account. Entries only ever appear here through a completed
/// email verification, so `email_verified` is true for every stored row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub email_verified: bool,
}

/// An unverified registration awaiting email confirmation. At most one per
/// username; a newer registration overwrites it wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRegistration {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    /// SHA-256 of the verification code; the raw code is never stored.
    pub code_hash: Vec<u8>,
    pub issued_at_unix: i64,
}

/// Outcome of a credential insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    /// The username already holds a verified account.
    Conflict,
}

/// Durable mapping of username to verified credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn exists(&self, username: &str) -> Result<bool, AuthError>;

    async fn get(&self, username: &str) -> Result<Option<Account>, AuthError>;

    /// Create a verified account. Fails fast with `PutOutcome::Conflict` when
    /// the username is already present; retries are the caller's concern.
    async fn put(&self, username: &str, password_hash: &str) -> Result<PutOutcome, AuthError>;
}

/// Mapping of username to its single in-flight registration.
#[async_trait]
pub trait PendingRegistrationStore: Send + Sync {
    /// Upsert, overwriting any prior pending record for the username.
    /// Last registration attempt wins; the old code becomes invalid.
    async fn put(&self, record: PendingRegistration) -> Result<(), AuthError>;

    async fn get(&self, username: &str) -> Result<Option<PendingRegistration>, AuthError>;

    /// Idempotent removal.
    async fn remove(&self, username: &str) -> Result<(), AuthError>;
}

/// In-memory credential store for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn exists(&self, username: &str) -> Result<bool, AuthError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        Ok(accounts.contains_key(username))
    }

    async fn get(&self, username: &str) -> Result<Option<Account>, AuthError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        Ok(accounts.get(username).cloned())
    }

    async fn put(&self, username: &str, password_hash: &str) -> Result<PutOutcome, AuthError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        if accounts.contains_key(username) {
            return Ok(PutOutcome::Conflict);
        }
        accounts.insert(
            username.to_string(),
            Account {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                email_verified: true,
            },
        );
        Ok(PutOutcome::Created)
    }
}

/// In-memory pending-registration store for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryPendingStore {
    pending: RwLock<HashMap<String, PendingRegistration>>,
}

impl MemoryPendingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingRegistrationStore for MemoryPendingStore {
    async fn put(&self, record: PendingRegistration) -> Result<(), AuthError> {
        let mut pending = self
            .pending
            .write()
            .map_err(|_| anyhow::anyhow!("pending store lock poisoned"))?;
        pending.insert(record.username.clone(), record);
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<Option<PendingRegistration>, AuthError> {
        let pending = self
            .pending
            .read()
            .map_err(|_| anyhow::anyhow!("pending store lock poisoned"))?;
        Ok(pending.get(username).cloned())
    }

    async fn remove(&self, username: &str) -> Result<(), AuthError> {
        let mut pending = self
            .pending
            .write()
            .map_err(|_| anyhow::anyhow!("pending store lock poisoned"))?;
        pending.remove(username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn pending(username: &str, code_hash: &[u8]) -> PendingRegistration {
        PendingRegistration {
            username: username.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            email: format!("{username}@example.com"),
            code_hash: code_hash.to_vec(),
            issued_at_unix: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn credential_put_then_get() -> Result<()> {
        let store = MemoryCredentialStore::new();
        assert!(!store.exists("alice").await?);

        assert_eq!(store.put("alice", "hash").await?, PutOutcome::Created);
        assert!(store.exists("alice").await?);

        let account = store.get("alice").await?.expect("account present");
        assert_eq!(account.username, "alice");
        assert!(account.email_verified);
        Ok(())
    }

    #[tokio::test]
    async fn credential_put_conflicts_on_duplicate() -> Result<()> {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.put("alice", "hash").await?, PutOutcome::Created);
        assert_eq!(store.put("alice", "other").await?, PutOutcome::Conflict);

        // The first write wins; the conflicting one must not clobber it.
        let account = store.get("alice").await?.expect("account present");
        assert_eq!(account.password_hash, "hash");
        Ok(())
    }

    #[tokio::test]
    async fn pending_put_overwrites_prior_record() -> Result<()> {
        let store = MemoryPendingStore::new();
        store.put(pending("bob", b"old")).await?;
        store.put(pending("bob", b"new")).await?;

        let record = store.get("bob").await?.expect("record present");
        assert_eq!(record.code_hash, b"new".to_vec());
        Ok(())
    }

    #[tokio::test]
    async fn pending_remove_is_idempotent() -> Result<()> {
        let store = MemoryPendingStore::new();
        store.put(pending("carol", b"code")).await?;
        store.remove("carol").await?;
        store.remove("carol").await?;
        assert!(store.get("carol").await?.is_none());
        Ok(())
    }
}
