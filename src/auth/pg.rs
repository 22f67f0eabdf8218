//! Postgres-backed store implementations.
//!
//! Schema lives in `db/sql/01_varco.sql`. Columns mirror the in-memory
//! records: only hashes of codes and session tokens are ever written.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::error::AuthError;
use super::session::{Session, SessionStore};
use super::store::{
    Account, CredentialStore, PendingRegistration, PendingRegistrationStore, PutOutcome,
};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn exists(&self, username: &str) -> Result<bool, AuthError> {
        let query = "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1) AS present";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check account existence")?;
        Ok(row.get("present"))
    }

    async fn get(&self, username: &str) -> Result<Option<Account>, AuthError> {
        let query = "SELECT username, password_hash, email_verified FROM accounts WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")?;
        Ok(row.map(|row| Account {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            email_verified: row.get("email_verified"),
        }))
    }

    async fn put(&self, username: &str, password_hash: &str) -> Result<PutOutcome, AuthError> {
        let query = r"
            INSERT INTO accounts (username, password_hash, email_verified)
            VALUES ($1, $2, TRUE)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await;
        match result {
            Ok(_) => Ok(PutOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(PutOutcome::Conflict),
            Err(err) => Err(AuthError::Internal(
                anyhow::Error::new(err).context("failed to insert account"),
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgPendingStore {
    pool: PgPool,
}

impl PgPendingStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingRegistrationStore for PgPendingStore {
    async fn put(&self, record: PendingRegistration) -> Result<(), AuthError> {
        // Last registration attempt wins; the overwrite invalidates the code
        // issued for the previous attempt.
        let query = r"
            INSERT INTO pending_registrations
                (username, password_hash, email, code_hash, issued_at)
            VALUES ($1, $2, $3, $4, to_timestamp($5))
            ON CONFLICT (username) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                email = EXCLUDED.email,
                code_hash = EXCLUDED.code_hash,
                issued_at = EXCLUDED.issued_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&record.username)
            .bind(&record.password_hash)
            .bind(&record.email)
            .bind(&record.code_hash)
            .bind(record.issued_at_unix)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to upsert pending registration")?;
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<Option<PendingRegistration>, AuthError> {
        let query = r"
            SELECT username, password_hash, email, code_hash,
                   EXTRACT(EPOCH FROM issued_at)::BIGINT AS issued_at_unix
            FROM pending_registrations
            WHERE username = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup pending registration")?;
        Ok(row.map(|row| PendingRegistration {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            email: row.get("email"),
            code_hash: row.get("code_hash"),
            issued_at_unix: row.get("issued_at_unix"),
        }))
    }

    async fn remove(&self, username: &str) -> Result<(), AuthError> {
        // Idempotent; zero rows deleted is fine.
        let query = "DELETE FROM pending_registrations WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(username)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete pending registration")?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, token_hash: &[u8], session: Session) -> Result<(), AuthError> {
        let query = r"
            INSERT INTO sessions (token_hash, username, created_at, expires_at)
            VALUES ($1, $2, to_timestamp($3), to_timestamp($4))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(&session.username)
            .bind(session.created_at_unix)
            .bind(session.expires_at_unix)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn get(&self, token_hash: &[u8]) -> Result<Option<Session>, AuthError> {
        // Only unexpired sessions are visible.
        let query = r"
            SELECT username,
                   EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix,
                   EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix
            FROM sessions
            WHERE token_hash = $1
              AND expires_at > NOW()
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;
        Ok(row.map(|row| Session {
            username: row.get("username"),
            created_at_unix: row.get("created_at_unix"),
            expires_at_unix: row.get("expires_at_unix"),
        }))
    }

    async fn remove(&self, token_hash: &[u8]) -> Result<(), AuthError> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
