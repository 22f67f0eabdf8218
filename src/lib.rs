//! # Varco
//!
//! `varco` is a minimal identity-verification and session-authentication
//! service. It registers accounts, proves ownership of an email address with a
//! single-use verification code, authenticates returning users against a
//! salted password hash, and rate limits authentication attempts to blunt
//! brute-force guessing.
//!
//! ## Account lifecycle
//!
//! Usernames move through `Unregistered -> PendingVerification -> Verified`:
//!
//! - **Registration** validates the username (`[A-Za-z0-9_]`), hashes the
//!   password with argon2id, and emails a verification link. The pending
//!   record is only written after the email is accepted for delivery, so a
//!   failed send never leaves an orphaned registration.
//! - **Verification** consumes the code exactly once and promotes the pending
//!   record to a verified account. Codes are random 256-bit values; only their
//!   hash is stored.
//! - **Login** checks the rate limiter before touching any store and answers
//!   unknown users and wrong passwords with the same error so accounts cannot
//!   be enumerated. A successful login mints an opaque session token; the
//!   database keeps only the token hash.
//!
//! ## Storage
//!
//! Stores are injected capabilities: the default in-memory backend serves
//! local development and tests, while the Postgres backend (`--dsn`) provides
//! durability. Email delivery is likewise a capability, with a logging sender
//! for local use and an HTTP relay sender for production.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
