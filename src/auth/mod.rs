//! Account and session core: stores, verification codes, rate limiting, and
//! the orchestration that ties them together. The HTTP layer in [`crate::api`]
//! is a thin shell over [`AuthService`].

pub mod code;
pub mod error;
pub mod notifier;
pub mod password;
pub mod pg;
pub mod rate_limit;
pub mod service;
pub mod session;
pub mod state;
pub mod store;
pub(crate) mod utils;

pub use code::CodeIssuer;
pub use error::AuthError;
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use rate_limit::{
    NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter, WindowPolicy,
    WindowRateLimiter,
};
pub use service::{AuthService, LoginSuccess};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use state::AuthConfig;
pub use store::{
    Account, CredentialStore, MemoryCredentialStore, MemoryPendingStore, PendingRegistration,
    PendingRegistrationStore, PutOutcome,
};
