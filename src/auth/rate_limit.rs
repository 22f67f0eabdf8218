//! Rate limiting primitives for auth flows.
//!
//! Windows are counted per client identity (network origin). Every check
//! increments before it evaluates, so a request rejected later for any other
//! reason has still consumed budget and malformed traffic cannot bypass the
//! limiter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitAction {
    Register,
    Login,
    VerifyEmail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after: Duration },
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, client_key: &str, action: RateLimitAction) -> RateLimitDecision;
}

/// Limiter that admits everything; wiring and test stand-in.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _client_key: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Requests admitted per window span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl WindowPolicy {
    #[must_use]
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

// Login gets its own tight window; the global pair bounds every endpoint.
const DEFAULT_LOGIN_POLICY: WindowPolicy = WindowPolicy::new(5, Duration::from_secs(60));
const DEFAULT_HOURLY_POLICY: WindowPolicy = WindowPolicy::new(50, Duration::from_secs(60 * 60));
const DEFAULT_DAILY_POLICY: WindowPolicy = WindowPolicy::new(200, Duration::from_secs(24 * 60 * 60));

// Dead windows are swept once the map grows past this.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Clone, Copy, Debug)]
struct Window {
    started: Instant,
    count: u32,
    span: Duration,
}

impl Window {
    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }
}

/// Fixed-window counters per client identity.
///
/// All counters for one check are updated under a single lock, so concurrent
/// callers cannot interleave increments and undercount past a cap.
#[derive(Debug)]
pub struct WindowRateLimiter {
    login: WindowPolicy,
    hourly: WindowPolicy,
    daily: WindowPolicy,
    windows: Mutex<HashMap<(String, &'static str), Window>>,
}

impl WindowRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            login: DEFAULT_LOGIN_POLICY,
            hourly: DEFAULT_HOURLY_POLICY,
            daily: DEFAULT_DAILY_POLICY,
            windows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_login_policy(mut self, policy: WindowPolicy) -> Self {
        self.login = policy;
        self
    }

    #[must_use]
    pub fn with_hourly_policy(mut self, policy: WindowPolicy) -> Self {
        self.hourly = policy;
        self
    }

    #[must_use]
    pub fn with_daily_policy(mut self, policy: WindowPolicy) -> Self {
        self.daily = policy;
        self
    }

    /// Count one attempt against a window and report how long until the
    /// window resets when the cap is exceeded.
    fn bump(
        windows: &mut HashMap<(String, &'static str), Window>,
        client_key: &str,
        label: &'static str,
        policy: WindowPolicy,
        now: Instant,
    ) -> Option<Duration> {
        let window = windows
            .entry((client_key.to_string(), label))
            .or_insert(Window {
                started: now,
                count: 0,
                span: policy.window,
            });
        if window.elapsed(now) >= policy.window {
            window.started = now;
            window.count = 0;
        }
        window.count = window.count.saturating_add(1);
        if window.count > policy.max_requests {
            Some(policy.window.saturating_sub(window.elapsed(now)))
        } else {
            None
        }
    }
}

impl Default for WindowRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for WindowRateLimiter {
    fn check(&self, client_key: &str, action: RateLimitAction) -> RateLimitDecision {
        let now = Instant::now();
        let Ok(mut windows) = self.windows.lock() else {
            // A poisoned lock fails closed rather than opening the gates.
            return RateLimitDecision::Limited {
                retry_after: self.login.window,
            };
        };

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, window| window.elapsed(now) < window.span);
        }

        let mut retry_after: Option<Duration> = None;
        let mut limited = |candidate: Option<Duration>| {
            if let Some(wait) = candidate {
                // Admission needs every window under cap, so wait for the slowest.
                retry_after = Some(retry_after.map_or(wait, |current| current.max(wait)));
            }
        };

        limited(Self::bump(
            &mut windows,
            client_key,
            "daily",
            self.daily,
            now,
        ));
        limited(Self::bump(
            &mut windows,
            client_key,
            "hourly",
            self.hourly,
            now,
        ));
        if action == RateLimitAction::Login {
            limited(Self::bump(
                &mut windows,
                client_key,
                "login",
                self.login,
                now,
            ));
        }

        match retry_after {
            Some(retry_after) => RateLimitDecision::Limited { retry_after },
            None => RateLimitDecision::Allowed,
        }
    }
}
