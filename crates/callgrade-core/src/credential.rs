//! Credential pool with per-key health tracking.
//!
//! # State transitions
//!
//! ```text
//! Active ──rate limit──▶ Cooldown ──cooldown elapsed (lazy)──▶ Active
//!    │                       │
//!    └──────auth failure─────┴──────────▶ Exhausted (terminal)
//! ```
//!
//! Cooldown expiry is checked on each `next()` call, so no timers or
//! background tasks are involved. All reads and writes go through one mutex;
//! selection and the lazy Cooldown → Active flip happen in the same critical
//! section, so two concurrent requests never observe a half-updated
//! credential.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::backoff;
use crate::config::ClientConfig;

/// Health of a single credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CredentialState {
    Active,
    Cooldown,
    Exhausted,
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialState::Active => write!(f, "active"),
            CredentialState::Cooldown => write!(f, "cooldown"),
            CredentialState::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// An API key that never prints itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Last four characters, for logs and status tables.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("…{tail}")
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.masked())
    }
}

#[derive(Debug)]
struct Credential {
    ordinal: usize,
    secret: Secret,
    state: CredentialState,
    cooldown_until: Option<Instant>,
    consecutive_failures: u32,
}

impl Credential {
    /// Flip an elapsed cooldown back to Active.
    fn refresh(&mut self, now: Instant) {
        if self.state == CredentialState::Cooldown
            && self.cooldown_until.is_none_or(|until| until <= now)
        {
            self.state = CredentialState::Active;
            self.cooldown_until = None;
            tracing::info!(credential = self.ordinal, "Credential cooldown elapsed");
        }
    }
}

/// A credential handed out for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialLease {
    pub ordinal: usize,
    pub secret: Secret,
}

/// Point-in-time view of one credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub ordinal: usize,
    pub masked: String,
    pub state: CredentialState,
    pub cooldown_remaining_ms: Option<u128>,
    pub consecutive_failures: u32,
}

/// Upper bound on any cooldown, whatever the service asks for.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a rate-limited credential sits out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooldownPolicy {
    /// Shortest cooldown, and the seed of the exponential schedule
    pub floor: Duration,
    pub max: Duration,
}

impl CooldownPolicy {
    /// Service hint if present, otherwise `floor * 2^failures` capped at
    /// `max`; never shorter than `floor`, never longer than [`MAX_COOLDOWN`].
    pub fn cooldown(&self, consecutive_failures: u32, hint: Option<Duration>) -> Duration {
        let max = self.max.max(self.floor);
        hint.unwrap_or_else(|| backoff::exponential(self.floor, consecutive_failures, max))
            .max(self.floor)
            .min(MAX_COOLDOWN)
    }
}

/// Ordered credentials shared by every logical request in the process.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Mutex<Vec<Credential>>,
    policy: CooldownPolicy,
}

impl CredentialPool {
    pub fn new<I, S>(secrets: I, policy: CooldownPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials = secrets
            .into_iter()
            .enumerate()
            .map(|(i, secret)| Credential {
                ordinal: i + 1,
                secret: Secret::new(secret),
                state: CredentialState::Active,
                cooldown_until: None,
                consecutive_failures: 0,
            })
            .collect();

        Self {
            credentials: Mutex::new(credentials),
            policy,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.credentials.iter().cloned(),
            CooldownPolicy {
                floor: config.cooldown_floor,
                max: config.backoff_max,
            },
        )
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Credential>> {
        // A panic while holding the lock cannot leave a credential torn:
        // every mutation is a plain field assignment.
        self.credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Lowest-ordinal Active credential not in `excluding`.
    ///
    /// Returns `None` when no credential qualifies.
    pub fn next(&self, excluding: &HashSet<usize>) -> Option<CredentialLease> {
        self.next_at(excluding, Instant::now())
    }

    fn next_at(&self, excluding: &HashSet<usize>, now: Instant) -> Option<CredentialLease> {
        let mut credentials = self.lock();
        credentials
            .iter_mut()
            .filter(|c| !excluding.contains(&c.ordinal))
            .find_map(|c| {
                c.refresh(now);
                (c.state == CredentialState::Active).then(|| CredentialLease {
                    ordinal: c.ordinal,
                    secret: c.secret.clone(),
                })
            })
    }

    /// Lease a specific credential unless it is exhausted.
    ///
    /// Used to probe keys one by one; cooldowns are not honored here.
    pub fn lease(&self, ordinal: usize) -> Option<CredentialLease> {
        let credentials = self.lock();
        credentials
            .iter()
            .find(|c| c.ordinal == ordinal && c.state != CredentialState::Exhausted)
            .map(|c| CredentialLease {
                ordinal: c.ordinal,
                secret: c.secret.clone(),
            })
    }

    /// Put a rate-limited credential into cooldown.
    pub fn report_quota_exceeded(&self, ordinal: usize, backoff_hint: Option<Duration>) {
        self.report_quota_exceeded_at(ordinal, backoff_hint, Instant::now());
    }

    fn report_quota_exceeded_at(&self, ordinal: usize, hint: Option<Duration>, now: Instant) {
        let mut credentials = self.lock();
        let Some(c) = credentials.iter_mut().find(|c| c.ordinal == ordinal) else {
            return;
        };
        if c.state == CredentialState::Exhausted {
            return;
        }

        let cooldown = self.policy.cooldown(c.consecutive_failures, hint);
        c.consecutive_failures = c.consecutive_failures.saturating_add(1);
        c.state = CredentialState::Cooldown;
        c.cooldown_until = Some(now.checked_add(cooldown).unwrap_or_else(|| {
            tracing::warn!(credential = ordinal, "Cooldown deadline overflows, expiring now");
            now
        }));

        tracing::info!(
            credential = ordinal,
            cooldown_ms = cooldown.as_millis() as u64,
            consecutive_failures = c.consecutive_failures,
            "Credential rate limited, cooling down"
        );
    }

    /// Retire a rejected credential for the rest of the process lifetime.
    pub fn report_auth_invalid(&self, ordinal: usize) {
        let mut credentials = self.lock();
        if let Some(c) = credentials.iter_mut().find(|c| c.ordinal == ordinal) {
            if c.state != CredentialState::Exhausted {
                c.state = CredentialState::Exhausted;
                c.cooldown_until = None;
                tracing::warn!(
                    credential = ordinal,
                    key = %c.secret.masked(),
                    "Credential rejected by service, disabled for this process"
                );
            }
        }
    }

    pub fn report_success(&self, ordinal: usize) {
        let mut credentials = self.lock();
        if let Some(c) = credentials.iter_mut().find(|c| c.ordinal == ordinal) {
            c.consecutive_failures = 0;
        }
    }

    pub fn snapshot(&self) -> Vec<CredentialStatus> {
        let now = Instant::now();
        self.lock()
            .iter()
            .map(|c| CredentialStatus {
                ordinal: c.ordinal,
                masked: c.secret.masked(),
                state: c.state,
                cooldown_remaining_ms: c
                    .cooldown_until
                    .map(|until| until.saturating_duration_since(now).as_millis()),
                consecutive_failures: c.consecutive_failures,
            })
            .collect()
    }

    pub fn state(&self, ordinal: usize) -> Option<CredentialState> {
        self.lock()
            .iter()
            .find(|c| c.ordinal == ordinal)
            .map(|c| c.state)
    }
}
