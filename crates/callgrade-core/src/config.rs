//! Client configuration.
//!
//! Built once at startup by whatever loads configuration (the CLI reads the
//! settings file and environment) and passed by reference into the pool,
//! resolver, and client. Nothing in the core reads ambient process state.

use std::time::Duration;

use crate::error::ConfigError;
use crate::model::ModelCandidate;

/// Maximum number of interchangeable API keys.
pub const MAX_CREDENTIALS: usize = 20;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Candidate models, tried in this order on every credential.
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"];

pub const DEFAULT_RETRY_LIMIT: u32 = 2;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);
pub const DEFAULT_COOLDOWN_FLOOR: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Validated configuration for the resilient client.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// API keys in priority order; ordinal = index + 1
    pub credentials: Vec<String>,
    pub models: Vec<ModelCandidate>,
    /// Extra attempts on the same (credential, model) pair after a transient error
    pub retry_limit: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Shortest cooldown applied after a rate-limit signal
    pub cooldown_floor: Duration,
    /// Per-call timeout; elapsed timeouts count as transient network errors
    pub request_timeout: Duration,
    pub endpoint: String,
}

impl ClientConfig {
    /// Build a configuration with default tunables.
    ///
    /// Models are given priorities in the order supplied.
    pub fn new<I, S>(credentials: Vec<String>, models: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let models = models
            .into_iter()
            .enumerate()
            .map(|(i, name)| ModelCandidate::new(name, i as u32))
            .collect();

        let config = Self {
            credentials,
            models,
            retry_limit: DEFAULT_RETRY_LIMIT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            cooldown_floor: DEFAULT_COOLDOWN_FLOOR,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Result<Self, ConfigError> {
        self.backoff_base = base;
        self.backoff_max = max;
        self.validate()?;
        Ok(self)
    }

    pub fn with_cooldown_floor(mut self, floor: Duration) -> Self {
        self.cooldown_floor = floor;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        self.endpoint = endpoint.into();
        self.validate()?;
        Ok(self)
    }

    /// Check every invariant the client relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        if self.credentials.len() > MAX_CREDENTIALS {
            return Err(ConfigError::TooManyCredentials(self.credentials.len()));
        }
        if let Some(i) = self.credentials.iter().position(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyCredential(i + 1));
        }
        if self.models.is_empty() || self.models.iter().any(|m| m.name.trim().is_empty()) {
            return Err(ConfigError::NoModels);
        }
        if self.backoff_base > self.backoff_max {
            return Err(ConfigError::InvalidBackoff {
                base: self.backoff_base,
                max: self.backoff_max,
            });
        }

        let endpoint = self.endpoint.trim();
        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"));
        match host {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
            _ => Err(ConfigError::InvalidEndpoint(self.endpoint.clone())),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("credentials", &self.credentials.len())
            .field("models", &self.models)
            .field("retry_limit", &self.retry_limit)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_max", &self.backoff_max)
            .field("cooldown_floor", &self.cooldown_floor)
            .field("request_timeout", &self.request_timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
