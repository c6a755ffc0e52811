//! Persistent user settings.
//!
//! Stored as JSON under the platform config directory
//! (`~/.config/callgrade/settings.json` on Linux). Every field has a serde
//! default so older or hand-edited files keep loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{
    ClientConfig, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX, DEFAULT_COOLDOWN_FLOOR,
    DEFAULT_ENDPOINT, DEFAULT_MODELS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_LIMIT,
};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Gemini API keys in priority order
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Candidate models in priority order
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Language the calls are held in, interpolated into prompts
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_cooldown_floor_ms")]
    pub cooldown_floor_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn default_language() -> String {
    "English".to_string()
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE.as_millis() as u64
}

fn default_backoff_max_ms() -> u64 {
    DEFAULT_BACKOFF_MAX.as_millis() as u64
}

fn default_cooldown_floor_ms() -> u64 {
    DEFAULT_COOLDOWN_FLOOR.as_millis() as u64
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            models: default_models(),
            language: default_language(),
            retry_limit: default_retry_limit(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            cooldown_floor_ms: default_cooldown_floor_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            endpoint: default_endpoint(),
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callgrade")
            .join("settings.json")
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings at {}", path.display()))
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        // Settings hold API keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Add a key unless it is already present. Returns whether it was added.
    pub fn add_api_key(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() || self.api_keys.iter().any(|k| k == key) {
            return false;
        }
        self.api_keys.push(key.to_string());
        true
    }

    /// Validate into a client configuration.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let models: Vec<&str> = self
            .models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();

        ClientConfig::new(self.api_keys.clone(), models)?
            .with_retry_limit(self.retry_limit)
            .with_backoff(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_max_ms),
            )?
            .with_cooldown_floor(Duration::from_millis(self.cooldown_floor_ms))
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_endpoint(&self.endpoint)
    }
}
