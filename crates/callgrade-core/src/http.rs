//! Shared HTTP client.
//!
//! One connection pool for every backend call in the process.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::time::Duration;

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Connect timeout only; whole-call deadlines are enforced by the resilient
/// client so they can be classified as transient failures.
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub fn get_http_client() -> Result<&'static reqwest::Client> {
    HTTP_CLIENT.get_or_try_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("callgrade/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")
    })
}
