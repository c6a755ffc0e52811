//! Diagnostic trail of a logical request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::CallError;

/// Classified result of one call to the external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Success,
    QuotaExceeded,
    ModelUnavailable,
    TransientNetwork,
    AuthInvalid,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Success => "success",
            Outcome::QuotaExceeded => "quota-exceeded",
            Outcome::ModelUnavailable => "model-unavailable",
            Outcome::TransientNetwork => "transient-network",
            Outcome::AuthInvalid => "auth-invalid",
        };
        write!(f, "{s}")
    }
}

/// One attempt against a (credential, model) pair.
///
/// Lives only as long as the logical request that created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub credential_ordinal: usize,
    pub model_name: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AttemptRecord {
    pub fn success(credential_ordinal: usize, model_name: &str) -> Self {
        Self {
            credential_ordinal,
            model_name: model_name.to_string(),
            timestamp: Utc::now(),
            outcome: Outcome::Success,
            detail: None,
        }
    }

    pub fn failure(credential_ordinal: usize, model_name: &str, error: &CallError) -> Self {
        Self {
            credential_ordinal,
            model_name: model_name.to_string(),
            timestamp: Utc::now(),
            outcome: error.outcome(),
            detail: Some(error.detail().to_string()),
        }
    }
}
