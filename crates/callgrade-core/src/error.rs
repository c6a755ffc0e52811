//! Typed errors for the judgment client and scoring pipeline.
//!
//! Per-attempt failures (`CallError`) never leave the resilient client; only
//! `ExecuteError` crosses the module boundary, always carrying the attempt
//! trail of the logical request that produced it.

use std::time::Duration;

use thiserror::Error;

use crate::aspect::Aspect;
use crate::attempt::{AttemptRecord, Outcome};

/// Classified failure of a single call to the external service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    /// Rate limit or quota signal; the credential should cool down.
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        retry_after: Option<Duration>,
        message: String,
    },

    /// The model is unknown, unsupported, or produced unusable output.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Timeouts, connection failures, and server-side hiccups.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The credential was rejected. Terminal for that credential.
    #[error("credential rejected: {0}")]
    AuthInvalid(String),
}

impl CallError {
    /// The attempt outcome this failure is recorded as.
    pub fn outcome(&self) -> Outcome {
        match self {
            CallError::QuotaExceeded { .. } => Outcome::QuotaExceeded,
            CallError::ModelUnavailable(_) => Outcome::ModelUnavailable,
            CallError::TransientNetwork(_) => Outcome::TransientNetwork,
            CallError::AuthInvalid(_) => Outcome::AuthInvalid,
        }
    }

    /// Human-readable detail without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            CallError::QuotaExceeded { message, .. } => message,
            CallError::ModelUnavailable(m)
            | CallError::TransientNetwork(m)
            | CallError::AuthInvalid(m) => m,
        }
    }
}

/// Failure of a whole logical request.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Every credential/model combination failed.
    #[error("all credentials exhausted after {} attempts", .trail.len())]
    AllExhausted { trail: Vec<AttemptRecord> },

    /// The caller abandoned the request.
    #[error("request cancelled after {} attempts", .trail.len())]
    Cancelled { trail: Vec<AttemptRecord> },
}

impl ExecuteError {
    /// Attempts made before the request failed.
    pub fn trail(&self) -> &[AttemptRecord] {
        match self {
            ExecuteError::AllExhausted { trail } | ExecuteError::Cancelled { trail } => trail,
        }
    }
}

/// Failure of an analysis session.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{aspect} judgment failed: {source}")]
    Aspect {
        aspect: Aspect,
        #[source]
        source: ExecuteError,
    },

    #[error("transcription failed: {0}")]
    Transcript(#[source] ExecuteError),

    #[error("report is missing aspects: {0:?}")]
    Incomplete(Vec<Aspect>),
}

/// The service answered, but not in the shape we asked for.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response contained no JSON object")]
    NoJson,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown sentiment label: {0}")]
    UnknownSentiment(String),

    #[error("score is not a finite number")]
    NonFiniteScore,
}

/// Invalid client configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no API keys configured")]
    NoCredentials,

    #[error("{0} API keys configured, at most {max} are supported", max = crate::config::MAX_CREDENTIALS)]
    TooManyCredentials(usize),

    #[error("API key #{0} is empty")]
    EmptyCredential(usize),

    #[error("no models configured")]
    NoModels,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("backoff base ({base:?}) exceeds backoff maximum ({max:?})")]
    InvalidBackoff { base: Duration, max: Duration },
}
