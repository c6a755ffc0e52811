pub mod analysis;
pub mod aspect;
pub mod attempt;
mod backoff;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod provider;
pub mod scoring;
pub mod settings;

pub use analysis::{Analyzer, Schedule, Transcript};
pub use aspect::{Aspect, AspectJudgment, SentimentLabel};
pub use attempt::{AttemptRecord, Outcome};
pub use client::{Completion, ProbeReport, RequestState, ResilientClient};
pub use config::{ClientConfig, MAX_CREDENTIALS};
pub use credential::{
    CooldownPolicy, CredentialPool, CredentialState, CredentialStatus, MAX_COOLDOWN, Secret,
};
pub use error::{AnalysisError, CallError, ConfigError, ExecuteError, ParseError};
pub use model::{ModelCandidate, ModelResolver};
pub use provider::{GeminiBackend, GenerationBackend, GenerationRequest, Payload};
pub use scoring::{
    AspectJudgments, AspectScore, AspectSet, Indicator, OverallLabel, PerformanceReport, normalize,
};
pub use settings::Settings;
