//! Analysis sessions: four aspect requests in, one report out.
//!
//! Each aspect is its own logical request against the shared resilient
//! client. The aspects share no state beyond the credential pool, so they
//! can run one after another or concurrently.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

use crate::aspect::{Aspect, AspectJudgment, extract_json_object};
use crate::client::ResilientClient;
use crate::error::{AnalysisError, ParseError};
use crate::provider::{GenerationRequest, Payload};
use crate::scoring::{AspectSet, PerformanceReport};

/// How the four aspect requests are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    #[default]
    Sequential,
    Concurrent,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Sequential => write!(f, "sequential"),
            Schedule::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(Schedule::Sequential),
            "concurrent" | "parallel" => Ok(Schedule::Concurrent),
            _ => Err(format!(
                "Unknown schedule: {}. Use 'sequential' or 'concurrent'",
                s
            )),
        }
    }
}

/// Transcription, English translation, and summary of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub transcription: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source_language: String,
}

impl Transcript {
    fn prompt(language: &str) -> String {
        format!(
            "Transcribe this customer-service call, which is in {language}. \
             Label each turn with \"Agent:\" or \"Customer:\". Then translate the \
             transcription into English and write a three-sentence summary of the \
             customer's issue and how it was handled.\n\n\
             Respond with only a JSON object of the form \
             {{\"transcription\": \"...\", \"translation\": \"...\", \"summary\": \"...\"}}."
        )
    }

    fn parse(language: &str, response: &str) -> Result<Self, ParseError> {
        let mut transcript: Transcript = serde_json::from_str(extract_json_object(response)?)?;
        transcript.source_language = language.to_string();
        Ok(transcript)
    }
}

/// Runs analysis sessions over one resilient client.
#[derive(Clone)]
pub struct Analyzer {
    client: ResilientClient,
}

impl Analyzer {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    /// Obtain one aspect's judgment.
    pub async fn judge(
        &self,
        aspect: Aspect,
        payload: &Payload,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<AspectJudgment, AnalysisError> {
        let request = GenerationRequest::json(aspect.prompt(language), payload);
        let completion = self
            .client
            .execute_cancellable(&request, |text| AspectJudgment::parse(aspect, text), cancel)
            .await
            .map_err(|source| AnalysisError::Aspect { aspect, source })?;

        tracing::info!(
            aspect = %aspect,
            score = completion.value.raw_score,
            attempts = completion.attempts.len(),
            "Aspect judged"
        );
        Ok(completion.value)
    }

    /// Judge all four aspects and aggregate them into a report.
    ///
    /// Fails with the first aspect (in report order) whose request failed.
    pub async fn analyze(
        &self,
        payload: &Payload,
        language: &str,
        schedule: Schedule,
        cancel: &CancellationToken,
    ) -> Result<PerformanceReport, AnalysisError> {
        tracing::info!(%schedule, backend = self.client.backend_name(), "Starting call analysis");

        let results = match schedule {
            Schedule::Sequential => {
                let mut results = Vec::with_capacity(Aspect::all().len());
                for aspect in Aspect::all() {
                    let result = self.judge(*aspect, payload, language, cancel).await;
                    let failed = result.is_err();
                    results.push(result);
                    if failed {
                        break;
                    }
                }
                results
            }
            Schedule::Concurrent => {
                join_all(
                    Aspect::all()
                        .iter()
                        .map(|aspect| self.judge(*aspect, payload, language, cancel)),
                )
                .await
            }
        };

        let mut set = AspectSet::new();
        for result in results {
            set.insert(result?);
        }
        let judgments = set.complete().map_err(AnalysisError::Incomplete)?;
        let report = PerformanceReport::aggregate(&judgments);

        tracing::info!(
            overall_score = report.overall_score,
            label = %report.overall_label,
            "Call analysis complete"
        );
        Ok(report)
    }

    /// Transcribe, translate, and summarize the call.
    pub async fn transcribe(
        &self,
        payload: &Payload,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<Transcript, AnalysisError> {
        let request = GenerationRequest::json(Transcript::prompt(language), payload);
        self.client
            .execute_cancellable(&request, |text| Transcript::parse(language, text), cancel)
            .await
            .map(|completion| completion.value)
            .map_err(AnalysisError::Transcript)
    }
}
