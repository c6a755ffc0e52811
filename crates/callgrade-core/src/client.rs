//! Resilient multi-credential client.
//!
//! Drives one logical request across every (credential, model) combination
//! until the service produces a usable response or nothing is left to try:
//!
//! ```text
//! Idle ──▶ Attempting ──success──────────────▶ Succeeded
//!              │  ▲
//!              │  └──── Backoff (transient error, bounded retries)
//!              │
//!              └──no credential left──────────▶ Failed(AllExhausted)
//! ```
//!
//! Per-attempt outcomes:
//! - Success: report success, return.
//! - QuotaExceeded: cool the credential down, move to the next credential.
//! - ModelUnavailable: next model on the same credential.
//! - TransientNetwork: retry the same pair with jittered backoff, then treat
//!   as ModelUnavailable once the retry limit is spent.
//! - AuthInvalid: retire the credential, move to the next credential.
//!
//! A cancelled or dropped request reports nothing to the pool for the call
//! that was in flight.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::attempt::{AttemptRecord, Outcome};
use crate::backoff;
use crate::config::ClientConfig;
use crate::credential::{CredentialLease, CredentialPool};
use crate::error::{CallError, ExecuteError, ParseError};
use crate::model::{ModelCandidate, ModelResolver};
use crate::provider::{GenerationBackend, GenerationRequest};

/// Prompt used to check that a credential works at all.
const PROBE_PROMPT: &str = "Reply with the single word: ok";

/// Where a logical request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Attempting,
    Backoff,
    Succeeded,
    Failed,
}

/// A successful logical request.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    /// Every attempt, the successful one last
    pub attempts: Vec<AttemptRecord>,
}

/// Result of probing one credential.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub ordinal: usize,
    /// Model that answered, if any did
    pub model: Option<String>,
    pub attempts: Vec<AttemptRecord>,
}

/// Retry tunables for transient failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub limit: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        backoff::jittered(self.base, retry, self.max)
    }
}

/// Bookkeeping for one logical request.
struct LogicalRequest {
    state: RequestState,
    /// Credentials with nothing left to try in this request
    done: HashSet<usize>,
    /// (credential, model) pairs already attempted
    tried: HashSet<(usize, String)>,
    trail: Vec<AttemptRecord>,
}

impl LogicalRequest {
    fn new() -> Self {
        Self {
            state: RequestState::Idle,
            done: HashSet::new(),
            tried: HashSet::new(),
            trail: Vec::new(),
        }
    }

    fn transition(&mut self, next: RequestState) {
        if self.state != next {
            tracing::trace!(from = ?self.state, to = ?next, "Request state change");
            self.state = next;
        }
    }
}

/// How driving one credential ended.
enum Step<T> {
    Succeeded(T, String),
    Rotate,
    Cancelled,
}

/// Orchestrates logical requests over a shared pool and resolver.
///
/// Cheap to clone; clones share the pool, resolver, and backend.
#[derive(Clone)]
pub struct ResilientClient {
    pool: Arc<CredentialPool>,
    models: Arc<ModelResolver>,
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl ResilientClient {
    pub fn new(
        pool: Arc<CredentialPool>,
        models: Arc<ModelResolver>,
        backend: Arc<dyn GenerationBackend>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            pool,
            models,
            backend,
            retry: RetryPolicy {
                limit: config.retry_limit,
                base: config.backoff_base,
                max: config.backoff_max,
            },
            request_timeout: config.request_timeout,
        }
    }

    /// Build a pool and resolver from `config` and wrap them in a client.
    pub fn from_config(config: &ClientConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        Self::new(
            Arc::new(CredentialPool::from_config(config)),
            Arc::new(ModelResolver::new(config.models.clone())),
            backend,
            config,
        )
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn models(&self) -> &ModelResolver {
        &self.models
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run one logical request, decoding the response with `parse`.
    ///
    /// A response that fails to parse counts as ModelUnavailable for that
    /// (credential, model) pair.
    pub async fn execute<T, F>(
        &self,
        request: &GenerationRequest<'_>,
        parse: F,
    ) -> Result<Completion<T>, ExecuteError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        self.run(request, &parse, None).await
    }

    /// Like [`execute`](Self::execute), but abandons the request as soon as
    /// `cancel` fires.
    pub async fn execute_cancellable<T, F>(
        &self,
        request: &GenerationRequest<'_>,
        parse: F,
        cancel: &CancellationToken,
    ) -> Result<Completion<T>, ExecuteError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        self.run(request, &parse, Some(cancel)).await
    }

    /// Send a minimal prompt with one credential, trying each model in turn.
    ///
    /// Outcomes are reported to the pool like any other call.
    pub async fn probe(&self, ordinal: usize) -> ProbeReport {
        let mut session = LogicalRequest::new();
        let Some(lease) = self.pool.lease(ordinal) else {
            return ProbeReport {
                ordinal,
                model: None,
                attempts: Vec::new(),
            };
        };

        let request = GenerationRequest::text(PROBE_PROMPT);
        let parse = |_: &str| Ok::<(), ParseError>(());
        let model = match self
            .drive_credential(&lease, &request, &parse, &mut session, None)
            .await
        {
            Step::Succeeded((), model) => Some(model),
            Step::Rotate | Step::Cancelled => None,
        };

        ProbeReport {
            ordinal,
            model,
            attempts: session.trail,
        }
    }

    async fn run<T, F>(
        &self,
        request: &GenerationRequest<'_>,
        parse: &F,
        cancel: Option<&CancellationToken>,
    ) -> Result<Completion<T>, ExecuteError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        let mut session = LogicalRequest::new();

        loop {
            let Some(lease) = self.pool.next(&session.done) else {
                session.transition(RequestState::Failed);
                tracing::warn!(
                    attempts = session.trail.len(),
                    "No credential left to try, giving up"
                );
                return Err(ExecuteError::AllExhausted {
                    trail: session.trail,
                });
            };

            match self
                .drive_credential(&lease, request, parse, &mut session, cancel)
                .await
            {
                Step::Succeeded(value, _) => {
                    return Ok(Completion {
                        value,
                        attempts: session.trail,
                    });
                }
                Step::Rotate => {
                    session.done.insert(lease.ordinal);
                    tracing::info!(credential = lease.ordinal, "Rotating to next credential");
                }
                Step::Cancelled => {
                    session.transition(RequestState::Failed);
                    return Err(ExecuteError::Cancelled {
                        trail: session.trail,
                    });
                }
            }
        }
    }

    /// Try every untried model on one credential.
    async fn drive_credential<T, F>(
        &self,
        lease: &CredentialLease,
        request: &GenerationRequest<'_>,
        parse: &F,
        session: &mut LogicalRequest,
        cancel: Option<&CancellationToken>,
    ) -> Step<T>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        for model in self.models.candidates() {
            if !session.tried.insert((lease.ordinal, model.name.clone())) {
                continue;
            }

            let mut retries = 0;
            loop {
                session.transition(RequestState::Attempting);
                let Some(result) = self.call(lease, model, request, cancel).await else {
                    return Step::Cancelled;
                };

                let result = result.and_then(|text| {
                    parse(&text)
                        .map_err(|e| CallError::ModelUnavailable(format!("unusable response: {e}")))
                });

                let error = match result {
                    Ok(value) => {
                        session
                            .trail
                            .push(AttemptRecord::success(lease.ordinal, &model.name));
                        self.pool.report_success(lease.ordinal);
                        session.transition(RequestState::Succeeded);
                        tracing::debug!(
                            credential = lease.ordinal,
                            model = %model.name,
                            outcome = %Outcome::Success,
                            "Attempt succeeded"
                        );
                        return Step::Succeeded(value, model.name.clone());
                    }
                    Err(error) => error,
                };

                session
                    .trail
                    .push(AttemptRecord::failure(lease.ordinal, &model.name, &error));
                tracing::debug!(
                    credential = lease.ordinal,
                    model = %model.name,
                    outcome = %error.outcome(),
                    error = %error,
                    "Attempt failed"
                );

                match error {
                    CallError::QuotaExceeded { retry_after, .. } => {
                        self.pool.report_quota_exceeded(lease.ordinal, retry_after);
                        return Step::Rotate;
                    }
                    CallError::AuthInvalid(_) => {
                        self.pool.report_auth_invalid(lease.ordinal);
                        return Step::Rotate;
                    }
                    CallError::ModelUnavailable(_) => break,
                    CallError::TransientNetwork(_) => {
                        if retries >= self.retry.limit {
                            tracing::info!(
                                credential = lease.ordinal,
                                model = %model.name,
                                retries,
                                "Retry limit reached, moving to next model"
                            );
                            break;
                        }
                        let delay = self.retry.delay(retries);
                        retries += 1;
                        session.transition(RequestState::Backoff);
                        tracing::debug!(
                            credential = lease.ordinal,
                            model = %model.name,
                            attempt = retries,
                            delay_ms = delay.as_millis() as u64,
                            "Transient failure, backing off"
                        );
                        if !sleep_unless_cancelled(delay, cancel).await {
                            return Step::Cancelled;
                        }
                    }
                }
            }
        }

        Step::Rotate
    }

    /// Issue one call under the request timeout.
    ///
    /// Returns `None` if cancelled before the call finished.
    async fn call(
        &self,
        lease: &CredentialLease,
        model: &ModelCandidate,
        request: &GenerationRequest<'_>,
        cancel: Option<&CancellationToken>,
    ) -> Option<Result<String, CallError>> {
        let call = tokio::time::timeout(
            self.request_timeout,
            self.backend
                .generate(lease.secret.expose(), &model.name, request),
        );

        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                result = call => result,
            },
            None => call.await,
        };

        Some(result.unwrap_or_else(|_| {
            Err(CallError::TransientNetwork(format!(
                "request timed out after {}s",
                self.request_timeout.as_secs_f64()
            )))
        }))
    }
}

/// Sleep for `delay`; `false` if cancelled first.
async fn sleep_unless_cancelled(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        },
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialState;
    use crate::provider::scripted::ScriptedBackend;

    const MODELS: [&str; 2] = ["model-a", "model-b"];

    fn config(keys: usize) -> ClientConfig {
        ClientConfig::new((1..=keys).map(|i| format!("key-{i}")).collect(), MODELS)
            .unwrap()
            .with_backoff(Duration::from_millis(1), Duration::from_millis(5))
            .unwrap()
            .with_cooldown_floor(Duration::from_secs(60))
            .with_retry_limit(2)
    }

    fn client(keys: usize, backend: ScriptedBackend) -> (ResilientClient, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let client = ResilientClient::from_config(&config(keys), backend.clone());
        (client, backend)
    }

    fn as_text(text: &str) -> Result<String, ParseError> {
        Ok(text.to_string())
    }

    fn quota() -> Result<String, CallError> {
        Err(CallError::QuotaExceeded {
            retry_after: None,
            message: "429".to_string(),
        })
    }

    fn unavailable() -> Result<String, CallError> {
        Err(CallError::ModelUnavailable("404".to_string()))
    }

    fn transient() -> Result<String, CallError> {
        Err(CallError::TransientNetwork("reset".to_string()))
    }

    fn auth() -> Result<String, CallError> {
        Err(CallError::AuthInvalid("bad key".to_string()))
    }

    fn outcomes(trail: &[AttemptRecord]) -> Vec<(usize, &str, Outcome)> {
        trail
            .iter()
            .map(|a| (a.credential_ordinal, a.model_name.as_str(), a.outcome))
            .collect()
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let (client, backend) = client(3, ScriptedBackend::new(Ok("hello".to_string())));
        let request = GenerationRequest::text("hi");

        let done = client.execute(&request, as_text).await.unwrap();
        assert_eq!(done.value, "hello");
        assert_eq!(outcomes(&done.attempts), [(1, "model-a", Outcome::Success)]);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_quota_rotates_credential_without_trying_other_models() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-1", "model-a", vec![quota()])
            .script("key-2", "model-a", vec![quota()]);
        let (client, backend) = client(3, backend);

        let done = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap();

        assert_eq!(
            outcomes(&done.attempts),
            [
                (1, "model-a", Outcome::QuotaExceeded),
                (2, "model-a", Outcome::QuotaExceeded),
                (3, "model-a", Outcome::Success),
            ]
        );
        assert!(!backend.calls().contains(&("key-1".into(), "model-b".into())));
        assert_eq!(client.pool().state(1), Some(CredentialState::Cooldown));
        assert_eq!(client.pool().state(2), Some(CredentialState::Cooldown));
        assert_eq!(client.pool().state(3), Some(CredentialState::Active));
    }

    #[tokio::test]
    async fn test_model_unavailable_advances_model_on_same_credential() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-1", "model-a", vec![unavailable()]);
        let (client, _) = client(2, backend);

        let done = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap();

        assert_eq!(
            outcomes(&done.attempts),
            [
                (1, "model-a", Outcome::ModelUnavailable),
                (1, "model-b", Outcome::Success),
            ]
        );
        assert_eq!(client.pool().state(1), Some(CredentialState::Active));
    }

    #[tokio::test]
    async fn test_transient_errors_retry_same_pair() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-1", "model-a", vec![transient(), transient()]);
        let (client, _) = client(1, backend);

        let done = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap();

        assert_eq!(
            outcomes(&done.attempts),
            [
                (1, "model-a", Outcome::TransientNetwork),
                (1, "model-a", Outcome::TransientNetwork),
                (1, "model-a", Outcome::Success),
            ]
        );
    }

    #[tokio::test]
    async fn test_transient_over_limit_moves_to_next_model() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-1", "model-a", vec![transient(), transient(), transient()]);
        let (client, _) = client(1, backend);

        let done = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap();

        let trail = outcomes(&done.attempts);
        assert_eq!(trail.len(), 4);
        assert_eq!(&trail[..3], [(1, "model-a", Outcome::TransientNetwork); 3]);
        assert_eq!(trail[3], (1, "model-b", Outcome::Success));
    }

    #[tokio::test]
    async fn test_all_auth_invalid_exhausts() {
        let (client, backend) = client(3, ScriptedBackend::new(auth()));

        let err = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap_err();

        let ExecuteError::AllExhausted { trail } = err else {
            panic!("expected AllExhausted");
        };
        assert_eq!(trail.len(), 3);
        assert!(trail.len() <= 3 * MODELS.len());
        assert!(trail.iter().all(|a| a.outcome == Outcome::AuthInvalid));
        assert_eq!(backend.calls().len(), 3);
        for ordinal in 1..=3 {
            assert_eq!(client.pool().state(ordinal), Some(CredentialState::Exhausted));
        }

        // Exhausted credentials stay out of later requests
        let err = client
            .execute(&GenerationRequest::text("again"), as_text)
            .await
            .unwrap_err();
        assert!(err.trail().is_empty());
    }

    #[tokio::test]
    async fn test_all_models_unavailable_exhausts_every_pair() {
        let (client, _) = client(3, ScriptedBackend::new(unavailable()));

        let err = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecuteError::AllExhausted { .. }));
        assert_eq!(err.trail().len(), 3 * MODELS.len());

        // Model failures never penalize credentials
        for ordinal in 1..=3 {
            assert_eq!(client.pool().state(ordinal), Some(CredentialState::Active));
        }
    }

    #[tokio::test]
    async fn test_unparseable_response_tries_next_model() {
        let backend = ScriptedBackend::new(Ok("42".to_string()))
            .script("key-1", "model-a", vec![Ok("not a number".to_string())]);
        let (client, _) = client(1, backend);

        let parse = |text: &str| {
            text.trim()
                .parse::<u32>()
                .map_err(|_| ParseError::NoJson)
        };
        let done = client
            .execute(&GenerationRequest::text("hi"), parse)
            .await
            .unwrap();

        assert_eq!(done.value, 42);
        assert_eq!(done.attempts[0].outcome, Outcome::ModelUnavailable);
        assert!(
            done.attempts[0]
                .detail
                .as_deref()
                .unwrap()
                .contains("unusable response")
        );
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let backend = ScriptedBackend::new(Ok("late".to_string())).with_delay(Duration::from_secs(5));
        let backend = Arc::new(backend);
        let config = config(1)
            .with_retry_limit(0)
            .with_request_timeout(Duration::from_millis(20));
        let client = ResilientClient::from_config(&config, backend);

        let err = client
            .execute(&GenerationRequest::text("hi"), as_text)
            .await
            .unwrap_err();

        assert_eq!(err.trail().len(), MODELS.len());
        assert!(
            err.trail()
                .iter()
                .all(|a| a.outcome == Outcome::TransientNetwork)
        );
    }

    #[tokio::test]
    async fn test_cancelled_request_reports_nothing() {
        let backend = ScriptedBackend::new(quota()).with_delay(Duration::from_secs(5));
        let (client, _) = client(1, backend);
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let err = client
            .execute_cancellable(&GenerationRequest::text("hi"), as_text, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecuteError::Cancelled { .. }));
        assert!(err.trail().is_empty());
        let status = &client.pool().snapshot()[0];
        assert_eq!(status.state, CredentialState::Active);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_pool() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-1", "model-a", vec![quota()]);
        let (client, _) = client(2, backend);

        let request = GenerationRequest::text("hi");
        let (a, b) = tokio::join!(
            client.execute(&request, as_text),
            client.execute(&request, as_text)
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(client.pool().state(1), Some(CredentialState::Cooldown));
    }

    #[tokio::test]
    async fn test_probe_reports_working_model() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-2", "model-a", vec![unavailable()]);
        let (client, _) = client(2, backend);

        let report = client.probe(2).await;
        assert_eq!(report.model.as_deref(), Some("model-b"));
        assert_eq!(report.attempts.len(), 2);

        let missing = client.probe(9).await;
        assert!(missing.model.is_none());
        assert!(missing.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_probe_retires_rejected_key() {
        let backend = ScriptedBackend::new(Ok("ok".to_string()))
            .script("key-1", "model-a", vec![auth()]);
        let (client, _) = client(2, backend);

        let report = client.probe(1).await;
        assert!(report.model.is_none());
        assert_eq!(client.pool().state(1), Some(CredentialState::Exhausted));
    }
}
