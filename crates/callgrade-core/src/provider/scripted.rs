//! In-memory backend that replays scripted outcomes per (key, model) pair.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{GenerationBackend, GenerationRequest};
use crate::error::CallError;

type Reply = Result<String, CallError>;

pub(crate) struct ScriptedBackend {
    scripts: Mutex<HashMap<(String, String), VecDeque<Reply>>>,
    fallback: Reply,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    /// Every unscripted call returns `fallback`.
    pub(crate) fn new(fallback: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue replies for one (key, model) pair; once drained the fallback applies.
    pub(crate) fn script(self, key: &str, model: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((key.to_string(), model.to_string()), replies.into());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        _request: &GenerationRequest<'_>,
    ) -> Result<String, CallError> {
        let pair = (api_key.to_string(), model.to_string());
        self.calls.lock().unwrap().push(pair.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&pair)
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}
