//! Reasoning-model boundary.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use tracing::{debug, instrument};

use super::config::EvaluationConfig;
use super::error::ModelError;

/// Raw text answer plus call metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCompletion {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub elapsed: Duration,
}

/// A chat model that answers one system instruction plus one prompt.
#[async_trait]
pub trait ReasoningModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<ModelCompletion, ModelError>;

    fn model_name(&self) -> &str;
}

/// [`ReasoningModel`] over the `genai` multi-provider client. The provider is picked
/// from the model name and the API key from the provider's usual environment variable.
pub struct GenaiReasoningModel {
    client: Client,
    config: EvaluationConfig,
}

impl std::fmt::Debug for GenaiReasoningModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiReasoningModel")
            .field("model", &self.config.model)
            .field("temperature", &self.config.temperature)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}

impl GenaiReasoningModel {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            client: Client::default(),
            config,
        }
    }
}

#[async_trait]
impl ReasoningModel for GenaiReasoningModel {
    #[instrument(skip(self, system, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn complete(&self, system: &str, prompt: &str) -> Result<ModelCompletion, ModelError> {
        let request = ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(prompt)]);
        let options = ChatOptions::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let started = Instant::now();
        let response = tokio::time::timeout(
            self.config.timeout,
            self.client
                .exec_chat(&self.config.model, request, Some(&options)),
        )
        .await
        .map_err(|_| ModelError::Timeout {
            timeout_secs: self.config.timeout.as_secs(),
        })?
        .map_err(|e| ModelError::RequestFailed {
            reason: e.to_string(),
        })?;
        let elapsed = started.elapsed();

        let content = response
            .first_text()
            .map(str::to_string)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;
        let tokens_used = response
            .usage
            .total_tokens
            .and_then(|n| u32::try_from(n).ok());

        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            tokens_used, "Reasoning model answered"
        );

        Ok(ModelCompletion {
            content,
            model: self.config.model.clone(),
            tokens_used,
            elapsed,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockReasoningModel;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{ModelCompletion, ReasoningModel};
    use crate::evaluation::error::ModelError;

    /// Answers from a fixed script. Prompts containing a routed key get that key's
    /// answer; everything else falls back to the default answer.
    #[derive(Debug, Default)]
    pub struct MockReasoningModel {
        default_answer: Mutex<Option<String>>,
        routes: Mutex<Vec<(String, String)>>,
        queue: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Mutex<Option<Duration>>,
    }

    impl MockReasoningModel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Always answers `content`.
        pub fn answering(content: impl Into<String>) -> Self {
            let model = Self::default();
            *model.default_answer.lock() = Some(content.into());
            model
        }

        /// Answers `content` to prompts that contain `key` (e.g. an indicator id).
        pub fn route(self, key: impl Into<String>, content: impl Into<String>) -> Self {
            self.routes.lock().push((key.into(), content.into()));
            self
        }

        /// Answers queued contents in order before any route or default.
        pub fn push_answer(&self, content: impl Into<String>) {
            self.queue.lock().push_back(content.into());
        }

        pub fn with_delay(self, delay: Duration) -> Self {
            *self.delay.lock() = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }

        /// Highest number of calls that were in progress at the same time.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReasoningModel for MockReasoningModel {
        async fn complete(
            &self,
            _system: &str,
            prompt: &str,
        ) -> Result<ModelCompletion, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().push(prompt.to_string());

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let queued = self.queue.lock().pop_front();
            let routed = || {
                self.routes
                    .lock()
                    .iter()
                    .find(|(key, _)| prompt.contains(key.as_str()))
                    .map(|(_, content)| content.clone())
            };
            let content = queued
                .or_else(routed)
                .or_else(|| self.default_answer.lock().clone())
                .ok_or(ModelError::RequestFailed {
                    reason: "mock model has no scripted answer".to_string(),
                })?;

            Ok(ModelCompletion {
                content,
                model: "mock".to_string(),
                tokens_used: Some(0),
                elapsed: delay.unwrap_or_default(),
            })
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }
}
