//! The assistant dispatcher: task kind in, generated text out.
//!
//! One dispatcher is built per surface with its [`OperatingContext`] fixed at
//! construction. Each request is validated, rendered exactly once, and the
//! rendered prompt is submitted to the provider. Retries re-submit the same
//! prompt; rendering never repeats.

use std::sync::Arc;
use std::time::Duration;

use propdesk_config::AppConfig;
use propdesk_core::{
    AssistantError, GenerationRequest, OperatingContext, Provider, ProviderError, TaskKind,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::templates::{PromptRegistry, StructuredInput};

/// How many times a transient provider failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total submissions, including the first. Never below 1.
    pub max_attempts: u32,
    /// Pause between submissions
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Submit once, never retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Generation parameters shared by every request a dispatcher handles.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Upper bound on a single provider submission
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl DispatcherSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        // A per-provider default model overrides the global one.
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self {
            model,
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            timeout: Duration::from_secs(config.assistant.timeout_secs),
            retry: RetryPolicy::new(
                config.assistant.max_attempts,
                Duration::from_millis(config.assistant.retry_backoff_ms),
            ),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A successful assistant response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    /// Provider text, unmodified
    pub text: String,
    /// Model that actually answered
    pub model: String,
    pub task_kind: TaskKind,
    pub context: OperatingContext,
    /// Submissions made, including the successful one
    pub attempts: u32,
}

pub struct Dispatcher {
    context: OperatingContext,
    registry: Arc<PromptRegistry>,
    provider: Arc<dyn Provider>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        context: OperatingContext,
        registry: Arc<PromptRegistry>,
        provider: Arc<dyn Provider>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            context,
            registry,
            provider,
            settings,
        }
    }

    pub fn context(&self) -> OperatingContext {
        self.context
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Handle a request by task kind wire name.
    ///
    /// An unknown name fails with [`AssistantError::UnknownTaskKind`] before
    /// the provider is contacted.
    pub async fn handle(
        &self,
        task_kind: &str,
        input: &StructuredInput,
    ) -> Result<AssistantReply, AssistantError> {
        self.handle_cancellable(task_kind, input, &CancellationToken::new())
            .await
    }

    pub async fn handle_kind(
        &self,
        kind: TaskKind,
        input: &StructuredInput,
    ) -> Result<AssistantReply, AssistantError> {
        self.dispatch(kind, input, &CancellationToken::new()).await
    }

    /// Like [`handle`](Self::handle), but gives up with
    /// [`AssistantError::Cancelled`] once `cancel` fires. A provider answer
    /// arriving after that is dropped.
    pub async fn handle_cancellable(
        &self,
        task_kind: &str,
        input: &StructuredInput,
        cancel: &CancellationToken,
    ) -> Result<AssistantReply, AssistantError> {
        let kind: TaskKind = task_kind.parse().inspect_err(|_| {
            warn!(context = %self.context, task_kind, "Rejected unknown task kind");
        })?;
        self.dispatch(kind, input, cancel).await
    }

    async fn dispatch(
        &self,
        kind: TaskKind,
        input: &StructuredInput,
        cancel: &CancellationToken,
    ) -> Result<AssistantReply, AssistantError> {
        let request_id = Uuid::new_v4();
        let prompt = self.registry.render(kind, input)?;

        info!(
            %request_id,
            context = %self.context,
            task_kind = %kind,
            provider = self.provider.name(),
            model = %self.settings.model,
            "Dispatching assistant request"
        );
        debug!(%request_id, prompt_len = prompt.len(), "Rendered prompt");

        let request = GenerationRequest {
            model: self.settings.model.clone(),
            prompt,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let submission = tokio::time::timeout(
                self.settings.timeout,
                self.provider.generate(request.clone()),
            );
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(%request_id, attempt, "Assistant request cancelled");
                    return Err(AssistantError::Cancelled);
                }
                outcome = submission => outcome,
            };

            let error = match outcome {
                Ok(Ok(response)) => {
                    info!(%request_id, attempt, model = %response.model, "Assistant request completed");
                    return Ok(AssistantReply {
                        text: response.text,
                        model: response.model,
                        task_kind: kind,
                        context: self.context,
                        attempts: attempt,
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "no response within {}ms",
                    self.settings.timeout.as_millis()
                )),
            };

            if attempt >= self.settings.retry.max_attempts || !error.is_transient() {
                warn!(%request_id, attempt, error = %error, "Assistant request failed");
                return Err(AssistantError::Unavailable {
                    provider: self.provider.name().to_string(),
                    source: error,
                });
            }

            warn!(
                %request_id,
                attempt,
                max_attempts = self.settings.retry.max_attempts,
                error = %error,
                "Transient provider failure, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AssistantError::Cancelled),
                _ = tokio::time::sleep(self.settings.retry.backoff) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use propdesk_core::{GenerationResponse, ProviderError};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every prompt it receives; answers from a script, then echoes.
    struct MockProvider {
        prompts: Mutex<Vec<String>>,
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        delay: Duration,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                delay: Duration::ZERO,
            }
        }

        fn then(self, answer: Result<&str, ProviderError>) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back(answer.map(String::from));
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let scripted = self.script.lock().unwrap().pop_front();
            let text = match scripted {
                Some(answer) => answer?,
                None => format!("echo: {}", request.prompt),
            };
            Ok(GenerationResponse {
                text,
                model: "mock-model".into(),
                usage: None,
            })
        }
    }

    fn dispatcher(context: OperatingContext, provider: Arc<MockProvider>) -> Dispatcher {
        Dispatcher::new(
            context,
            Arc::new(PromptRegistry::standard()),
            provider,
            DispatcherSettings::new("mock-model").with_timeout(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn listing_description_submits_rendered_prompt() {
        let provider = Arc::new(MockProvider::new().then(Ok("A charming home on Main St.")));
        let d = dispatcher(OperatingContext::Admin, provider.clone());

        let reply = d
            .handle(
                "generate-listing-description",
                &json!({"address": "1 Main St"}).into(),
            )
            .await
            .unwrap();

        assert_eq!(reply.text, "A charming home on Main St.");
        assert_eq!(reply.context, OperatingContext::Admin);
        assert_eq!(reply.task_kind, TaskKind::GenerateListingDescription);
        assert_eq!(reply.attempts, 1);
        assert_eq!(
            provider.prompts(),
            vec![r#"Write a beautiful listing description for: {"address":"1 Main St"}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_kind_never_reaches_provider() {
        let provider = Arc::new(MockProvider::new());
        let d = dispatcher(OperatingContext::Client, provider.clone());

        let err = d
            .handle("unknown-kind", &json!({}).into())
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::UnknownTaskKind(ref k) if k == "unknown-kind"));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn missing_template_never_reaches_provider() {
        let provider = Arc::new(MockProvider::new());
        let d = Dispatcher::new(
            OperatingContext::Admin,
            Arc::new(PromptRegistry::empty()),
            provider.clone(),
            DispatcherSettings::new("m"),
        );
        let err = d
            .handle_kind(TaskKind::RoadmapSuggestion, &StructuredInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unknown_task_kind");
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_unavailable() {
        let provider = Arc::new(
            MockProvider::new().then(Err(ProviderError::AuthenticationFailed("bad key".into()))),
        );
        let d = dispatcher(OperatingContext::Admin, provider.clone());

        let err = d
            .handle_kind(TaskKind::DevHelper, &StructuredInput::text("x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "assistant_unavailable");
        assert_eq!(err.public_message(), "Assistant unavailable");
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_with_same_prompt() {
        let provider = Arc::new(
            MockProvider::new()
                .then(Err(ProviderError::RateLimited { retry_after_secs: 1 }))
                .then(Ok("roadmap")),
        );
        let d = Dispatcher::new(
            OperatingContext::Admin,
            Arc::new(PromptRegistry::standard()),
            provider.clone(),
            DispatcherSettings::new("m")
                .with_retry(RetryPolicy::new(3, Duration::from_millis(200))),
        );

        let reply = d
            .handle("roadmap-suggestion", &StructuredInput::default())
            .await
            .unwrap();
        assert_eq!(reply.text, "roadmap");
        assert_eq!(reply.attempts, 2);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let provider = Arc::new(
            MockProvider::new().then(Err(ProviderError::ModelNotFound("m".into()))),
        );
        let d = Dispatcher::new(
            OperatingContext::Admin,
            Arc::new(PromptRegistry::standard()),
            provider.clone(),
            DispatcherSettings::new("m").with_retry(RetryPolicy::new(3, Duration::ZERO)),
        );
        assert!(d.handle("dev-helper", &StructuredInput::text("x")).await.is_err());
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = Arc::new(MockProvider::new().slow(Duration::from_secs(30)));
        let d = dispatcher(OperatingContext::Client, provider);

        let err = d
            .handle("summarize-inquiries", &json!(["hi"]).into())
            .await
            .unwrap_err();
        match err {
            AssistantError::Unavailable { source: ProviderError::Timeout(_), .. } => {}
            other => panic!("Expected timeout, got: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_discards_late_answer() {
        let provider = Arc::new(MockProvider::new().slow(Duration::from_secs(2)));
        let d = dispatcher(OperatingContext::Admin, provider.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = d
            .handle_cancellable("dev-helper", &StructuredInput::text("x"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Cancelled));
        assert_eq!(provider.prompts().len(), 1);
    }

    #[test]
    fn settings_from_config() {
        let mut config = AppConfig::default();
        config.assistant.max_attempts = 0;
        config.assistant.timeout_secs = 7;
        let settings = DispatcherSettings::from_config(&config);
        assert_eq!(settings.model, config.default_model);
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert_eq!(settings.retry.max_attempts, 1);
    }
}
