//! Ordered provider fallback with credential rotation.
//!
//! A [`ProviderCascade`] walks its candidate list in order. Each candidate
//! names a provider, a model and the credentials to rotate through. The first
//! candidate whose reply parses as a structured response wins. When every
//! candidate fails the cascade either returns the deterministic mock reply or,
//! with mock fallback disabled, [`LlmError::CascadeExhausted`].
//!
//! Every call is bounded by `min(call_timeout, remaining deadline)`. A call
//! that exceeds its budget is dropped, which aborts the in-flight request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use super::base_llm::{ChatMessage, CompletionProvider, Credential, TokenUsage};
use super::error::{LlmError, ProviderError};
use super::mock::mock_response;
use super::providers::{gemini, openrouter, GeminiProvider, OpenRouterProvider};
use super::structured::{parse_structured, system_prompt};
use crate::config::Settings;
use crate::types::response::StructuredResponse;

/// Reference Gemini models, tried first.
pub const GEMINI_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.5-pro"];

/// Reference OpenRouter models, tried after Gemini.
pub const OPENROUTER_MODELS: &[&str] = &[
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "nousresearch/hermes-3-llama-3.1-405b:free",
    "google/gemma-3-27b-it:free",
    "meta-llama/llama-3.2-3b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
];

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// One entry of the fallback list.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    pub model: String,
    /// Tried in order until one succeeds.
    pub credentials: Vec<Credential>,
}

impl ProviderAttempt {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        credentials: Vec<Credential>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            credentials,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CascadeConfig {
    /// Upper bound for a single provider call.
    pub call_timeout: Duration,
    /// Upper bound for a whole cascade run.
    pub deadline: Duration,
    /// Return the mock reply instead of an error when every candidate fails.
    pub mock_fallback: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(15),
            deadline: Duration::from_secs(60),
            mock_fallback: true,
        }
    }
}

impl CascadeConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            call_timeout: settings.provider_call_timeout(),
            deadline: settings.cascade_deadline(),
            mock_fallback: settings.enable_mock_fallback,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// Skip providers entirely and answer from the mock table.
    pub force_mock: bool,
    /// Caller deadline; the earlier of this and the configured deadline applies.
    pub deadline: Option<Instant>,
}

impl CallOptions {
    pub fn forced_mock(force_mock: bool) -> Self {
        Self {
            force_mock,
            deadline: None,
        }
    }
}

/// Result of trying one candidate.
enum CandidateOutcome {
    Completed(StructuredResponse),
    Failed(ProviderError),
}

// ---------------------------------------------------------------------------
// ProviderCascade
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ProviderCascade {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
    attempts: Vec<ProviderAttempt>,
    config: CascadeConfig,
}

impl ProviderCascade {
    /// Empty cascade: no providers, no candidates.
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            providers: HashMap::new(),
            attempts: Vec::new(),
            config,
        }
    }

    /// Cascade with the reference candidate list: Gemini (rotating through the
    /// configured Google keys) then the OpenRouter free tier. Candidates whose
    /// provider has no credential are still listed and fail fast.
    pub fn from_settings(settings: &Settings) -> Self {
        let google_keys: Vec<Credential> = settings
            .google_api_keys
            .iter()
            .enumerate()
            .map(|(i, key)| Credential::new(format!("google#{}", i + 1), key.clone()))
            .collect();
        let openrouter_keys: Vec<Credential> = settings
            .openrouter_api_key
            .iter()
            .map(|key| Credential::new("openrouter", key.clone()))
            .collect();

        let mut cascade = Self::new(CascadeConfig::from_settings(settings))
            .with_provider(Arc::new(GeminiProvider::new(&settings.gemini_base_url)))
            .with_provider(Arc::new(OpenRouterProvider::new(&settings.openrouter_base_url)));
        for model in GEMINI_MODELS {
            cascade = cascade.with_attempt(ProviderAttempt::new(
                gemini::PROVIDER_NAME,
                *model,
                google_keys.clone(),
            ));
        }
        for model in OPENROUTER_MODELS {
            cascade = cascade.with_attempt(ProviderAttempt::new(
                openrouter::PROVIDER_NAME,
                *model,
                openrouter_keys.clone(),
            ));
        }
        cascade
    }

    /// Register a provider implementation under its own name.
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    /// Append a candidate to the fallback list.
    pub fn with_attempt(mut self, attempt: ProviderAttempt) -> Self {
        self.attempts.push(attempt);
        self
    }

    pub fn attempts(&self) -> &[ProviderAttempt] {
        &self.attempts
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Produce a structured response for `query` under `persona`.
    pub async fn complete(
        &self,
        persona: &str,
        query: &str,
        context: &str,
        force_mock: bool,
    ) -> Result<StructuredResponse, LlmError> {
        self.complete_with(persona, query, context, CallOptions::forced_mock(force_mock))
            .await
    }

    /// [`complete`](Self::complete) with explicit per-request options.
    pub async fn complete_with(
        &self,
        persona: &str,
        query: &str,
        context: &str,
        options: CallOptions,
    ) -> Result<StructuredResponse, LlmError> {
        let started = Instant::now();

        if options.force_mock {
            log::info!("[Cascade] force_mock set, answering '{}' from the mock table", persona);
            return Ok(self.mock(persona, query, started, 0));
        }

        let configured = started + self.config.deadline;
        let deadline = options
            .deadline
            .map_or(configured, |caller| caller.min(configured));

        let messages = [
            ChatMessage::system(system_prompt(persona, context)),
            ChatMessage::user(query),
        ];

        let mut last_error: Option<ProviderError> = None;
        for (index, attempt) in self.attempts.iter().enumerate() {
            match self.try_candidate(attempt, &messages, persona, deadline).await {
                CandidateOutcome::Completed(mut response) => {
                    response.processing_time = started.elapsed().as_secs_f64();
                    response
                        .metadata
                        .insert("attempts".to_string(), json!(index + 1));
                    log::info!(
                        "[Cascade] {}/{} answered after {} attempt(s)",
                        attempt.provider,
                        attempt.model,
                        index + 1
                    );
                    return Ok(response);
                }
                CandidateOutcome::Failed(err) => {
                    log::warn!("[Cascade] candidate {} failed: {}", index + 1, err);
                    last_error = Some(err);
                }
            }
        }

        let attempts = self.attempts.len();
        if self.config.mock_fallback {
            log::warn!(
                "[Cascade] all {} candidate(s) failed, falling back to mock reply",
                attempts
            );
            return Ok(self.mock(persona, query, started, attempts));
        }

        match last_error {
            Some(last) => {
                log::error!("[Cascade] exhausted after {} candidate(s): {}", attempts, last);
                Err(LlmError::CascadeExhausted { attempts, last })
            }
            None => Err(LlmError::NoCandidates),
        }
    }

    fn mock(
        &self,
        persona: &str,
        query: &str,
        started: Instant,
        attempts: usize,
    ) -> StructuredResponse {
        let mut response = mock_response(persona, query);
        response.processing_time = started.elapsed().as_secs_f64();
        response
            .metadata
            .insert("attempts".to_string(), json!(attempts));
        response
    }

    async fn try_candidate(
        &self,
        attempt: &ProviderAttempt,
        messages: &[ChatMessage],
        persona: &str,
        deadline: Instant,
    ) -> CandidateOutcome {
        let Some(provider) = self.providers.get(&attempt.provider) else {
            return CandidateOutcome::Failed(ProviderError::UnknownProvider {
                provider: attempt.provider.clone(),
            });
        };
        if attempt.credentials.is_empty() {
            return CandidateOutcome::Failed(ProviderError::MissingCredential {
                provider: attempt.provider.clone(),
            });
        }

        let mut failures: Vec<ProviderError> = Vec::new();
        for credential in &attempt.credentials {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                failures.push(ProviderError::DeadlineReached {
                    provider: attempt.provider.clone(),
                    model: attempt.model.clone(),
                });
                break;
            }
            let budget = remaining.min(self.config.call_timeout);

            let raw = match tokio::time::timeout(
                budget,
                provider.complete(&attempt.model, credential, messages),
            )
            .await
            {
                Ok(Ok(raw)) => raw,
                Ok(Err(err)) => {
                    log::debug!(
                        "[Cascade] {}/{} with {} failed: {}",
                        attempt.provider,
                        attempt.model,
                        credential.label(),
                        err
                    );
                    failures.push(err);
                    continue;
                }
                Err(_) => {
                    failures.push(ProviderError::Timeout {
                        provider: attempt.provider.clone(),
                        model: attempt.model.clone(),
                        after: budget,
                    });
                    continue;
                }
            };

            // The credential worked; a bad payload is the model's fault, so move
            // on to the next candidate rather than the next key.
            return match parse_structured(&raw.text, persona) {
                Ok(response) => {
                    let usage = raw
                        .usage
                        .unwrap_or_else(|| TokenUsage::estimate(&messages_text(messages), &raw.text));
                    CandidateOutcome::Completed(
                        response
                            .with_metadata("provider", json!(attempt.provider))
                            .with_metadata("model", json!(attempt.model))
                            .with_metadata("token_usage", json!(usage)),
                    )
                }
                Err(reason) => CandidateOutcome::Failed(ProviderError::MalformedPayload {
                    provider: attempt.provider.clone(),
                    model: attempt.model.clone(),
                    reason,
                }),
            };
        }

        let attempted = failures.len();
        let last = failures.pop().unwrap_or_else(|| ProviderError::MissingCredential {
            provider: attempt.provider.clone(),
        });
        if attempted <= 1 {
            CandidateOutcome::Failed(last)
        } else {
            CandidateOutcome::Failed(ProviderError::CredentialsExhausted {
                provider: attempt.provider.clone(),
                attempted,
                last: Box::new(last),
            })
        }
    }
}

fn messages_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::base_llm::RawCompletion;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Scripted provider: replies per `(model, credential label)`, records calls.
    #[derive(Debug, Default)]
    struct ScriptedProvider {
        name: String,
        replies: HashMap<(String, String), Result<String, u16>>,
        delay: Option<Duration>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedProvider {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }

        fn reply(mut self, model: &str, cred: &str, reply: Result<&str, u16>) -> Self {
            self.replies.insert(
                (model.to_string(), cred.to_string()),
                reply.map(str::to_string),
            );
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(
            &self,
            model: &str,
            credential: &Credential,
            _messages: &[ChatMessage],
        ) -> Result<RawCompletion, ProviderError> {
            self.calls
                .lock()
                .push((model.to_string(), credential.label().to_string()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.replies.get(&(model.to_string(), credential.label().to_string())) {
                Some(Ok(text)) => Ok(RawCompletion {
                    text: text.clone(),
                    usage: None,
                }),
                Some(Err(status)) => Err(ProviderError::Status {
                    provider: self.name.clone(),
                    status: *status,
                    body: "quota exceeded".to_string(),
                }),
                None => Err(ProviderError::Status {
                    provider: self.name.clone(),
                    status: 404,
                    body: "model not found".to_string(),
                }),
            }
        }
    }

    fn creds(labels: &[&str]) -> Vec<Credential> {
        labels.iter().map(|l| Credential::new(*l, "secret")).collect()
    }

    fn config(mock_fallback: bool) -> CascadeConfig {
        CascadeConfig {
            call_timeout: Duration::from_millis(200),
            deadline: Duration::from_secs(5),
            mock_fallback,
        }
    }

    const GOOD: &str = "```json\n{\"content\": \"Fee collection is 92% complete.\"}\n```";

    #[tokio::test]
    async fn test_first_success_wins_and_records_metadata() {
        let google = Arc::new(
            ScriptedProvider::new("google")
                .reply("flash", "k1", Err(429))
                .reply("flash", "k2", Ok(GOOD)),
        );
        let cascade = ProviderCascade::new(config(true))
            .with_provider(google.clone())
            .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1", "k2"])))
            .with_attempt(ProviderAttempt::new("google", "pro", creds(&["k1"])));

        let resp = cascade.complete("finance", "fee status", "", false).await.unwrap();
        assert_eq!(resp.content, "Fee collection is 92% complete.");
        assert_eq!(resp.metadata["provider"], json!("google"));
        assert_eq!(resp.metadata["model"], json!("flash"));
        assert_eq!(resp.metadata["attempts"], json!(1));
        assert!(resp.metadata.contains_key("token_usage"));
        // Key rotation stopped at the first working key; `pro` never tried.
        assert_eq!(
            google.calls(),
            vec![
                ("flash".to_string(), "k1".to_string()),
                ("flash".to_string(), "k2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_advances_to_next_candidate() {
        let google = Arc::new(ScriptedProvider::new("google").reply(
            "flash",
            "k1",
            Ok("Here is a summary of fees."),
        ));
        let router = Arc::new(ScriptedProvider::new("openrouter").reply("llama", "or", Ok(GOOD)));
        let cascade = ProviderCascade::new(config(false))
            .with_provider(google.clone())
            .with_provider(router)
            .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1", "k2"])))
            .with_attempt(ProviderAttempt::new("openrouter", "llama", creds(&["or"])));

        let resp = cascade.complete("finance", "fees", "", false).await.unwrap();
        assert_eq!(resp.metadata["provider"], json!("openrouter"));
        assert_eq!(resp.metadata["attempts"], json!(2));
        // k2 is not tried after k1 produced a bad payload.
        assert_eq!(google.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_mock_when_enabled() {
        let cascade = ProviderCascade::new(config(true))
            .with_provider(Arc::new(ScriptedProvider::new("google")))
            .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1"])))
            .with_attempt(ProviderAttempt::new("openrouter", "llama", Vec::new()));

        let resp = cascade
            .complete("principal", "Approve the lab budget", "", false)
            .await
            .unwrap();
        assert!(resp.content.contains("Budget Approval"));
        assert_eq!(resp.metadata["mock"], json!(true));
        assert_eq!(resp.metadata["attempts"], json!(2));
    }

    #[tokio::test]
    async fn test_exhaustion_is_an_error_when_mock_disabled() {
        let cascade = ProviderCascade::new(config(false))
            .with_provider(Arc::new(ScriptedProvider::new("google")))
            .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1", "k2"])));

        let err = cascade.complete("finance", "fees", "", false).await.unwrap_err();
        match err {
            LlmError::CascadeExhausted { attempts, last } => {
                assert_eq!(attempts, 1);
                assert!(matches!(
                    last,
                    ProviderError::CredentialsExhausted { attempted: 2, .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }

        let empty = ProviderCascade::new(config(false));
        assert!(matches!(
            empty.complete("finance", "fees", "", false).await,
            Err(LlmError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_and_cascade_moves_on() {
        let slow = Arc::new(
            ScriptedProvider::new("google")
                .reply("flash", "k1", Ok(GOOD))
                .delayed(Duration::from_secs(10)),
        );
        let fast = Arc::new(ScriptedProvider::new("openrouter").reply("llama", "or", Ok(GOOD)));
        let cascade = ProviderCascade::new(config(false))
            .with_provider(slow)
            .with_provider(fast)
            .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1"])))
            .with_attempt(ProviderAttempt::new("openrouter", "llama", creds(&["or"])));

        let started = std::time::Instant::now();
        let resp = cascade.complete("finance", "fees", "", false).await.unwrap();
        assert_eq!(resp.metadata["provider"], json!("openrouter"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_caller_deadline_bounds_the_run() {
        let slow = Arc::new(
            ScriptedProvider::new("google")
                .reply("flash", "k1", Ok(GOOD))
                .delayed(Duration::from_secs(10)),
        );
        let cascade = ProviderCascade::new(CascadeConfig {
            call_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(30),
            mock_fallback: false,
        })
        .with_provider(slow)
        .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1"])))
        .with_attempt(ProviderAttempt::new("google", "pro", creds(&["k1"])));

        let options = CallOptions {
            force_mock: false,
            deadline: Some(Instant::now() + Duration::from_millis(150)),
        };
        let started = std::time::Instant::now();
        let err = cascade
            .complete_with("finance", "fees", "", options)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            LlmError::CascadeExhausted { last, .. } => {
                assert!(matches!(last, ProviderError::DeadlineReached { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_force_mock_skips_providers() {
        let google = Arc::new(ScriptedProvider::new("google").reply("flash", "k1", Ok(GOOD)));
        let cascade = ProviderCascade::new(config(false))
            .with_provider(google.clone())
            .with_attempt(ProviderAttempt::new("google", "flash", creds(&["k1"])));

        let resp = cascade.complete("faculty", "hello", "", true).await.unwrap();
        assert!(resp.content.starts_with("**Mock Mode Active**"));
        assert!(google.calls().is_empty());
    }

    #[test]
    fn test_reference_candidate_order() {
        let mut settings = Settings::default();
        settings.google_api_keys = vec!["a".to_string(), "b".to_string()];
        settings.openrouter_api_key = Some("c".to_string());
        let cascade = ProviderCascade::from_settings(&settings);

        let attempts = cascade.attempts();
        assert_eq!(attempts.len(), 8);
        assert_eq!(attempts[0].provider, "google");
        assert_eq!(attempts[0].model, "gemini-1.5-flash");
        assert_eq!(attempts[0].credentials.len(), 2);
        assert_eq!(attempts[2].provider, "openrouter");
        assert_eq!(attempts[7].model, "mistralai/mistral-7b-instruct:free");
    }
}
