use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::LlmError;

/// One role-tagged message of a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Abstraction over the text-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages, return the raw content of the first choice.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

// ═══════════════════════════════════════════════════════════
// Mistral chat-completions client
// ═══════════════════════════════════════════════════════════

pub struct MistralClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl MistralClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl LlmClient for MistralClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("response has no choices".into()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ═══════════════════════════════════════════════════════════
// Retry policy
// ═══════════════════════════════════════════════════════════

/// Bounded exponential backoff with jitter, applied to rate-limit errors only.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of random jitter, as a fraction of the backoff step.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::MODEL_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(crate::config::MODEL_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(crate::config::MODEL_RETRY_MAX_DELAY_MS),
            jitter_ratio: 0.1,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_ratio: 0.0,
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let step = self.base_delay.saturating_mul(1u32 << exponent);
        step.min(self.max_delay)
    }

    /// Backoff plus a random jitter of up to `jitter_ratio` of the step.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let step = self.backoff(attempt);
        if self.jitter_ratio <= 0.0 || step.is_zero() {
            return step;
        }
        let factor = rand::thread_rng().gen_range(0.0..=self.jitter_ratio);
        step + step.mul_f64(factor)
    }
}

fn is_retryable(e: &LlmError) -> bool {
    matches!(e, LlmError::RateLimited)
}

/// Call the client, retrying rate-limited responses per `policy`.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    messages: &[ChatMessage],
    policy: &RetryPolicy,
) -> Result<String, LlmError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match client.complete(messages).await {
            Ok(content) => return Ok(content),
            Err(e) if is_retryable(&e) && attempt < attempts => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Model call rate limited, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Mock client
// ═══════════════════════════════════════════════════════════

/// Mock LLM client for testing: replays queued results, then a fixed response.
pub struct MockLlmClient {
    queued: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a result returned before the fixed response.
    pub fn then(self, result: Result<String, LlmError>) -> Self {
        if let Ok(mut queue) = self.queued.lock() {
            queue.push_back(result);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(result) => result,
            None => Ok(self.fallback.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
