//! Completion client for AMU insights
//!
//! Sends one chat-style request (fixed system turn + composed prompt) to the
//! configured completion endpoint. Up to `max_attempts` attempts, retried
//! immediately on non-success status, timeout or transport failure. Each
//! attempt is bounded by `request_timeout_ms`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

use crate::config::{InsightsConfig, API_KEY_ENV};

pub const SYSTEM_PROMPT: &str = "You are an expert veterinary assistant specializing in livestock health and antimicrobial usage (AMU) analysis. Provide detailed, professional insights about animal health, drug dosages, and treatment recommendations.";

const ERROR_PREFIX: &str = "Error generating insights";

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// Abstraction over text-completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `prompt`, returning the provider's narrative text.
    async fn complete(&self, prompt: &str) -> Result<String, InsightError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Run `prompt` through `backend` and always return text: either the
/// completion or a readable error message.
pub async fn generate_insight(backend: &dyn CompletionBackend, prompt: &str) -> String {
    match backend.complete(prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(backend = backend.name(), error = %e, "Insight generation failed");
            e.to_insight_text()
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Failure of a completion request.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("{code} - {body}")]
    Status { code: u16, body: String },

    #[error("Request timeout after multiple attempts. Please try again.")]
    Timeout,

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("{0}")]
    MalformedResponse(String),
}

impl InsightError {
    /// Status, timeout and transport failures are retried; anything else
    /// ends the request immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InsightError::Status { .. } | InsightError::Timeout | InsightError::Transport(_)
        )
    }

    pub fn to_insight_text(&self) -> String {
        format!("{}: {}", ERROR_PREFIX, self)
    }
}

impl From<reqwest::Error> for InsightError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InsightError::Timeout
        } else {
            InsightError::Transport(e)
        }
    }
}

// ============================================================================
// Chat completion wire types (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// ============================================================================
// ChatCompletionClient
// ============================================================================

/// OpenAI-style chat completions client (Perplexity by default).
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    config: InsightsConfig,
}

impl ChatCompletionClient {
    pub fn new(config: InsightsConfig) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// The credential is resolved per call so a rotated key is picked up
    /// without a restart. A missing key is sent empty and rejected upstream.
    fn api_key(&self) -> String {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default()
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn complete_once(
        &self,
        request: &ChatRequest,
        api_key: &str,
        attempt: usize,
    ) -> Result<String, InsightError> {
        let result = self.send(request, api_key).await;

        if let Err(e) = &result {
            tracing::warn!(
                attempt,
                max_attempts = self.config.max_attempts,
                retryable = e.is_retryable(),
                error = %e,
                "Completion attempt failed"
            );
        }

        result
    }

    async fn send(&self, request: &ChatRequest, api_key: &str) -> Result<String, InsightError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            InsightError::MalformedResponse(format!("invalid completion response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                InsightError::MalformedResponse(
                    "completion response contained no choices".to_string(),
                )
            })
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, InsightError> {
        let request = self.build_request(prompt);
        let api_key = self.api_key();
        let attempt = AtomicUsize::new(0);

        // Immediate retries: the first attempt plus `max_attempts - 1` more.
        let retry_strategy = FixedInterval::from_millis(0).take(self.config.max_attempts.saturating_sub(1));

        let result = RetryIf::spawn(
            retry_strategy,
            || {
                let n = attempt.fetch_add(1, Ordering::Relaxed) + 1;
                self.complete_once(&request, &api_key, n)
            },
            InsightError::is_retryable,
        )
        .await;

        match &result {
            Ok(text) => tracing::info!(
                attempts = attempt.load(Ordering::Relaxed),
                chars = text.len(),
                "Completion succeeded"
            ),
            Err(e) => tracing::error!(
                attempts = attempt.load(Ordering::Relaxed),
                error = %e,
                "All completion attempts failed"
            ),
        }

        result
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(mock_server: &MockServer) -> InsightsConfig {
        InsightsConfig {
            endpoint: format!("{}/chat/completions", mock_server.uri()),
            api_key: Some("test-api-key".to_string()),
            request_timeout_ms: 2_000,
            ..InsightsConfig::default()
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "cmpl-1",
            "model": "sonar",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": text } }
            ]
        })
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_does_not_retry() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server)).unwrap();

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "model": "sonar",
                "max_tokens": 1500,
                "temperature": 0.7,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": "how is cow 7?" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Dosage is fine.")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let text = generate_insight(&client, "how is cow 7?").await;
        assert_eq!(text, "Dosage is fine.");
    }

    #[tokio::test]
    async fn test_retries_after_two_server_errors_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server)).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("third time lucky")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.complete("prompt").await;
        assert_eq!(result.unwrap(), "third time lucky");
    }

    #[tokio::test]
    async fn test_status_error_after_exhausting_attempts() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server)).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let text = generate_insight(&client, "prompt").await;
        assert_eq!(text, "Error generating insights: 500 - upstream exploded");
    }

    #[tokio::test]
    async fn test_all_attempts_time_out() {
        let mock_server = MockServer::start().await;
        let config = InsightsConfig {
            request_timeout_ms: 100,
            ..test_config(&mock_server)
        };
        let client = ChatCompletionClient::new(config).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("too late"))
                    .set_delay(Duration::from_millis(1_000)),
            )
            .expect(3)
            .mount(&mock_server)
            .await;

        let text = generate_insight(&client, "prompt").await;
        assert_eq!(
            text,
            "Error generating insights: Request timeout after multiple attempts. Please try again."
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_surfaces_as_status_error() {
        let mock_server = MockServer::start().await;
        let config = InsightsConfig {
            api_key: Some(String::new()),
            ..test_config(&mock_server)
        };
        let client = ChatCompletionClient::new(config).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let text = generate_insight(&client, "prompt").await;
        assert_eq!(text, "Error generating insights: 401 - unauthorized");
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_not_retried() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server)).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let text = generate_insight(&client, "prompt").await;
        assert!(
            text.starts_with("Error generating insights: invalid completion response"),
            "unexpected text: {}",
            text
        );
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mock_server = MockServer::start().await;
        let client = ChatCompletionClient::new(test_config(&mock_server)).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.complete("prompt").await;
        match result {
            Err(InsightError::MalformedResponse(msg)) => assert!(msg.contains("no choices")),
            other => panic!("Expected MalformedResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_as_text() {
        let config = InsightsConfig {
            endpoint: "http://127.0.0.1:1/chat/completions".to_string(),
            api_key: Some("k".to_string()),
            request_timeout_ms: 2_000,
            ..InsightsConfig::default()
        };
        let client = ChatCompletionClient::new(config).unwrap();

        let text = generate_insight(&client, "prompt").await;
        assert!(text.starts_with("Error generating insights: "));
        assert!(!text.contains("Request timeout"), "unexpected text: {}", text);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(InsightError::Timeout.is_retryable());
        assert!(InsightError::Status { code: 503, body: String::new() }.is_retryable());
        assert!(!InsightError::MalformedResponse("x".to_string()).is_retryable());
    }
}
