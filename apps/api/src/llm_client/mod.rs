/// LLM Client: the single point of entry for all model provider calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// The template pipeline only sees the `CompletionService` and
/// `EmbeddingService` traits; `LlmClient` is the production implementation
/// and tests substitute fakes.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

use prompts::JSON_ONLY_SYSTEM;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Chat-completion seam. Implementations must be safe to share across tasks.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a single user prompt and returns the raw text of the first choice.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;
}

/// Embedding seam. Returns one vector per input, in input order.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text content of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Settings for building an `LlmClient`.
#[derive(Debug, Clone)]
pub struct LlmClientOptions {
    pub api_key: String,
    pub base_url: String,
    pub completion_model: String,
    pub embedding_model: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// The single provider client shared by the extraction and embedding steps.
/// Wraps an OpenAI-compatible API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    completions_url: String,
    embeddings_url: String,
    completion_model: String,
    embedding_model: String,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(options: LlmClientOptions) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        let base_url = options.base_url.trim_end_matches('/');

        Ok(Self {
            client,
            api_key: options.api_key,
            completions_url: format!("{base_url}/chat/completions"),
            embeddings_url: format!("{base_url}/embeddings"),
            completion_model: options.completion_model,
            embedding_model: options.embedding_model,
            max_retries: options.max_retries.max(1),
        })
    }

    pub fn completion_model(&self) -> &str {
        &self.completion_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Makes a raw chat-completion call, returning the full response object.
    pub async fn call(&self, prompt: &str, temperature: f32) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: &self.completion_model,
            temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: JSON_ONLY_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .send_with_retry(|| self.client.post(&self.completions_url).json(&request_body))
            .await?;
        let chat: ChatResponse = decode_body(&response.text().await?)?;

        if let Some(usage) = &chat.usage {
            debug!(
                "Completion call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(chat)
    }

    /// Sends a request built by `build`, retrying on 429, 5xx and transport
    /// errors with exponential backoff.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, LlmError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(5)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = build().bearer_auth(&self.api_key).send().await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(api_error(status, body));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(api_error(status, body));
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.max_retries,
        }))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let response = self.call(prompt, temperature).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl EmbeddingService for LlmClient {
    async fn embed(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request_body = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };

        let response = self
            .send_with_retry(|| self.client.post(&self.embeddings_url).json(&request_body))
            .await?;
        let parsed: EmbeddingResponse = decode_body(&response.text().await?)?;

        debug!("Embedding call returned {} vectors", parsed.data.len());
        Ok(order_embeddings(parsed.data))
    }
}

/// Sorts provider embeddings by their `index` field and drops the index.
fn order_embeddings(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|entry| entry.index);
    data.into_iter().map(|entry| entry.embedding).collect()
}

/// Decodes a successful response body; malformed payloads surface as `LlmError::Parse`.
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, LlmError> {
    Ok(serde_json::from_str(body)?)
}

fn api_error(status: StatusCode, body: String) -> LlmError {
    LlmError::Api {
        status: status.as_u16(),
        message: provider_error_message(body),
    }
}

/// Pulls `error.message` out of a provider error body, falling back to the raw body.
fn provider_error_message(body: String) -> String {
    serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_text_reads_first_choice() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"template\": \"x\"}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"template\": \"x\"}"));
        assert_eq!(response.usage.unwrap().prompt_tokens, 12);
    }

    #[test]
    fn test_chat_response_without_choices_has_no_text() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_order_embeddings_sorts_by_index() {
        let json = r#"{"data": [
            {"object": "embedding", "index": 1, "embedding": [0.5, 0.5]},
            {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        let ordered = order_embeddings(parsed.data);
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_provider_error_message_extracts_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(
            provider_error_message(body.to_string()),
            "Incorrect API key provided"
        );
    }

    #[test]
    fn test_provider_error_message_falls_back_to_body() {
        assert_eq!(provider_error_message("bad gateway".to_string()), "bad gateway");
    }

    #[test]
    fn test_decode_body_reports_malformed_payload_as_parse_error() {
        let err = decode_body::<ChatResponse>(r#"{"choices": [{"message": "#).unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
        assert!(err.to_string().starts_with("JSON parse error"));
    }

    #[test]
    fn test_api_error_uses_provider_message_for_retryable_and_fatal_statuses() {
        let body = r#"{"error": {"message": "Rate limit reached for gpt-4", "type": "requests"}}"#;
        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::BAD_GATEWAY, StatusCode::UNAUTHORIZED] {
            match api_error(status, body.to_string()) {
                LlmError::Api { status: code, message } => {
                    assert_eq!(code, status.as_u16());
                    assert_eq!(message, "Rate limit reached for gpt-4");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_new_trims_trailing_slash_from_base_url() {
        let client = LlmClient::new(LlmClientOptions {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:9999/v1/".to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
        })
        .unwrap();
        assert_eq!(client.completions_url, "http://localhost:9999/v1/chat/completions");
        assert_eq!(client.embeddings_url, "http://localhost:9999/v1/embeddings");
        assert_eq!(client.max_retries, 1);
        assert_eq!(client.completion_model(), "gpt-4");
    }
}
