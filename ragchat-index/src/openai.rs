//! OpenAI embedding function and chat model.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chat::{ChatModel, ChatOptions, ChatResponse};
use crate::embedding::EmbeddingFunction;
use crate::error::{RagError, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Embedding size requested from the API unless overridden.
const DEFAULT_DIMENSIONS: usize = 1024;

const PROVIDER: &str = "OpenAI";

/// An [`EmbeddingFunction`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-large`.
/// - `dimensions` – Matryoshka dimension requested from the API, defaults to 1024.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::openai::OpenAIEmbeddingFunction;
///
/// let function = OpenAIEmbeddingFunction::new("sk-...")?;
/// let embedding = function.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingFunction {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingFunction {
    /// Create a new embedding function with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_api_key(api_key.into(), |message| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message,
            })?,
            base_url: OPENAI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new embedding function using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `text-embedding-3-small`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn require_api_key(api_key: String, err: impl FnOnce(String) -> RagError) -> Result<String> {
    if api_key.is_empty() {
        return Err(err("API key must not be empty".into()));
    }
    Ok(api_key)
}

/// Turn a non-success response into its error message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── EmbeddingFunction implementation ───────────────────────────────

#[async_trait]
impl EmbeddingFunction for OpenAIEmbeddingFunction {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.dimensions,
        };

        let map_err =
            |message: String| RagError::EmbeddingError { provider: PROVIDER.into(), message };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                map_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(map_err(message));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            map_err(format!("failed to parse response: {e}"))
        })?;

        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`ChatModel`] backed by the OpenAI chat completions API.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    options: ChatOptions,
}

impl OpenAIChatModel {
    /// Create a chat model for `model` (e.g. `gpt-4o-mini`).
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        options: ChatOptions,
    ) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_api_key(api_key.into(), |message| RagError::ModelError {
                provider: PROVIDER.into(),
                message,
            })?,
            base_url: OPENAI_BASE_URL.into(),
            model: model.into(),
            options,
        })
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = prompt.len(),
            "invoking chat model"
        );

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        let map_err = |message: String| RagError::ModelError { provider: PROVIDER.into(), message };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                map_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(map_err(message));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            map_err(format!("failed to parse response: {e}"))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| map_err("API returned no choices".into()))?;

        Ok(ChatResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(OpenAIEmbeddingFunction::new(""), Err(RagError::EmbeddingError { .. })));
        assert!(matches!(
            OpenAIChatModel::new("", "gpt-4o-mini", ChatOptions::default()),
            Err(RagError::ModelError { .. })
        ));
    }

    #[test]
    fn embedding_defaults_and_overrides() {
        let function = OpenAIEmbeddingFunction::new("sk-test").unwrap();
        assert_eq!(function.dimensions(), 1024);
        assert_eq!(function.model, DEFAULT_EMBEDDING_MODEL);

        let function = function
            .with_model("text-embedding-3-small")
            .with_dimensions(256)
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(function.dimensions(), 256);
        assert_eq!(function.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn request_bodies_match_the_api() {
        let body = EmbeddingRequest { model: "m", input: vec!["a", "b"], dimensions: 8 };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"model": "m", "input": ["a", "b"], "dimensions": 8})
        );

        let body = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage { role: "user", content: "hi" }],
            temperature: 0.0,
            max_tokens: 500,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.0,
                "max_tokens": 500,
            })
        );
    }

    #[test]
    fn embedding_response_is_parsed() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "data": [
                {"index": 1, "embedding": [0.5]},
                {"index": 0, "embedding": [0.25]},
            ]
        }))
        .unwrap();
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        assert_eq!(data[0].embedding, vec![0.25]);
    }
}
