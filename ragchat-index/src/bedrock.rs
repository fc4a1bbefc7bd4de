//! Amazon Bedrock embedding function and chat model.
//!
//! Requests are authenticated with a Bedrock API key sent as a bearer token.
//! Embeddings use the Titan `invoke` body shape; chat uses the `converse` API.
//! This module is only available when the `bedrock` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};
use url::Url;

use crate::chat::{ChatModel, ChatOptions, ChatResponse};
use crate::embedding::EmbeddingFunction;
use crate::error::{RagError, Result};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Titan text embeddings v2 output size.
const DEFAULT_DIMENSIONS: usize = 1024;

const PROVIDER: &str = "Bedrock";

/// Connection parameters shared by Bedrock clients.
#[derive(Clone)]
struct BedrockClient {
    client: reqwest::Client,
    api_key: String,
    region: String,
}

impl BedrockClient {
    fn new(
        api_key: String,
        region: Option<&str>,
        err: impl FnOnce(String) -> RagError,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(err("BEDROCK_API_KEY must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            region: region.unwrap_or(DEFAULT_REGION).to_string(),
        })
    }

    /// `https://bedrock-runtime.<region>.amazonaws.com/model/<model>/<action>`
    fn model_url(&self, model: &str, action: &str) -> std::result::Result<Url, String> {
        let mut url = Url::parse(&format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
            .map_err(|e| format!("invalid region '{}': {e}", self.region))?;
        url.path_segments_mut()
            .map_err(|_| "endpoint URL cannot carry a path".to_string())?
            .extend(["model", model, action]);
        Ok(url)
    }

    async fn post(&self, url: Url, body: &impl Serialize) -> std::result::Result<Value, String> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned {status}: {body}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbeddingRequest<'a> {
    input_text: &'a str,
    dimensions: usize,
    normalize: bool,
}

#[derive(Deserialize)]
struct TitanEmbeddingResponse {
    embedding: Vec<f32>,
}

/// An [`EmbeddingFunction`] backed by a Bedrock Titan text embedding model.
///
/// Titan embeds one text per request, so batches are sent sequentially.
pub struct BedrockEmbeddingFunction {
    inner: BedrockClient,
    model: String,
    dimensions: usize,
}

impl BedrockEmbeddingFunction {
    /// Create an embedding function for `model` (e.g. `amazon.titan-embed-text-v2:0`).
    pub fn new(
        api_key: impl Into<String>,
        region: Option<&str>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let inner = BedrockClient::new(api_key.into(), region, |message| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message,
        })?;
        Ok(Self { inner, model: model.into(), dimensions: DEFAULT_DIMENSIONS })
    }

    /// Request a different output size (256, 512 or 1024 for Titan v2).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }
}

#[async_trait]
impl EmbeddingFunction for BedrockEmbeddingFunction {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            text_len = text.len(),
            "embedding single text"
        );

        let map_err = |message: String| {
            error!(provider = PROVIDER, %message, "embedding request failed");
            RagError::EmbeddingError { provider: PROVIDER.into(), message }
        };

        let url = self.inner.model_url(&self.model, "invoke").map_err(map_err)?;
        let body = TitanEmbeddingRequest {
            input_text: text,
            dimensions: self.dimensions,
            normalize: true,
        };
        let value = self.inner.post(url, &body).await.map_err(map_err)?;

        let parsed: TitanEmbeddingResponse = serde_json::from_value(value)
            .map_err(|e| map_err(format!("unexpected response shape: {e}")))?;
        Ok(parsed.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`ChatModel`] backed by the Bedrock `converse` API.
pub struct BedrockChatModel {
    inner: BedrockClient,
    model: String,
    options: ChatOptions,
}

impl BedrockChatModel {
    /// Create a chat model for `model` (e.g. `anthropic.claude-3-haiku-20240307-v1:0`).
    pub fn new(
        api_key: impl Into<String>,
        region: Option<&str>,
        model: impl Into<String>,
        options: ChatOptions,
    ) -> Result<Self> {
        let inner = BedrockClient::new(api_key.into(), region, |message| RagError::ModelError {
            provider: PROVIDER.into(),
            message,
        })?;
        Ok(Self { inner, model: model.into(), options })
    }
}

/// Concatenate the text blocks of a converse response.
fn converse_text(response: &Value) -> Option<String> {
    let content = response.pointer("/output/message/content")?.as_array()?;
    Some(content.iter().filter_map(|block| block.get("text").and_then(Value::as_str)).collect())
}

#[async_trait]
impl ChatModel for BedrockChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = prompt.len(),
            "invoking chat model"
        );

        let map_err = |message: String| {
            error!(provider = PROVIDER, %message, "converse request failed");
            RagError::ModelError { provider: PROVIDER.into(), message }
        };

        let url = self.inner.model_url(&self.model, "converse").map_err(map_err)?;
        let body = json!({
            "messages": [{"role": "user", "content": [{"text": prompt}]}],
            "inferenceConfig": {
                "maxTokens": self.options.max_tokens,
                "temperature": self.options.temperature,
            },
        });
        let value = self.inner.post(url, &body).await.map_err(map_err)?;

        let content =
            converse_text(&value).ok_or_else(|| map_err("no content in converse response".into()))?;
        Ok(ChatResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_url_escapes_model_id() {
        let client =
            BedrockClient::new("key".into(), Some("eu-west-1"), |m| RagError::Tool(m)).unwrap();
        let url = client.model_url("amazon.titan-embed-text-v2:0", "invoke").unwrap();
        assert_eq!(url.host_str(), Some("bedrock-runtime.eu-west-1.amazonaws.com"));
        assert!(url.path().starts_with("/model/amazon.titan-embed-text-v2"));
        assert!(url.path().ends_with("/invoke"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = BedrockEmbeddingFunction::new("", None, "amazon.titan-embed-text-v2:0")
            .err()
            .unwrap();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
    }

    #[test]
    fn converse_text_joins_blocks() {
        let response = json!({
            "output": {"message": {"content": [{"text": "Hello"}, {"text": " world"}]}}
        });
        assert_eq!(converse_text(&response).as_deref(), Some("Hello world"));
        assert_eq!(converse_text(&json!({})), None);
    }
}
