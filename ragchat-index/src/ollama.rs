//! Ollama embedding function and chat model.
//!
//! Talks to a local Ollama server through `/api/embed` and `/api/generate`.
//! This module is only available when the `ollama` feature is enabled.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chat::{ChatModel, ChatOptions, ChatResponse};
use crate::embedding::EmbeddingFunction;
use crate::error::{RagError, Result};

/// Address of the model server in the default deployment.
pub const DEFAULT_BASE_URL: &str = "http://local_model:11434";

const PROVIDER: &str = "Ollama";

/// Known output sizes of common Ollama embedding models.
fn known_dimensions(model: &str) -> Option<usize> {
    match model.to_ascii_lowercase().as_str() {
        "mxbai-embed-large" | "bge-m3" | "bge-large" | "snowflake-arctic-embed"
        | "snowflake-arctic-embed2" => Some(1024),
        "nomic-embed-text" | "paraphrase-multilingual" | "granite-embedding:278m" => Some(768),
        "all-minilm" | "granite-embedding" => Some(384),
        _ => None,
    }
}

fn base_url(address: Option<&str>) -> String {
    address.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string()
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// An [`EmbeddingFunction`] backed by an Ollama server.
///
/// The dimensionality is looked up for well-known models and otherwise
/// learned from the first response.
pub struct OllamaEmbeddingFunction {
    client: reqwest::Client,
    embed_url: String,
    model: String,
    dimensions: AtomicUsize,
}

impl OllamaEmbeddingFunction {
    /// Create an embedding function for `model`, using `address` or [`DEFAULT_BASE_URL`].
    pub fn new(model: impl Into<String>, address: Option<&str>) -> Self {
        let model = model.into();
        let dimensions = known_dimensions(&model).unwrap_or(0);
        Self {
            client: reqwest::Client::new(),
            embed_url: format!("{}/api/embed", base_url(address)),
            model,
            dimensions: AtomicUsize::new(dimensions),
        }
    }
}

#[async_trait]
impl EmbeddingFunction for OllamaEmbeddingFunction {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "server returned empty response".into(),
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

        let map_err =
            |message: String| RagError::EmbeddingError { provider: PROVIDER.into(), message };
        let request = EmbedRequest { model: &self.model, input: texts.to_vec() };

        let response =
            self.client.post(&self.embed_url).json(&request).send().await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                map_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            return Err(map_err(format!("API returned {status}: {body}")));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            map_err(format!("failed to parse response: {e}"))
        })?;

        if let Some(first) = parsed.embeddings.first() {
            self.dimensions.store(first.len(), Ordering::Relaxed);
        }
        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions.load(Ordering::Relaxed)
    }
}

/// A [`ChatModel`] backed by Ollama's non-streaming generate endpoint.
pub struct OllamaChatModel {
    client: reqwest::Client,
    generate_url: String,
    model: String,
    options: ChatOptions,
}

impl OllamaChatModel {
    /// Create a chat model for `model`, using `address` or [`DEFAULT_BASE_URL`].
    pub fn new(model: impl Into<String>, address: Option<&str>, options: ChatOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            generate_url: format!("{}/api/generate", base_url(address)),
            model: model.into(),
            options,
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = prompt.len(),
            "invoking chat model"
        );

        let map_err = |message: String| RagError::ModelError { provider: PROVIDER.into(), message };
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        };

        let response =
            self.client.post(&self.generate_url).json(&request).send().await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                map_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            return Err(map_err(format!("API returned {status}: {body}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            map_err(format!("failed to parse response: {e}"))
        })?;

        Ok(ChatResponse { content: parsed.response })
    }
}
