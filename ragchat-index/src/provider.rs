//! Typed model selection and the factories that build embedding functions
//! and chat models from it.
//!
//! Models are named as `"<provider>:<model_id>"`, for example
//! `bedrock:amazon.titan-embed-text-v2:0` or `ollama:nomic-embed-text`.
//! Only the first `:` separates the provider, so model ids may contain colons.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chat::{ChatModel, ChatOptions};
use crate::embedding::EmbeddingFunction;
use crate::error::{RagError, Result};

/// A supported model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI hosted API.
    OpenAi,
    /// A self-hosted Ollama server.
    Ollama,
    /// Amazon Bedrock.
    Bedrock,
}

impl ModelProvider {
    /// The provider's name as used in model specs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Ollama => "ollama",
            ModelProvider::Bedrock => "bedrock",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProvider::OpenAi),
            "ollama" => Ok(ModelProvider::Ollama),
            "bedrock" => Ok(ModelProvider::Bedrock),
            other => {
                Err(RagError::InvalidConfiguration(format!("unknown model provider '{other}'")))
            }
        }
    }
}

/// A provider together with the provider-specific model id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Which backend serves the model.
    pub provider: ModelProvider,
    /// The model id understood by that backend.
    pub model_id: String,
}

impl ModelSpec {
    /// Create a model spec.
    pub fn new(provider: ModelProvider, model_id: impl Into<String>) -> Self {
        Self { provider, model_id: model_id.into() }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model_id)
    }
}

impl FromStr for ModelSpec {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        let (provider, model_id) = s.split_once(':').ok_or_else(|| {
            RagError::InvalidConfiguration(format!(
                "model '{s}' must have the form '<provider>:<model_id>'"
            ))
        })?;
        let provider = provider.parse()?;
        if model_id.trim().is_empty() {
            return Err(RagError::InvalidConfiguration(format!(
                "model '{s}' has an empty model id"
            )));
        }
        Ok(Self { provider, model_id: model_id.trim().to_string() })
    }
}

/// Credentials and endpoints for every provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: Option<String>,
    /// Ollama server address (`OLLAMA_BASE_URL`).
    pub ollama_base_url: Option<String>,
    /// Bedrock API key (`BEDROCK_API_KEY`).
    pub bedrock_api_key: Option<String>,
    /// AWS region for Bedrock (`AWS_REGION`).
    pub aws_region: Option<String>,
}

#[cfg(any(feature = "openai", feature = "bedrock"))]
fn require<'a>(value: &'a Option<String>, key: &str, provider: ModelProvider) -> Result<&'a str> {
    value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
        RagError::InvalidConfiguration(format!("{key} must be set to use {provider} models"))
    })
}

fn feature_disabled(provider: ModelProvider) -> RagError {
    RagError::InvalidConfiguration(format!(
        "{provider} models require the `{provider}` feature of ragchat-index"
    ))
}

/// Build the embedding function named by `spec`.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] if the provider's credentials
/// are missing or its cargo feature is disabled.
pub fn embedding_function(
    spec: &ModelSpec,
    providers: &ProviderSettings,
) -> Result<Arc<dyn EmbeddingFunction>> {
    tracing::debug!(model = %spec, "building embedding function");
    match spec.provider {
        #[cfg(feature = "openai")]
        ModelProvider::OpenAi => {
            let key = require(&providers.openai_api_key, "OPENAI_API_KEY", spec.provider)?;
            let embedding =
                crate::openai::OpenAIEmbeddingFunction::new(key)?.with_model(&spec.model_id);
            Ok(Arc::new(embedding))
        }
        #[cfg(feature = "ollama")]
        ModelProvider::Ollama => Ok(Arc::new(crate::ollama::OllamaEmbeddingFunction::new(
            &spec.model_id,
            providers.ollama_base_url.as_deref(),
        ))),
        #[cfg(feature = "bedrock")]
        ModelProvider::Bedrock => {
            let key = require(&providers.bedrock_api_key, "BEDROCK_API_KEY", spec.provider)?;
            Ok(Arc::new(crate::bedrock::BedrockEmbeddingFunction::new(
                key,
                providers.aws_region.as_deref(),
                &spec.model_id,
            )?))
        }
        #[allow(unreachable_patterns)]
        other => Err(feature_disabled(other)),
    }
}

/// Build the chat model named by `spec` with the given sampling options.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] if the provider's credentials
/// are missing or its cargo feature is disabled.
pub fn chat_model(
    spec: &ModelSpec,
    providers: &ProviderSettings,
    options: ChatOptions,
) -> Result<Arc<dyn ChatModel>> {
    tracing::debug!(model = %spec, max_tokens = options.max_tokens, "building chat model");
    match spec.provider {
        #[cfg(feature = "openai")]
        ModelProvider::OpenAi => {
            let key = require(&providers.openai_api_key, "OPENAI_API_KEY", spec.provider)?;
            Ok(Arc::new(crate::openai::OpenAIChatModel::new(key, &spec.model_id, options)?))
        }
        #[cfg(feature = "ollama")]
        ModelProvider::Ollama => Ok(Arc::new(crate::ollama::OllamaChatModel::new(
            &spec.model_id,
            providers.ollama_base_url.as_deref(),
            options,
        ))),
        #[cfg(feature = "bedrock")]
        ModelProvider::Bedrock => {
            let key = require(&providers.bedrock_api_key, "BEDROCK_API_KEY", spec.provider)?;
            Ok(Arc::new(crate::bedrock::BedrockChatModel::new(
                key,
                providers.aws_region.as_deref(),
                &spec.model_id,
                options,
            )?))
        }
        #[allow(unreachable_patterns)]
        other => Err(feature_disabled(other)),
    }
}
