//! Chat model trait used for document summarization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The text returned by a [`ChatModel`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
}

impl ChatResponse {
    /// Wrap generated text.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

/// Sampling options applied when a chat model is built by the provider factory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self { temperature: 0.0, max_tokens: 500 }
    }
}

/// A language model that answers a single prompt.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::ChatModel;
///
/// let response = model.invoke("Summarize this: ...").await?;
/// println!("{}", response.content);
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `prompt` as a single user message and return the reply.
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse>;
}
