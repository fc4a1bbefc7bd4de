//! Text indexing strategies.
//!
//! This module provides the [`TextIndexingStrategy`] trait and two implementations:
//!
//! - [`BaseTextIndexing`] splits text recursively on paragraph, line, word and
//!   character boundaries and tags every chunk with the document metadata
//! - [`ContextAwareIndexing`] wraps the base splitter and prefixes every chunk
//!   with a model-generated summary of the document

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::chat::{ChatModel, ChatOptions};
use crate::config::IndexingConfig;
use crate::document::{Chunk, IndexInput};
use crate::error::{RagError, Result};
use crate::metadata::{DocumentMetadata, PAYLOAD};
use crate::settings::Settings;

/// Separators tried in order, from coarsest to finest.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Default instruction prepended to the document text when summarizing.
pub const DEFAULT_SUMMARIZE_PROMPT: &str = "You are tasked with summarizing a document into 3 sentences max.
The summary should be concise and contain the main points of the document.
This is the document: ";

/// A strategy that turns text (or pre-built chunks) plus document metadata
/// into metadata-tagged chunks ready for storage.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::{BaseTextIndexing, TextIndexingStrategy};
///
/// let strategy = BaseTextIndexing::new(200, 20)?;
/// let chunks = strategy.split("some long text".into(), &metadata).await?;
/// ```
#[async_trait]
pub trait TextIndexingStrategy: Send + Sync {
    /// Split `input` into chunks carrying `metadata`.
    ///
    /// Chunks are returned in input order.
    async fn split(&self, input: IndexInput, metadata: &DocumentMetadata) -> Result<Vec<Chunk>>;
}

/// Merge a pre-chunk's own metadata into the document metadata.
///
/// The result is `metadata` with its `payload` replaced by the pre-chunk
/// metadata overlaid with the original payload, which wins on collisions.
pub fn merge_metadata(
    pre_chunk_metadata: &Map<String, Value>,
    metadata: &Map<String, Value>,
) -> Map<String, Value> {
    let mut payload = pre_chunk_metadata.clone();
    if let Some(Value::Object(own)) = metadata.get(PAYLOAD) {
        payload.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let mut merged = metadata.clone();
    merged.insert(PAYLOAD.to_string(), Value::Object(payload));
    merged
}

/// Recursive, boundary-aware text splitter.
///
/// The first separator of `"\n\n"`, `"\n"`, `" "` that occurs in the text is
/// used to cut it into pieces, each piece keeping its leading separator.
/// Pieces shorter than `chunk_size` are merged greedily into chunks of at most
/// `chunk_size` characters, carrying up to `chunk_overlap` characters of
/// trailing pieces into the next chunk. Longer pieces are split again with
/// the remaining separators, down to single characters. Chunks are trimmed and
/// empty chunks are dropped.
#[derive(Debug, Clone, Default)]
pub struct BaseTextIndexing {
    config: IndexingConfig,
}

impl BaseTextIndexing {
    /// Create a splitter with the given sizes.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size` is zero or
    /// not greater than `chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config =
            IndexingConfig::builder().chunk_size(chunk_size).chunk_overlap(chunk_overlap).build()?;
        Ok(Self { config })
    }

    /// Create a splitter from a validated config.
    pub fn from_config(config: IndexingConfig) -> Self {
        Self { config }
    }

    /// The chunking parameters.
    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    /// Split raw text into chunk contents.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                short_pieces.push(piece);
                continue;
            }

            if !short_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&short_pieces));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&short_pieces));
        }
        chunks
    }

    /// Greedily join pieces into chunks of at most `chunk_size` characters.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let IndexingConfig { chunk_size, chunk_overlap } = self.config;

        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` before every occurrence of `separator`, so each piece after
/// the first starts with the separator. An empty separator yields single
/// characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[async_trait]
impl TextIndexingStrategy for BaseTextIndexing {
    async fn split(&self, input: IndexInput, metadata: &DocumentMetadata) -> Result<Vec<Chunk>> {
        let metadata_dict = metadata.to_dict();

        let chunks: Vec<Chunk> = input
            .into_chunks()
            .into_iter()
            .flat_map(|pre_chunk| {
                let merged = merge_metadata(&pre_chunk.metadata, &metadata_dict);
                self.split_text(&pre_chunk.content)
                    .into_iter()
                    .map(move |content| Chunk { content, metadata: merged.clone() })
            })
            .collect();

        debug!(
            source_id = metadata.source_id(),
            chunk_count = chunks.len(),
            chunk_size = self.config.chunk_size,
            "split document"
        );
        Ok(chunks)
    }
}

/// Prefix a chunk's content with the document summary.
fn add_context(chunk: &mut Chunk, summary: &str) {
    chunk.content = format!("Context: {summary}\n\nContent: {}", chunk.content);
}

/// An indexing strategy that summarizes the document and prepends the
/// summary to every chunk, so each chunk carries document-level context.
///
/// The summary is computed from the first `document_content_cutoff`
/// characters of the concatenated chunk contents, with one model call per
/// [`split`](TextIndexingStrategy::split).
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::ContextAwareIndexing;
///
/// let strategy = ContextAwareIndexing::builder()
///     .chat_model(model)
///     .document_content_cutoff(2_000)
///     .build()?;
/// ```
pub struct ContextAwareIndexing {
    base: BaseTextIndexing,
    chat_model: Arc<dyn ChatModel>,
    summarize_prompt: String,
    max_summary_tokens: u32,
    document_content_cutoff: usize,
}

impl std::fmt::Debug for ContextAwareIndexing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAwareIndexing")
            .field("base", &self.base)
            .field("max_summary_tokens", &self.max_summary_tokens)
            .field("document_content_cutoff", &self.document_content_cutoff)
            .finish_non_exhaustive()
    }
}

impl ContextAwareIndexing {
    /// Create a new [`ContextAwareIndexingBuilder`].
    pub fn builder() -> ContextAwareIndexingBuilder {
        ContextAwareIndexingBuilder::default()
    }

    /// The instruction prepended to the document text.
    pub fn summarize_prompt(&self) -> &str {
        &self.summarize_prompt
    }

    /// Token limit for the summary.
    pub fn max_summary_tokens(&self) -> u32 {
        self.max_summary_tokens
    }

    /// Number of characters of document text sent to the model.
    pub fn document_content_cutoff(&self) -> usize {
        self.document_content_cutoff
    }

    /// Concatenate chunk contents until the cutoff is reached, then truncate
    /// to exactly the cutoff.
    fn summary_input(&self, chunks: &[Chunk]) -> String {
        let mut content = String::new();
        let mut len = 0;
        for chunk in chunks {
            if len >= self.document_content_cutoff {
                break;
            }
            content.push_str(&chunk.content);
            len += char_len(&chunk.content);
        }
        content.chars().take(self.document_content_cutoff).collect()
    }
}

#[async_trait]
impl TextIndexingStrategy for ContextAwareIndexing {
    async fn split(&self, input: IndexInput, metadata: &DocumentMetadata) -> Result<Vec<Chunk>> {
        let mut chunks = self.base.split(input, metadata).await?;
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let document = self.summary_input(&chunks);
        let prompt = format!("{}{document}", self.summarize_prompt);
        let response = self.chat_model.invoke(&prompt).await.map_err(|e| {
            error!(source_id = metadata.source_id(), error = %e, "document summarization failed");
            e
        })?;

        let summary = response.content.trim();
        if summary.is_empty() {
            error!(source_id = metadata.source_id(), "chat model returned an empty summary");
            return Err(RagError::ModelError {
                provider: "summarizer".into(),
                message: format!("empty summary for document '{}'", metadata.source_id()),
            });
        }

        for chunk in &mut chunks {
            add_context(chunk, &response.content);
        }

        debug!(
            source_id = metadata.source_id(),
            chunk_count = chunks.len(),
            summary_len = response.content.len(),
            "added document context to chunks"
        );
        Ok(chunks)
    }
}

/// Builder for [`ContextAwareIndexing`].
#[derive(Default)]
pub struct ContextAwareIndexingBuilder {
    config: IndexingConfig,
    chat_model: Option<Arc<dyn ChatModel>>,
    settings: Option<Settings>,
    summarize_prompt: Option<String>,
    max_summary_tokens: Option<u32>,
    document_content_cutoff: Option<usize>,
}

impl ContextAwareIndexingBuilder {
    /// Set the chunking parameters of the underlying splitter.
    pub fn config(mut self, config: IndexingConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this chat model for summaries.
    pub fn chat_model(mut self, chat_model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(chat_model);
        self
    }

    /// Settings used to build a chat model when none is injected.
    ///
    /// Defaults to [`Settings::from_env`].
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Replace the summarization instruction.
    pub fn summarize_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.summarize_prompt = Some(prompt.into());
        self
    }

    /// Set the token limit for summaries built by the provider factory.
    pub fn max_summary_tokens(mut self, tokens: u32) -> Self {
        self.max_summary_tokens = Some(tokens);
        self
    }

    /// Set how many characters of document text are summarized.
    pub fn document_content_cutoff(mut self, cutoff: usize) -> Self {
        self.document_content_cutoff = Some(cutoff);
        self
    }

    /// Build the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the cutoff is zero, or
    /// if no chat model was injected and none can be built from settings.
    pub fn build(self) -> Result<ContextAwareIndexing> {
        let max_summary_tokens = self.max_summary_tokens.unwrap_or(500);
        let document_content_cutoff = self.document_content_cutoff.unwrap_or(5_000);
        if document_content_cutoff == 0 {
            return Err(RagError::InvalidConfiguration(
                "document_content_cutoff must be greater than zero".into(),
            ));
        }

        let chat_model = match self.chat_model {
            Some(model) => model,
            None => {
                let settings = match self.settings {
                    Some(settings) => settings,
                    None => Settings::from_env()?,
                };
                crate::provider::chat_model(
                    settings.require_chat_model()?,
                    &settings.providers,
                    ChatOptions { temperature: 0.0, max_tokens: max_summary_tokens },
                )?
            }
        };

        Ok(ContextAwareIndexing {
            base: BaseTextIndexing::from_config(self.config),
            chat_model,
            summarize_prompt: self
                .summarize_prompt
                .unwrap_or_else(|| DEFAULT_SUMMARIZE_PROMPT.to_string()),
            max_summary_tokens,
            document_content_cutoff,
        })
    }
}
