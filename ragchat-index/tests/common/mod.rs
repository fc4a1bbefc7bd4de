//! Deterministic test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use ragchat_index::{ChatModel, ChatResponse, DocumentMetadata, EmbeddingFunction, RagError, Result};

pub const DIM: usize = 64;

pub const SIMPLE_TEXT: &str = "This is a simple text to test the vector database.";

pub const THREE_PARAGRAPHS: &str = concat!(
    "\n            This is a longer text to test the vector database. It has multiple lines. Each ",
    "line\n            contains different text about a different subject.\n\n            For example, ",
    "here we talk about the weather. It is sunny today. The temperature is\n            25 degrees ",
    "Celsius. The sky is clear.\n\n            Last Paragraph. The quick brown fox jumps over the ",
    "lazy dog. The end.\n            "
);

pub const LOREM: &str = concat!(
    "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Curabitur finibus ultricies augue, ",
    "a lobortis elit lobortis nec. Donec sodales mauris a ultrices vehicula. Phasellus eget arcu ",
    "leo. Morbi a arcu maximus, ultricies ipsum condimentum, vulputate tortor. Sed vel nibh ac ",
    "quam tincidunt vehicula. Quisque semper leo eget  lacus pellentesque eleifend. Quisque vel ",
    "purus sodales, efficitur lectus ac, ornare risus. Quisque ante elit, blandit sit amet tortor ",
    "ut, tincidunt ornare dolor. Donec vel imperdiet magna. Mauris porta porta sagittis. Nam lacus ",
    "nisl, sagittis mollis scelerisque vitae, scelerisque eu nisi. Vivamus arcu dolor, sollicitudin ",
    "a pretium non, convallis at massa. Sed eu dui elementum, maximus ex lobortis, feugiat odio. ",
    "Nulla finibus pretium ipsum, a finibus ex ultrices at. \n\n The quick brown fox jumps over the ",
    "lazy dog. Then the lazy dog barks at the fox. Said the fox to the dog: \"Why are you barking ",
    "at me? I am just passing by.\""
);

/// Metadata with a fixed timestamp.
pub fn metadata(source_id: &str, source_name: &str) -> DocumentMetadata {
    let modified_at = NaiveDate::from_ymd_opt(2021, 10, 20)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .unwrap();
    DocumentMetadata::builder()
        .source_id(source_id)
        .source_name(source_name)
        .modified_at(modified_at)
        .payload_entry("k1", "v1")
        .build()
        .unwrap()
}

/// Bag-of-words embedding: each lowercase word is hashed (FNV-1a) into one of
/// `DIM` buckets. Identical texts get identical vectors.
#[derive(Debug, Default)]
pub struct HashEmbedding;

impl HashEmbedding {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingFunction for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Counts calls and records batch sizes.
#[derive(Debug, Default)]
pub struct RecordingEmbedding {
    pub embed_calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl RecordingEmbedding {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingFunction for RecordingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(HashEmbedding::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_sizes.lock().unwrap().push(texts.len());
        Ok(texts.iter().map(|t| HashEmbedding::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Returns one fewer embedding than asked for.
#[derive(Debug, Default)]
pub struct ShortEmbedding;

#[async_trait]
impl EmbeddingFunction for ShortEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(HashEmbedding::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|t| HashEmbedding::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Chat model that answers every prompt with a fixed reply and records prompts.
#[derive(Debug)]
pub struct MockChatModel {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockChatModel {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    /// A model whose every call fails.
    pub fn failing() -> Self {
        Self { reply: None, prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ChatResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(ChatResponse::new(reply.clone())),
            None => Err(RagError::ModelError {
                provider: "mock".into(),
                message: "model unavailable".into(),
            }),
        }
    }
}

pub mod conformance;
