//! Data types for chunks, indexing input, and vector database results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A contiguous piece of a source document together with its metadata.
///
/// Chunks are produced by a [`TextIndexingStrategy`](crate::TextIndexingStrategy)
/// and consumed read-only by a [`VectorDatabase`](crate::VectorDatabase), which
/// computes the embedding and assigns the row id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub content: String,
    /// Flat metadata, normally [`DocumentMetadata::to_dict`](crate::DocumentMetadata::to_dict).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Create a chunk with empty metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: Map::new() }
    }

    /// Attach metadata to the chunk.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// The `source_id` recorded in this chunk's metadata, if any.
    pub fn source_id(&self) -> Option<&str> {
        self.metadata.get(crate::metadata::SOURCE_ID).and_then(Value::as_str)
    }
}

/// Input accepted by an indexing strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexInput {
    /// Raw text, treated as a single pre-chunk without metadata.
    Text(String),
    /// Pre-built chunks whose metadata is merged into the payload.
    Chunks(Vec<Chunk>),
}

impl IndexInput {
    /// Normalize the input into a list of pre-chunks.
    pub fn into_chunks(self) -> Vec<Chunk> {
        match self {
            IndexInput::Text(text) => vec![Chunk::new(text)],
            IndexInput::Chunks(chunks) => chunks,
        }
    }
}

impl From<String> for IndexInput {
    fn from(text: String) -> Self {
        IndexInput::Text(text)
    }
}

impl From<&str> for IndexInput {
    fn from(text: &str) -> Self {
        IndexInput::Text(text.to_string())
    }
}

impl From<Vec<Chunk>> for IndexInput {
    fn from(chunks: Vec<Chunk>) -> Self {
        IndexInput::Chunks(chunks)
    }
}

/// A stored [`Chunk`] returned from similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Backend-assigned row id.
    pub id: String,
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine distance to the query (0 = identical, larger = less similar).
    pub score: f32,
}

/// Every row of a collection, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AllDocuments {
    /// Row ids.
    pub ids: Vec<String>,
    /// Row metadata, parallel to `ids`.
    pub metadatas: Vec<Map<String, Value>>,
    /// Row contents, parallel to `ids`.
    pub texts: Vec<String>,
}

impl AllDocuments {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the collection holds no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Statistics reported by a delete-by-`source_id` call.
///
/// Fields a backend cannot report stay at zero or empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeletionResult {
    /// Rows inserted by the call.
    pub insert_count: u64,
    /// Rows deleted by the call.
    pub delete_count: u64,
    /// Rows upserted by the call.
    pub upsert_count: u64,
    /// Backend commit time, in seconds since the Unix epoch.
    pub timestamp: f64,
    /// Rows successfully processed.
    pub success_count: u64,
    /// Rows that failed.
    pub error_count: u64,
    /// Positions of the rows that failed.
    pub error_index: Vec<u64>,
}

impl DeletionResult {
    /// A result reporting `deleted` removed rows and no failures.
    pub fn deleted(deleted: u64) -> Self {
        Self { delete_count: deleted, success_count: deleted, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_input_becomes_single_pre_chunk() {
        let chunks = IndexInput::from("hello").into_chunks();
        assert_eq!(chunks, vec![Chunk::new("hello")]);
        assert!(chunks[0].metadata.is_empty());
    }

    #[test]
    fn chunk_source_id_reads_metadata() {
        let chunk = Chunk::new("x")
            .with_metadata(json!({"source_id": "abc"}).as_object().unwrap().clone());
        assert_eq!(chunk.source_id(), Some("abc"));
        assert_eq!(Chunk::new("y").source_id(), None);
    }

    #[test]
    fn deletion_result_defaults_to_zero() {
        let result = DeletionResult::default();
        assert_eq!(result.delete_count, 0);
        assert_eq!(result.timestamp, 0.0);
        assert!(result.error_index.is_empty());

        let result = DeletionResult::deleted(3);
        assert_eq!(result.delete_count, 3);
        assert_eq!(result.success_count, 3);
        assert_eq!(result.error_count, 0);
    }
}
