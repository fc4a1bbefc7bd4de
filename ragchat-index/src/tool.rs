//! Retrieval tool for chat agents.
//!
//! [`RetrieverTool`] exposes a [`VectorDatabase`] as a document-retrieval
//! capability. The agent calls it with `{"query": "...", "k": 4}` and gets
//! back the closest chunks with the fields needed for citations.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragchat_index::{RetrieverTool, Tool};
//!
//! let tool = RetrieverTool::new(Arc::new(db));
//! let hits = tool.execute(serde_json::json!({ "query": "How do I configure X?" })).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::metadata::{MODIFIED_AT, SOURCE_ID, SOURCE_NAME};
use crate::vectordb::VectorDatabase;

/// Number of chunks returned when the caller does not pass `k`.
pub const DEFAULT_K: usize = 8;

/// A capability an agent can call with JSON arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the agent uses to call the tool.
    fn name(&self) -> &str;

    /// What the tool does, shown to the model when it picks a tool.
    fn description(&self) -> &str;

    /// JSON schema of the arguments, if the tool takes any.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    /// Run the tool with the arguments the agent supplied.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Tool`] when the arguments do not match the schema.
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// One retrieved chunk as handed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Human-readable name of the source document.
    pub source_name: String,
    /// Identifier of the source document.
    pub source_id: String,
    /// Last modification time of the source, as stored in `modified_at`.
    pub modified: String,
    /// Chunk text.
    pub content: String,
}

impl From<SearchResult> for RetrievedDocument {
    fn from(result: SearchResult) -> Self {
        let field = |key: &str| {
            result.chunk.metadata.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
        };
        Self {
            source_name: field(SOURCE_NAME),
            source_id: field(SOURCE_ID),
            modified: field(MODIFIED_AT),
            content: result.chunk.content.clone(),
        }
    }
}

/// Render documents as the model sees them: one JSON object per line.
pub fn render_documents(documents: &[RetrievedDocument]) -> Result<String> {
    let lines = documents
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

/// Top-k similarity retrieval over a [`VectorDatabase`].
pub struct RetrieverTool {
    database: Arc<dyn VectorDatabase>,
    default_k: usize,
}

impl RetrieverTool {
    /// Retrieve from `database`, returning [`DEFAULT_K`] chunks unless asked otherwise.
    pub fn new(database: Arc<dyn VectorDatabase>) -> Self {
        Self { database, default_k: DEFAULT_K }
    }

    /// Override the number of chunks returned when `k` is not passed.
    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    /// Number of chunks returned when `k` is not passed.
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Retrieve the `k` chunks closest to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        let results = self.database.similarity_search_with_score(query, k).await.map_err(|e| {
            error!(collection = self.database.collection_name(), error = %e, "retrieval failed");
            e
        })?;
        Ok(results.into_iter().map(RetrievedDocument::from).collect())
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        "retrieve_documents"
    }

    fn description(&self) -> &str {
        "Search the document store for passages relevant to a query"
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find relevant documents"
                },
                "k": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of passages to return"
                }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| RagError::Tool("missing required 'query' parameter".into()))?;
        let k = match args.get("k") {
            None | Some(Value::Null) => self.default_k,
            Some(value) => value
                .as_u64()
                .filter(|k| *k > 0)
                .map(|k| k as usize)
                .ok_or_else(|| {
                    RagError::Tool(format!("'k' must be a positive integer, got {value}"))
                })?,
        };

        info!(collection = self.database.collection_name(), query, k, "retrieve_documents called");
        let documents = self.retrieve(query, k).await?;
        Ok(serde_json::to_value(documents)?)
    }
}
