//! The vector database abstraction shared by every storage backend.
//!
//! A [`VectorDatabase`] owns one collection of chunk rows. Text goes in through
//! [`split_and_store_text`](VectorDatabase::split_and_store_text), which runs
//! the configured [`TextIndexingStrategy`], embeds every chunk with a single
//! batched call and persists the batch with a single backend request. Rows
//! are removed as a unit by their `source_id`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::document::{AllDocuments, Chunk, DeletionResult, IndexInput, SearchResult};
use crate::embedding::EmbeddingFunction;
use crate::error::{RagError, Result};
use crate::indexing::{BaseTextIndexing, TextIndexingStrategy};
use crate::metadata::DocumentMetadata;
use crate::settings::Settings;

/// Lifecycle of the collection an adapter is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionState {
    /// Connected, the collection has not been touched yet.
    #[default]
    Unbound,
    /// The collection exists and is ready for inserts.
    Bound,
    /// The collection was dropped; the next insert re-creates it.
    Dropped,
}

/// A storage backend for embedded chunks with similarity search.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::{InMemoryVectorDatabase, VectorDatabase};
///
/// let db = InMemoryVectorDatabase::builder().embedding_function(embedder).build()?;
/// let ids = db.split_and_store_text("some text".into(), &metadata).await?;
/// let deleted = db.delete_embeddings(metadata.source_id()).await?;
/// ```
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Name of the collection this adapter reads and writes.
    fn collection_name(&self) -> &str;

    /// The strategy used by [`split_and_store_text`](Self::split_and_store_text).
    fn split_strategy(&self) -> Arc<dyn TextIndexingStrategy>;

    /// The function used to embed chunks and queries.
    fn embedding_function(&self) -> Arc<dyn EmbeddingFunction>;

    /// Embed and persist `chunks`, creating the collection if needed.
    ///
    /// Returns the backend-assigned row ids in chunk order.
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>>;

    /// Split `input` with the configured strategy and store the chunks.
    ///
    /// Returns the backend-assigned row ids in chunk order.
    async fn split_and_store_text(
        &self,
        input: IndexInput,
        metadata: &DocumentMetadata,
    ) -> Result<Vec<String>> {
        let chunks = self.split_strategy().split(input, metadata).await?;
        let chunk_count = chunks.len();
        let ids = self.add_chunks(chunks).await?;

        info!(
            collection = self.collection_name(),
            source_id = metadata.source_id(),
            chunk_count,
            "stored document"
        );
        Ok(ids)
    }

    /// Delete every row whose metadata `source_id` equals `source_id`.
    ///
    /// Deleting a source with no rows reports `delete_count == 0`.
    async fn delete_embeddings(&self, source_id: &str) -> Result<DeletionResult>;

    /// Drop a collection and all its rows.
    ///
    /// A missing collection is a no-op when `ignore_non_exist` is set and a
    /// [`RagError::CollectionNotFound`] otherwise.
    async fn drop_collection(&self, collection_name: &str, ignore_non_exist: bool) -> Result<()>;

    /// Return the `k` rows closest to `query`, nearest first.
    ///
    /// Scores are cosine distances.
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Return every row of the collection in insertion order.
    async fn get_all_documents(&self) -> Result<AllDocuments>;
}

/// Construction options shared by every adapter builder.
///
/// Values left unset are filled from [`Settings`]: the collection name from
/// `DEFAULT_VECTOR_DB_COLLECTION_NAME` and the embedding function from
/// `EMBEDDING_MODEL`. The split strategy defaults to [`BaseTextIndexing`].
#[derive(Clone, Default)]
pub struct DatabaseOptions {
    /// Collection to bind.
    pub collection_name: Option<String>,
    /// Strategy used to split incoming text.
    pub split_strategy: Option<Arc<dyn TextIndexingStrategy>>,
    /// Function used to embed chunks and queries.
    pub embedding_function: Option<Arc<dyn EmbeddingFunction>>,
    /// Settings to resolve missing values from; read from the environment if unset.
    pub settings: Option<Settings>,
}

impl std::fmt::Debug for DatabaseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseOptions")
            .field("collection_name", &self.collection_name)
            .field("split_strategy", &self.split_strategy.is_some())
            .field("embedding_function", &self.embedding_function.is_some())
            .finish()
    }
}

/// [`DatabaseOptions`] with every default applied.
#[derive(Clone)]
pub(crate) struct ResolvedOptions {
    pub(crate) collection_name: String,
    pub(crate) split_strategy: Arc<dyn TextIndexingStrategy>,
    pub(crate) embedding_function: Arc<dyn EmbeddingFunction>,
}

impl DatabaseOptions {
    /// Resolve defaults. `settings` is consulted only for values the caller left unset.
    pub(crate) fn resolve(self) -> Result<(ResolvedOptions, Option<Settings>)> {
        let mut settings = self.settings;
        let needs_settings = self.collection_name.is_none() || self.embedding_function.is_none();
        if needs_settings && settings.is_none() {
            settings = Some(Settings::from_env()?);
        }

        let collection_name = match (self.collection_name, &settings) {
            (Some(name), _) => name,
            (None, Some(settings)) => settings.collection_name.clone(),
            (None, None) => crate::settings::DEFAULT_COLLECTION_NAME.to_string(),
        };
        if collection_name.trim().is_empty() {
            return Err(RagError::InvalidConfiguration("collection name must not be empty".into()));
        }

        let embedding_function = match (self.embedding_function, &settings) {
            (Some(function), _) => function,
            (None, Some(settings)) => {
                crate::provider::embedding_function(&settings.embedding_model, &settings.providers)?
            }
            (None, None) => {
                return Err(RagError::InvalidConfiguration(
                    "no embedding function configured".into(),
                ));
            }
        };

        let split_strategy = self.split_strategy.unwrap_or_else(|| {
            Arc::new(BaseTextIndexing::default()) as Arc<dyn TextIndexingStrategy>
        });

        Ok((ResolvedOptions { collection_name, split_strategy, embedding_function }, settings))
    }
}

/// Generates the option setters shared by adapter builders.
macro_rules! database_option_setters {
    () => {
        /// Bind this collection instead of the configured default.
        pub fn collection_name(mut self, name: impl Into<String>) -> Self {
            self.options.collection_name = Some(name.into());
            self
        }

        /// Split incoming text with this strategy.
        pub fn split_strategy(
            mut self,
            strategy: std::sync::Arc<dyn $crate::indexing::TextIndexingStrategy>,
        ) -> Self {
            self.options.split_strategy = Some(strategy);
            self
        }

        /// Embed chunks and queries with this function.
        pub fn embedding_function(
            mut self,
            function: std::sync::Arc<dyn $crate::embedding::EmbeddingFunction>,
        ) -> Self {
            self.options.embedding_function = Some(function);
            self
        }

        /// Resolve unset options from these settings instead of the environment.
        pub fn settings(mut self, settings: $crate::settings::Settings) -> Self {
            self.options.settings = Some(settings);
            self
        }
    };
}
pub(crate) use database_option_setters;

/// Embed every chunk's content with one batched call.
pub(crate) async fn embed_chunks(
    function: &dyn EmbeddingFunction,
    chunks: &[Chunk],
    collection: &str,
) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let embeddings = function.embed_batch(&texts).await.map_err(|e| {
        error!(collection, chunk_count = chunks.len(), error = %e, "embedding failed");
        e
    })?;

    if embeddings.len() != chunks.len() {
        return Err(RagError::EmbeddingError {
            provider: "embedding_function".into(),
            message: format!(
                "expected {} embeddings, received {}",
                chunks.len(),
                embeddings.len()
            ),
        });
    }
    Ok(embeddings)
}

/// Encode a collection name as a table identifier.
///
/// ASCII alphanumerics are kept, `_` becomes `__` and every other byte becomes
/// `_` followed by two lowercase hex digits. Distinct names never share a table.
pub(crate) fn collection_table_name(backend: &str, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(RagError::InvalidConfiguration(format!(
            "{backend}: collection name must not be empty"
        )));
    }
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'_' => encoded.push_str("__"),
            b if b.is_ascii_alphanumeric() => encoded.push(char::from(b)),
            b => encoded.push_str(&format!("_{b:02x}")),
        }
    }
    Ok(encoded)
}
