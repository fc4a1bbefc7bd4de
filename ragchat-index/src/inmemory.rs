//! In-memory vector database using cosine distance.
//!
//! This module provides [`InMemoryVectorDatabase`], a dependency-free adapter
//! backed by an [`InMemoryBackend`] shared through `Arc`. Several adapters
//! bound to different collections can share one backend, which makes it
//! suitable for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{AllDocuments, Chunk, DeletionResult, SearchResult};
use crate::embedding::{EmbeddingFunction, cosine_distance};
use crate::error::{RagError, Result};
use crate::indexing::TextIndexingStrategy;
use crate::vectordb::{
    CollectionState, DatabaseOptions, ResolvedOptions, VectorDatabase, database_option_setters,
    embed_chunks,
};

const BACKEND: &str = "InMemory";

#[derive(Debug, Clone)]
struct StoredRow {
    id: String,
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Shared storage for in-memory collections.
///
/// Collections map to their rows in insertion order. All operations are
/// async-safe via `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, Vec<StoredRow>>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the existing collections, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns `true` if the collection exists.
    pub async fn has_collection(&self, name: &str) -> bool {
        self.collections.read().await.contains_key(name)
    }
}

/// A [`VectorDatabase`] that keeps its collection in process memory.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::{InMemoryVectorDatabase, VectorDatabase};
///
/// let db = InMemoryVectorDatabase::builder()
///     .collection_name("docs")
///     .embedding_function(embedder)
///     .build()?;
/// let ids = db.split_and_store_text(text.into(), &metadata).await?;
/// ```
pub struct InMemoryVectorDatabase {
    backend: Arc<InMemoryBackend>,
    options: ResolvedOptions,
    state: RwLock<CollectionState>,
}

impl InMemoryVectorDatabase {
    /// Create a new [`InMemoryVectorDatabaseBuilder`].
    pub fn builder() -> InMemoryVectorDatabaseBuilder {
        InMemoryVectorDatabaseBuilder::default()
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<InMemoryBackend> {
        &self.backend
    }

    /// Current lifecycle state of the bound collection.
    pub async fn state(&self) -> CollectionState {
        *self.state.read().await
    }

    /// Create the collection if it does not exist.
    pub async fn bind(&self) {
        self.backend
            .collections
            .write()
            .await
            .entry(self.collection_name().to_string())
            .or_default();
        *self.state.write().await = CollectionState::Bound;
    }
}

/// Builder for [`InMemoryVectorDatabase`].
#[derive(Debug, Default)]
pub struct InMemoryVectorDatabaseBuilder {
    options: DatabaseOptions,
    backend: Option<Arc<InMemoryBackend>>,
}

impl InMemoryVectorDatabaseBuilder {
    database_option_setters!();

    /// Share an existing backend instead of creating a fresh one.
    pub fn backend(mut self, backend: Arc<InMemoryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<InMemoryVectorDatabase> {
        let (options, _) = self.options.resolve()?;
        Ok(InMemoryVectorDatabase {
            backend: self.backend.unwrap_or_default(),
            options,
            state: RwLock::new(CollectionState::Unbound),
        })
    }
}

#[async_trait]
impl VectorDatabase for InMemoryVectorDatabase {
    fn collection_name(&self) -> &str {
        &self.options.collection_name
    }

    fn split_strategy(&self) -> Arc<dyn TextIndexingStrategy> {
        self.options.split_strategy.clone()
    }

    fn embedding_function(&self) -> Arc<dyn EmbeddingFunction> {
        self.options.embedding_function.clone()
    }

    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<String>> {
        let collection = self.collection_name();
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings =
            embed_chunks(self.options.embedding_function.as_ref(), &chunks, collection).await?;

        let rows: Vec<StoredRow> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredRow {
                id: uuid::Uuid::new_v4().to_string(),
                chunk,
                embedding,
            })
            .collect();
        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

        let mut collections = self.backend.collections.write().await;
        collections.entry(collection.to_string()).or_default().extend(rows);
        *self.state.write().await = CollectionState::Bound;

        debug!(collection, chunk_count = ids.len(), "inserted chunks into memory");
        Ok(ids)
    }

    async fn delete_embeddings(&self, source_id: &str) -> Result<DeletionResult> {
        let collection = self.collection_name();
        let mut collections = self.backend.collections.write().await;
        let Some(rows) = collections.get_mut(collection) else {
            return Ok(DeletionResult::default());
        };

        let before = rows.len();
        rows.retain(|row| row.chunk.source_id() != Some(source_id));
        let deleted = (before - rows.len()) as u64;

        debug!(collection, source_id, deleted, "deleted chunks from memory");
        Ok(DeletionResult::deleted(deleted))
    }

    async fn drop_collection(&self, collection_name: &str, ignore_non_exist: bool) -> Result<()> {
        let removed = self.backend.collections.write().await.remove(collection_name);
        if removed.is_none() && !ignore_non_exist {
            return Err(RagError::CollectionNotFound {
                backend: BACKEND.to_string(),
                collection: collection_name.to_string(),
            });
        }

        if collection_name == self.collection_name() {
            *self.state.write().await = CollectionState::Dropped;
        }
        debug!(collection = collection_name, existed = removed.is_some(), "dropped collection");
        Ok(())
    }

    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.options.embedding_function.embed(query).await?;

        let collections = self.backend.collections.read().await;
        let Some(rows) = collections.get(self.collection_name()) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<SearchResult> = rows
            .iter()
            .map(|row| SearchResult {
                id: row.id.clone(),
                chunk: row.chunk.clone(),
                score: cosine_distance(&row.embedding, &query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_all_documents(&self) -> Result<AllDocuments> {
        let collections = self.backend.collections.read().await;
        let mut all = AllDocuments::default();
        for row in collections.get(self.collection_name()).into_iter().flatten() {
            all.ids.push(row.id.clone());
            all.metadatas.push(row.chunk.metadata.clone());
            all.texts.push(row.chunk.content.clone());
        }
        Ok(all)
    }
}
