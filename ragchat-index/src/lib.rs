//! # ragchat-index
//!
//! Text indexing and pluggable vector-database storage for the ragchat
//! retrieval backend.
//!
//! Documents enter as text plus [`DocumentMetadata`]. A
//! [`TextIndexingStrategy`] splits them into metadata-tagged [`Chunk`]s, a
//! [`VectorDatabase`] embeds and stores them, and every chunk of a document
//! can later be removed in one call by its `source_id`. The
//! [`RetrieverTool`] exposes top-k retrieval to a chat agent.
//!
//! ## Features
//!
//! Remote backends and model providers are feature-gated. The in-memory
//! database, the indexing strategies and the retrieval tool are always
//! available.
//!
//! | Feature     | What it enables                                         |
//! |-------------|---------------------------------------------------------|
//! | `openai`    | `OpenAIEmbeddingFunction`, `OpenAIChatModel` via reqwest |
//! | `ollama`    | `OllamaEmbeddingFunction`, `OllamaChatModel` via reqwest |
//! | `bedrock`   | `BedrockEmbeddingFunction`, `BedrockChatModel` via reqwest |
//! | `pgvector`  | `PgVectorDatabase` via sqlx                              |
//! | `surrealdb` | `SurrealVectorDatabase` via surrealdb                    |
//! | `full`      | All of the above (default)                               |

pub mod chat;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod indexing;
pub mod inmemory;
pub mod metadata;
pub mod provider;
pub mod settings;
pub mod tool;
pub mod vectordb;

#[cfg(feature = "bedrock")]
pub mod bedrock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;
#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub use chat::{ChatModel, ChatOptions, ChatResponse};
pub use config::{IndexingConfig, IndexingConfigBuilder};
pub use document::{AllDocuments, Chunk, DeletionResult, IndexInput, SearchResult};
pub use embedding::EmbeddingFunction;
pub use error::{RagError, Result};
pub use indexing::{
    BaseTextIndexing, ContextAwareIndexing, ContextAwareIndexingBuilder, TextIndexingStrategy,
};
pub use inmemory::{InMemoryBackend, InMemoryVectorDatabase, InMemoryVectorDatabaseBuilder};
pub use metadata::{DocumentMetadata, DocumentMetadataBuilder};
pub use provider::{ModelProvider, ModelSpec, ProviderSettings};
pub use settings::{CheckpointStoreConfig, Settings};
pub use tool::{RetrievedDocument, RetrieverTool, Tool};
pub use vectordb::{CollectionState, DatabaseOptions, VectorDatabase};

#[cfg(feature = "bedrock")]
pub use bedrock::{BedrockChatModel, BedrockEmbeddingFunction};
#[cfg(feature = "ollama")]
pub use ollama::{OllamaChatModel, OllamaEmbeddingFunction};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingFunction};
#[cfg(feature = "pgvector")]
pub use pgvector::{ConsistencyLevel, PgVectorDatabase, PgVectorDatabaseBuilder};
#[cfg(feature = "surrealdb")]
pub use self::surrealdb::{SurrealEndpoint, SurrealVectorDatabase, SurrealVectorDatabaseBuilder};
