//! Error types for the `ragchat-index` crate.

use thiserror::Error;

/// Errors that can occur while indexing, storing or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required [`DocumentMetadata`](crate::DocumentMetadata) field was not supplied.
    #[error("Missing required metadata field: {0}")]
    MissingField(&'static str),

    /// Configuration is missing, malformed, or names an unknown scheme/provider.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The named collection does not exist in the backend.
    #[error("Collection not found ({backend}): {collection}")]
    CollectionNotFound {
        /// The vector database backend that reported the error.
        backend: String,
        /// The collection that was referenced.
        collection: String,
    },

    /// The operation is not allowed on this adapter in its current state.
    #[error("{0}")]
    InvalidOperation(String),

    /// The backend could not be reached or the connection failed mid-call.
    #[error("Backend unavailable ({backend}): {message}")]
    BackendUnavailable {
        /// The vector database backend that failed.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend rejected or failed to execute a request.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector database backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A chat model call failed or returned unusable content.
    #[error("Model error ({provider}): {message}")]
    ModelError {
        /// The chat model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Metadata could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A tool call received invalid arguments or failed.
    #[error("Tool error: {0}")]
    Tool(String),
}

impl RagError {
    /// Returns `true` if this error reports a missing collection.
    pub fn is_collection_not_found(&self) -> bool {
        matches!(self, RagError::CollectionNotFound { .. })
    }
}

/// A convenience result type for indexing and storage operations.
pub type Result<T> = std::result::Result<T, RagError>;
