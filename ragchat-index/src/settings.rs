//! Environment-level configuration.
//!
//! [`Settings`] is read once at construction time from process environment
//! variables (or any lookup function, for tests) and passed explicitly to the
//! components that need it.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::provider::{ModelSpec, ProviderSettings};

/// Collection used when neither the caller nor the environment names one.
pub const DEFAULT_COLLECTION_NAME: &str = "rag_documents";

/// Embedding model used when `EMBEDDING_MODEL` is unset.
pub const DEFAULT_EMBEDDING_MODEL: &str = "bedrock:amazon.titan-embed-text-v2:0";

/// Document engine address used when `SURREAL_DB_URI` is unset.
pub const DEFAULT_SURREAL_URI: &str = "http://localhost:8000";

const DEFAULT_SURREAL_NAMESPACE: &str = "ragchat";
const DEFAULT_SURREAL_DATABASE: &str = "ragchat";

/// Process-wide settings for indexing and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Default collection name (`DEFAULT_VECTOR_DB_COLLECTION_NAME`).
    pub collection_name: String,
    /// Embedding model (`EMBEDDING_MODEL`).
    pub embedding_model: ModelSpec,
    /// Chat model used for summarization (`LLM_MODEL_ID`).
    pub chat_model: Option<ModelSpec>,
    /// PostgreSQL connection string for the pgvector backend (`PGVECTOR_DB_URI`).
    pub pgvector_uri: Option<String>,
    /// SurrealDB address (`SURREAL_DB_URI`).
    pub surreal_uri: String,
    /// SurrealDB namespace (`SURREAL_DB_NAMESPACE`).
    pub surreal_namespace: String,
    /// SurrealDB database (`SURREAL_DB_DATABASE`).
    pub surreal_database: String,
    /// Provider credentials and endpoints.
    pub providers: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_model: ModelSpec::new(
                crate::provider::ModelProvider::Bedrock,
                "amazon.titan-embed-text-v2:0",
            ),
            chat_model: None,
            pgvector_uri: None,
            surreal_uri: DEFAULT_SURREAL_URI.to_string(),
            surreal_namespace: DEFAULT_SURREAL_NAMESPACE.to_string(),
            surreal_database: DEFAULT_SURREAL_DATABASE.to_string(),
            providers: ProviderSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if a model spec names an
    /// unknown provider or is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable if set.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let embedding_model = get("EMBEDDING_MODEL")
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string())
            .parse::<ModelSpec>()?;
        let chat_model = get("LLM_MODEL_ID").map(|v| v.parse::<ModelSpec>()).transpose()?;

        Ok(Self {
            collection_name: get("DEFAULT_VECTOR_DB_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            embedding_model,
            chat_model,
            pgvector_uri: get("PGVECTOR_DB_URI"),
            surreal_uri: get("SURREAL_DB_URI").unwrap_or_else(|| DEFAULT_SURREAL_URI.to_string()),
            surreal_namespace: get("SURREAL_DB_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_SURREAL_NAMESPACE.to_string()),
            surreal_database: get("SURREAL_DB_DATABASE")
                .unwrap_or_else(|| DEFAULT_SURREAL_DATABASE.to_string()),
            providers: ProviderSettings {
                openai_api_key: get("OPENAI_API_KEY"),
                ollama_base_url: get("OLLAMA_BASE_URL"),
                bedrock_api_key: get("BEDROCK_API_KEY"),
                aws_region: get("AWS_REGION"),
            },
        })
    }

    /// The configured chat model, or an error naming the missing variable.
    pub fn require_chat_model(&self) -> Result<&ModelSpec> {
        self.chat_model.as_ref().ok_or_else(|| {
            RagError::InvalidConfiguration("LLM_MODEL_ID must be set to build a chat model".into())
        })
    }
}

/// Connection parameters of the relational checkpoint store used by the chat
/// server for conversation history.
///
/// Built explicitly by the application bootstrap and passed to whoever needs
/// the connection string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStoreConfig {
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
}

impl CheckpointStoreConfig {
    /// Create a config for the default deployment (`postgres@postgres:5432/chat_db`).
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            user: "postgres".to_string(),
            password: password.into(),
            host: "postgres".to_string(),
            port: 5432,
            database: "chat_db".to_string(),
        }
    }

    /// Read the config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the config through `lookup`.
    ///
    /// `POSTGRES_PASSWORD` is required; `POSTGRES_USER`, `POSTGRES_HOST`,
    /// `POSTGRES_PORT` and `POSTGRES_DB` override the deployment defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let password = lookup("POSTGRES_PASSWORD").ok_or_else(|| {
            RagError::InvalidConfiguration("POSTGRES_PASSWORD must be set".into())
        })?;
        let mut config = Self::new(password);

        if let Some(user) = lookup("POSTGRES_USER") {
            config.user = user;
        }
        if let Some(host) = lookup("POSTGRES_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("POSTGRES_PORT") {
            config.port = port.parse().map_err(|e| {
                RagError::InvalidConfiguration(format!("invalid POSTGRES_PORT '{port}': {e}"))
            })?;
        }
        if let Some(database) = lookup("POSTGRES_DB") {
            config.database = database;
        }
        Ok(config)
    }

    /// A `postgres://` URI for these parameters.
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}
