//! Descriptor of a logical source document.
//!
//! Every chunk stored in a vector database carries a copy of its source
//! document's [`DocumentMetadata`], flattened by [`DocumentMetadata::to_dict`].
//! The `source_id` field is the key used to delete all chunks of a document.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RagError, Result};

/// Format used for `modified_at` in serialized metadata.
const MODIFIED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Metadata field holding the logical document id.
pub const SOURCE_ID: &str = "source_id";
/// Metadata field holding the human-readable source label.
pub const SOURCE_NAME: &str = "source_name";
/// Metadata field holding the source's last-modified time.
pub const MODIFIED_AT: &str = "modified_at";
/// Metadata field holding the free-form payload.
pub const PAYLOAD: &str = "payload";

/// Metadata about a source document, stored alongside each of its chunks.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_index::DocumentMetadata;
///
/// let metadata = DocumentMetadata::builder()
///     .source_id("https://wiki.example.com/onboarding")
///     .source_name("Onboarding guide")
///     .modified_at(modified)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    source_id: String,
    source_name: String,
    modified_at: NaiveDateTime,
    #[serde(default)]
    payload: Map<String, Value>,
}

impl DocumentMetadata {
    /// Create metadata with an empty payload.
    pub fn new(
        source_id: impl Into<String>,
        source_name: impl Into<String>,
        modified_at: NaiveDateTime,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_name: source_name.into(),
            modified_at,
            payload: Map::new(),
        }
    }

    /// Create a new [`DocumentMetadataBuilder`].
    pub fn builder() -> DocumentMetadataBuilder {
        DocumentMetadataBuilder::default()
    }

    /// Replace the payload.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// The logical document id shared by all chunks of the document.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The human-readable source label.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The source's last-modified time.
    pub fn modified_at(&self) -> NaiveDateTime {
        self.modified_at
    }

    /// Free-form extra metadata.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Convert to the flat map stored with every chunk.
    ///
    /// `modified_at` is rendered as an ISO-8601 string; all other fields are
    /// carried verbatim.
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert(SOURCE_ID.to_string(), Value::String(self.source_id.clone()));
        dict.insert(SOURCE_NAME.to_string(), Value::String(self.source_name.clone()));
        dict.insert(MODIFIED_AT.to_string(), Value::String(format_modified_at(self.modified_at)));
        dict.insert(PAYLOAD.to_string(), Value::Object(self.payload.clone()));
        dict
    }

    /// Rebuild metadata from a map produced by [`to_dict`](Self::to_dict).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::MissingField`] if a required field is absent or
    /// not a string, and [`RagError::InvalidConfiguration`] if `modified_at`
    /// cannot be parsed.
    pub fn from_dict(dict: &Map<String, Value>) -> Result<Self> {
        let source_id = required_str(dict, SOURCE_ID)?;
        let source_name = required_str(dict, SOURCE_NAME)?;
        let modified_at = parse_modified_at(required_str(dict, MODIFIED_AT)?)?;
        let payload = match dict.get(PAYLOAD) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        Ok(Self {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            modified_at,
            payload,
        })
    }
}

fn required_str<'a>(dict: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    dict.get(field).and_then(Value::as_str).ok_or(RagError::MissingField(field))
}

/// Render a timestamp the way it is stored in chunk metadata.
pub fn format_modified_at(modified_at: NaiveDateTime) -> String {
    modified_at.format(MODIFIED_AT_FORMAT).to_string()
}

/// Parse a stored `modified_at` value.
pub fn parse_modified_at(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, MODIFIED_AT_FORMAT).map_err(|e| {
        RagError::InvalidConfiguration(format!("invalid modified_at '{value}': {e}"))
    })
}

/// Builder for [`DocumentMetadata`] that reports which required field is missing.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadataBuilder {
    source_id: Option<String>,
    source_name: Option<String>,
    modified_at: Option<NaiveDateTime>,
    payload: Map<String, Value>,
}

impl DocumentMetadataBuilder {
    /// Set the logical document id.
    pub fn source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Set the human-readable source label.
    pub fn source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Set the source's last-modified time.
    pub fn modified_at(mut self, modified_at: NaiveDateTime) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// Set the free-form payload.
    pub fn payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Insert a single payload entry.
    pub fn payload_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Build the [`DocumentMetadata`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::MissingField`] naming the first absent required field.
    pub fn build(self) -> Result<DocumentMetadata> {
        Ok(DocumentMetadata {
            source_id: self.source_id.ok_or(RagError::MissingField(SOURCE_ID))?,
            source_name: self.source_name.ok_or(RagError::MissingField(SOURCE_NAME))?,
            modified_at: self.modified_at.ok_or(RagError::MissingField(MODIFIED_AT))?,
            payload: self.payload,
        })
    }
}
