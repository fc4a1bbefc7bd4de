//! Configuration for text splitting.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Chunking parameters for [`BaseTextIndexing`](crate::BaseTextIndexing).
///
/// Sizes are counted in characters, not bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of trailing characters carried from one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { chunk_size: 1_000, chunk_overlap: 200 }
    }
}

impl IndexingConfig {
    /// Create a new builder for constructing an [`IndexingConfig`].
    pub fn builder() -> IndexingConfigBuilder {
        IndexingConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`IndexingConfig`].
#[derive(Debug, Clone, Default)]
pub struct IndexingConfigBuilder {
    config: IndexingConfig,
}

impl IndexingConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Build the [`IndexingConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    pub fn build(self) -> Result<IndexingConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        Ok(self.config)
    }
}
