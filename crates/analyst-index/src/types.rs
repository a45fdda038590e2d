//! Common types for analyst-index.

use serde::{Deserialize, Serialize};

/// One embedded passage of a corpus document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Source identifier of the document the chunk came from (path or URL).
    pub source: String,
    /// Optional document title.
    pub title: Option<String>,
    /// Chunk text.
    pub text: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
}

/// A scored search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Source identifier of the matching chunk.
    pub source: String,
    /// Optional document title.
    pub title: Option<String>,
    /// Chunk text.
    pub text: String,
    /// Similarity score (higher is more similar).
    pub score: f32,
}
