//! Exact (flat) similarity index.
//!
//! Corpora handled here are a few thousand chunks at most, so every search is
//! a linear scan. Readers never observe a partially built index: callers
//! build a fresh `ChunkIndex` and swap it in whole.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{IndexedChunk, SearchResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::trace;

/// In-memory index of embedded chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkIndex {
    dimensions: usize,
    metric: DistanceMetric,
    chunks: Vec<IndexedChunk>,
}

impl ChunkIndex {
    /// Create an empty index using the given metric.
    ///
    /// Dimensions are fixed by the first inserted vector.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            dimensions: 0,
            metric,
            chunks: Vec::new(),
        }
    }

    /// Get the vector dimensions (0 while empty).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All indexed chunks in insertion order.
    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    /// Insert a chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector is empty, contains non-finite values, or
    /// its length differs from vectors already in the index.
    pub fn insert(&mut self, chunk: IndexedChunk) -> Result<()> {
        validate_vector(&chunk.vector)?;

        if self.chunks.is_empty() {
            self.dimensions = chunk.vector.len();
        } else if chunk.vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: chunk.vector.len(),
            });
        }

        self.chunks.push(chunk);
        Ok(())
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// Ties keep insertion order. No minimum score is applied.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        validate_vector(query)?;
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.metric.similarity(query, &c.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        trace!(k, hits = scored.len(), "Searched chunk index");

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let chunk = &self.chunks[i];
                SearchResult {
                    source: chunk.source.clone(),
                    title: chunk.title.clone(),
                    text: chunk.text.clone(),
                    score,
                }
            })
            .collect())
    }
}

fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::InvalidVector("vector is empty".to_string()));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidVector(
            "vector contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}
