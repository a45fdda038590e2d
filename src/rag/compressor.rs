//! Relevance-based context compression.
//!
//! Raw evidence is split into overlapping chunks, each chunk is scored by
//! cosine similarity to the query, and the chunks that clear the threshold are
//! rendered as fixed three-line blocks:
//!
//! ```text
//! Source: <identifier>
//! Title: <title>
//! Content: <chunk text>
//! ```
//!
//! Blocks are joined by a blank line. Report prompts consume this text
//! verbatim, so the shape must not change.

use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Evidence, Result};
use analyst_index::cosine_similarity;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Empirically calibrated minimum cosine similarity for a chunk to be kept.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.38;

/// Default number of rendered passages per query.
pub const DEFAULT_MAX_RESULTS: usize = 8;

/// Output of [`ContextCompressor::compress`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressedContext {
    /// Rendered passages, empty when nothing cleared the threshold
    pub text: String,
    /// Distinct sources among the rendered passages, best match first
    pub sources: Vec<String>,
}

impl CompressedContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

struct ScoredChunk<'a> {
    evidence: &'a Evidence,
    text: String,
    score: f32,
}

/// Filters evidence down to passages relevant to one query.
pub struct ContextCompressor {
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    threshold: f32,
}

impl ContextCompressor {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: TextChunker, threshold: f32) -> Self {
        Self {
            embedder,
            chunker,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Compress `documents` against `query`, keeping at most `max_results` passages.
    ///
    /// No passage clearing the threshold is not an error: the result is empty.
    pub async fn compress(
        &self,
        query: &str,
        documents: &[Evidence],
        max_results: usize,
    ) -> Result<CompressedContext> {
        let pieces: Vec<(&Evidence, String)> = documents
            .iter()
            .flat_map(|doc| {
                self.chunker
                    .chunk(&doc.content)
                    .into_iter()
                    .map(move |chunk| (doc, chunk))
            })
            .collect();

        if pieces.is_empty() || max_results == 0 {
            return Ok(CompressedContext::default());
        }

        let mut inputs = Vec::with_capacity(pieces.len() + 1);
        inputs.push(query.to_string());
        inputs.extend(pieces.iter().map(|(_, chunk)| chunk.clone()));

        let vectors = self.embedder.embed(&inputs).await?;
        let (query_vector, chunk_vectors) = vectors
            .split_first()
            .ok_or_else(|| AppError::Internal("embedder returned no vectors".to_string()))?;
        if chunk_vectors.len() != pieces.len() {
            return Err(AppError::Internal(format!(
                "embedder returned {} vectors for {} chunks",
                chunk_vectors.len(),
                pieces.len()
            )));
        }

        let mut kept: Vec<ScoredChunk<'_>> = pieces
            .into_iter()
            .zip(chunk_vectors)
            .map(|((evidence, text), vector)| ScoredChunk {
                evidence,
                text,
                score: cosine_similarity(query_vector, vector),
            })
            .filter(|c| c.score >= self.threshold)
            .collect();

        // Stable sort keeps document order among equal scores
        kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        kept.truncate(max_results);

        debug!(
            query,
            documents = documents.len(),
            kept = kept.len(),
            threshold = self.threshold,
            "Compressed context"
        );

        Ok(render(&kept))
    }
}

fn render(chunks: &[ScoredChunk<'_>]) -> CompressedContext {
    let mut sources: Vec<String> = Vec::new();
    let blocks: Vec<String> = chunks
        .iter()
        .map(|c| {
            if !sources.contains(&c.evidence.source) {
                sources.push(c.evidence.source.clone());
            }
            format!(
                "Source: {}\nTitle: {}\nContent: {}\n",
                c.evidence.source,
                c.evidence.title.as_deref().unwrap_or(""),
                c.text
            )
        })
        .collect();

    CompressedContext {
        text: blocks.join("\n"),
        sources,
    }
}
