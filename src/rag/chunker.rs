use crate::types::{AppError, Result};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Character-budget text splitter with overlap.
///
/// Splits on the largest semantic unit (paragraph, sentence, word) that fits
/// the budget, so chunks rarely cut through a sentence.
pub struct TextChunker {
    splitter: TextSplitter<Characters>,
}

impl TextChunker {
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
        })
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.splitter.chunks(text).map(str::to_string).collect()
    }
}
