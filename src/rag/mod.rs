//! Retrieval and compression components.
//!
//! # Module Structure
//!
//! - [`chunker`] - Character-budget text splitting with overlap
//! - [`embeddings`] - The [`Embedder`](embeddings::Embedder) capability and its providers
//! - [`cache`] - LRU decorator that avoids re-embedding repeated chunks
//! - [`compressor`] - Similarity filtering of evidence into rendered context
//!
//! # Compression Flow
//!
//! 1. **Split** - each document becomes ~1000-character chunks with 100 overlap
//! 2. **Score** - query and chunks are embedded together, scored by cosine similarity
//! 3. **Filter** - chunks below the threshold (0.38) are dropped
//! 4. **Render** - the best `max_results` chunks become `Source/Title/Content` blocks

pub mod cache;
pub mod chunker;
pub mod compressor;
pub mod embeddings;

pub use cache::CachedEmbedder;
pub use chunker::TextChunker;
pub use compressor::{CompressedContext, ContextCompressor};
pub use embeddings::{create_embedder, Embedder};
