//! # analyst-index
//!
//! A small embedded vector index for research-analyst's local document store.
//!
//! ## Features
//!
//! - **Exact search**: linear top-k scan, deterministic ordering
//! - **Content-addressed persistence**: the index is stored next to a SHA-256
//!   of the corpus it was built from, so callers can tell when to rebuild
//! - **Multiple metrics**: Cosine, Dot Product, Euclidean (L2)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use analyst_index::{ChunkIndex, DistanceMetric, IndexedChunk};
//!
//! let mut index = ChunkIndex::new(DistanceMetric::Cosine);
//! index.insert(IndexedChunk {
//!     source: "notes.md".into(),
//!     title: None,
//!     text: "Flooding closed the playa".into(),
//!     vector: vec![0.1, 0.9],
//! })?;
//! let hits = index.search(&[0.2, 0.8], 6)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use distance::{cosine_similarity, DistanceMetric};
pub use error::{Error, Result};
pub use index::ChunkIndex;
pub use persistence::{corpus_hash, load_index, read_corpus_hash, save_index};
pub use types::{IndexedChunk, SearchResult};
