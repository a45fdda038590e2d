//! Embedding Cache for the compression pipeline
//!
//! The same page is often compressed against several sub-queries (always the
//! case for the explicit-URL source), so chunk embeddings repeat. [`CachedEmbedder`]
//! wraps any [`Embedder`] with an in-memory LRU so each distinct chunk is
//! embedded once per process.
//!
//! # Cache Key Strategy
//!
//! Keys are SHA-256 hashes of `text + "|" + model_name`, so switching models
//! never returns stale vectors.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Result};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries in cache
    pub entry_count: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Compute a cache key for the given text and model
pub fn compute_key(text: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    hex::encode(hasher.finalize())
}

/// LRU-caching decorator around an [`Embedder`]
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Option<Mutex<LruCache<String, Vec<f32>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbedder {
    /// Wrap `inner`; a `capacity` of 0 disables caching.
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.as_ref().map(|c| c.lock().len()).unwrap_or(0),
        }
    }

    /// Whether caching is active
    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let Some(cache) = &self.cache else {
            return self.inner.embed(texts).await;
        };

        let model = self.inner.model_name();
        let keys: Vec<String> = texts.iter().map(|t| compute_key(t, model)).collect();

        let mut results: Vec<Option<Vec<f32>>> = {
            let mut guard = cache.lock();
            keys.iter().map(|k| guard.get(k).cloned()).collect()
        };

        let missing: Vec<usize> = (0..texts.len()).filter(|&i| results[i].is_none()).collect();
        let hit_count = (texts.len() - missing.len()) as u64;
        self.hits.fetch_add(hit_count, Ordering::Relaxed);
        self.misses.fetch_add(missing.len() as u64, Ordering::Relaxed);
        trace!(hits = hit_count, misses = missing.len(), "Embedding cache lookup");

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed(&batch).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::Internal(format!(
                    "Embedder returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }

            let mut guard = cache.lock();
            for (&i, vector) in missing.iter().zip(vectors) {
                guard.put(keys[i].clone(), vector.clone());
                results[i] = Some(vector);
            }
        }

        results
            .into_iter()
            .map(|v| v.ok_or_else(|| AppError::Internal("embedding missing after fill".to_string())))
            .collect()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
