//! Local document corpus retrieval
//!
//! The corpus directory is walked for `.txt` and `.md` files, chunked, and
//! embedded into an [`analyst_index::ChunkIndex`]. The index is persisted in
//! the cache directory together with a content hash of the corpus; a later
//! open with an unchanged corpus reuses it instead of re-embedding.
//! Rebuilds are all-or-nothing and swapped in only once complete.

use super::{EvidenceSource, VisitedSources};
use crate::rag::{Embedder, TextChunker};
use crate::types::{AppError, DataSource, Evidence, Result};
use crate::utils::toml_config::LocalStoreConfig;
use analyst_index::{
    corpus_hash, load_index, read_corpus_hash, save_index, ChunkIndex, DistanceMetric,
    IndexedChunk,
};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const EMBED_BATCH: usize = 32;

/// A corpus file ready for indexing
#[derive(Debug, Clone)]
pub struct CorpusDocument {
    /// Path relative to the corpus root, used for hashing
    pub relative_path: String,
    /// Identifier recorded in visited sources and references
    pub source: String,
    pub bytes: Vec<u8>,
}

impl CorpusDocument {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Outcome of (re)loading the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Cached { chunks: usize },
    Rebuilt { chunks: usize },
}

/// Map a corpus file name to its source identifier.
///
/// PubMed (`PM<digits>.txt`) and PubMed Central (`PMC<digits>.txt`) exports
/// map to their article URLs; anything else keeps its file name.
pub fn source_for_file(file_name: &str) -> String {
    let Some(stem) = file_name.strip_suffix(".txt") else {
        return file_name.to_string();
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if let Some(id) = stem.strip_prefix("PMC").filter(|id| all_digits(id)) {
        return format!("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC{}/", id);
    }
    if let Some(id) = stem.strip_prefix("PM").filter(|id| all_digits(id)) {
        return format!("https://pubmed.ncbi.nlm.nih.gov/{}/", id);
    }
    file_name.to_string()
}

/// Read every `.txt`/`.md` file under `root`.
pub fn load_corpus(root: &Path) -> Result<Vec<CorpusDocument>> {
    if !root.is_dir() {
        return Err(AppError::NoDocuments(format!(
            "Corpus directory {} does not exist",
            root.display()
        )));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| AppError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "txt" | "md"))
            .unwrap_or(false);
        if !supported {
            debug!(path = %path.display(), "Skipping unsupported corpus file");
            continue;
        }

        let bytes = std::fs::read(path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let file_name = entry.file_name().to_string_lossy();

        documents.push(CorpusDocument {
            source: source_for_file(&file_name),
            relative_path,
            bytes,
        });
    }
    Ok(documents)
}

/// Similarity retrieval over a local corpus
pub struct LocalStore {
    index: ArcSwap<ChunkIndex>,
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    corpus_dir: PathBuf,
    cache_dir: PathBuf,
    top_k: usize,
    rebuild: Mutex<()>,
}

impl LocalStore {
    /// Open the store, reusing the cached index when the corpus is unchanged.
    pub async fn open(config: &LocalStoreConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = Self {
            index: ArcSwap::from_pointee(ChunkIndex::new(DistanceMetric::Cosine)),
            embedder,
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap)?,
            corpus_dir: config.corpus_dir.clone(),
            cache_dir: config.cache_dir.clone(),
            top_k: config.top_k.max(1),
            rebuild: Mutex::new(()),
        };
        store.refresh().await?;
        Ok(store)
    }

    /// Re-check the corpus hash and rebuild the index if it changed.
    ///
    /// Readers keep using the previous index until the new one is swapped in.
    pub async fn refresh(&self) -> Result<IndexStatus> {
        let _exclusive = self.rebuild.lock().await;

        let root = self.corpus_dir.clone();
        let documents = tokio::task::spawn_blocking(move || load_corpus(&root))
            .await
            .map_err(|e| AppError::Internal(format!("Corpus loading task failed: {}", e)))??;
        if documents.is_empty() {
            return Err(AppError::NoDocuments(format!(
                "No .txt or .md documents in {}",
                self.corpus_dir.display()
            )));
        }

        let files: Vec<(String, Vec<u8>)> = documents
            .iter()
            .map(|d| (d.relative_path.clone(), d.bytes.clone()))
            .collect();
        let hash = corpus_hash(&files);

        if read_corpus_hash(&self.cache_dir).await?.as_deref() == Some(hash.as_str()) {
            match load_index(&self.cache_dir).await {
                Ok(Some(index)) if !index.is_empty() => {
                    let chunks = index.len();
                    info!(chunks, cache_dir = %self.cache_dir.display(), "Using cached index");
                    self.index.store(Arc::new(index));
                    return Ok(IndexStatus::Cached { chunks });
                }
                Ok(_) => debug!("Cached index missing or empty, rebuilding"),
                Err(e) => warn!(error = %e, "Cached index unreadable, rebuilding"),
            }
        }

        let index = self.build_index(&documents).await?;
        let chunks = index.len();
        save_index(&self.cache_dir, &index, &hash).await?;
        self.index.store(Arc::new(index));
        info!(documents = documents.len(), chunks, "Rebuilt local index");
        Ok(IndexStatus::Rebuilt { chunks })
    }

    async fn build_index(&self, documents: &[CorpusDocument]) -> Result<ChunkIndex> {
        let mut pending: Vec<(&CorpusDocument, String)> = Vec::new();
        for document in documents {
            for chunk in self.chunker.chunk(&document.text()) {
                pending.push((document, chunk));
            }
        }

        let mut index = ChunkIndex::new(DistanceMetric::Cosine);
        for batch in pending.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::Internal(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            for ((document, text), vector) in batch.iter().zip(vectors) {
                index.insert(IndexedChunk {
                    source: document.source.clone(),
                    title: Some(document.relative_path.clone()),
                    text: text.clone(),
                    vector,
                })?;
            }
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.index.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EvidenceSource for LocalStore {
    async fn fetch(&self, sub_query: &str, visited: &VisitedSources) -> Result<Vec<Evidence>> {
        let index = self.index.load_full();
        if index.is_empty() {
            return Err(AppError::NoDocuments(format!(
                "Index for {} is empty",
                self.corpus_dir.display()
            )));
        }

        let query_vector = self
            .embedder
            .embed(&[sub_query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("embedder returned no vectors".to_string()))?;

        let results = index.search(&query_vector, self.top_k)?;

        // Documents are recorded for references; chunks are never dropped for
        // having been seen by an earlier sub-query.
        let ids: Vec<String> = results.iter().map(|r| r.source.clone()).collect();
        visited.admit(&ids);

        debug!(sub_query, results = results.len(), "Retrieved local chunks");
        Ok(results
            .into_iter()
            .map(|r| Evidence {
                source: r.source,
                title: r.title,
                content: r.text,
            })
            .collect())
    }

    fn kind(&self) -> DataSource {
        DataSource::LocalStore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("PM12345.txt", "https://pubmed.ncbi.nlm.nih.gov/12345/")]
    #[case("PMC998.txt", "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC998/")]
    #[case("PMCabc.txt", "PMCabc.txt")]
    #[case("notes.md", "notes.md")]
    #[case("PM12.md", "PM12.md")]
    fn test_source_for_file(#[case] file: &str, #[case] expected: &str) {
        assert_eq!(source_for_file(file), expected);
    }

    #[test]
    fn test_load_corpus_filters_extensions() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("PM1.txt"), "abstract one").unwrap();
        std::fs::write(dir.path().join("nested/guide.md"), "# Guide").unwrap();
        std::fs::write(dir.path().join("scan.pdf"), "%PDF").unwrap();
        std::fs::write(dir.path().join("blank.txt"), "  \n").unwrap();

        let docs = load_corpus(dir.path()).unwrap();
        let paths: Vec<&str> = docs.iter().map(|d| d.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["PM1.txt", "nested/guide.md"]);
        assert_eq!(docs[0].source, "https://pubmed.ncbi.nlm.nih.gov/1/");
    }

    #[test]
    fn test_missing_corpus_is_no_documents() {
        let dir = TempDir::new().unwrap();
        let result = load_corpus(&dir.path().join("absent"));
        assert!(matches!(result, Err(AppError::NoDocuments(_))));
    }
}
