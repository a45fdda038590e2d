//! Persistence layer for analyst-index.
//!
//! An index directory holds two files:
//! - `{dir}/index.json` - serialized [`ChunkIndex`]
//! - `{dir}/corpus.sha` - hex SHA-256 of the corpus the index was built from

use crate::error::{Error, Result};
use crate::index::ChunkIndex;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

const INDEX_FILE: &str = "index.json";
const HASH_FILE: &str = "corpus.sha";

/// Compute the content hash of a corpus.
///
/// `files` holds `(relative_path, bytes)` pairs; they are hashed in sorted
/// path order so the result does not depend on directory traversal order.
/// Each field is prefixed with its length so file boundaries are part of
/// the digest.
pub fn corpus_hash(files: &[(String, Vec<u8>)]) -> String {
    let mut sorted: Vec<&(String, Vec<u8>)> = files.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (path, bytes) in sorted {
        hasher.update((path.len() as u64).to_le_bytes());
        hasher.update(path.as_bytes());
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}

/// Read the stored corpus hash, if any.
pub async fn read_corpus_hash(dir: &Path) -> Result<Option<String>> {
    let path = dir.join(HASH_FILE);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(None);
    }
    let hash = tokio::fs::read_to_string(&path).await?;
    Ok(Some(hash.trim().to_string()))
}

/// Save an index and the hash of the corpus it was built from.
///
/// Each file is written to a `.tmp` sibling and renamed into place. The
/// index is written before the hash so a crash in between leaves a stale
/// hash that forces a rebuild on the next run.
pub async fn save_index(dir: &Path, index: &ChunkIndex, hash: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let json = serde_json::to_string(index)
        .map_err(|e| Error::Persistence(format!("Failed to serialize index: {}", e)))?;
    write_replace(dir, INDEX_FILE, json.as_bytes()).await?;
    write_replace(dir, HASH_FILE, hash.as_bytes()).await?;

    info!(path = ?dir, chunks = index.len(), "Saved chunk index");
    Ok(())
}

async fn write_replace(dir: &Path, name: &str, contents: &[u8]) -> Result<()> {
    let tmp = dir.join(format!("{}.tmp", name));
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, dir.join(name)).await?;
    Ok(())
}

/// Load a previously saved index.
///
/// Returns `Ok(None)` when no index file exists.
pub async fn load_index(dir: &Path) -> Result<Option<ChunkIndex>> {
    let path = dir.join(INDEX_FILE);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(None);
    }

    let json = tokio::fs::read_to_string(&path).await?;
    let index: ChunkIndex = serde_json::from_str(&json)
        .map_err(|e| Error::Persistence(format!("Failed to parse index: {}", e)))?;

    debug!(path = ?dir, chunks = index.len(), "Loaded chunk index");
    Ok(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMetric;
    use crate::types::IndexedChunk;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_index() {
        let temp_dir = TempDir::new().unwrap();

        let mut index = ChunkIndex::new(DistanceMetric::Cosine);
        index
            .insert(IndexedChunk {
                source: "doc.txt".to_string(),
                title: Some("Doc".to_string()),
                text: "hello".to_string(),
                vector: vec![1.0, 0.0, 0.0],
            })
            .unwrap();

        save_index(temp_dir.path(), &index, "abc123").await.unwrap();

        let loaded = load_index(temp_dir.path()).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.chunks()[0].title.as_deref(), Some("Doc"));
        assert_eq!(
            read_corpus_hash(temp_dir.path()).await.unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn test_missing_index() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_index(temp_dir.path()).await.unwrap().is_none());
        assert!(read_corpus_hash(temp_dir.path()).await.unwrap().is_none());
    }

    #[test]
    fn test_corpus_hash_is_order_independent() {
        let a = ("a.txt".to_string(), b"alpha".to_vec());
        let b = ("b.txt".to_string(), b"beta".to_vec());
        assert_eq!(
            corpus_hash(&[a.clone(), b.clone()]),
            corpus_hash(&[b.clone(), a.clone()])
        );
        let changed = ("b.txt".to_string(), b"beta2".to_vec());
        assert_ne!(corpus_hash(&[a.clone(), b]), corpus_hash(&[a, changed]));
    }

    #[test]
    fn test_corpus_hash_keeps_file_boundaries() {
        let split = [
            ("a".to_string(), b"X".to_vec()),
            ("b".to_string(), b"Y".to_vec()),
        ];
        let merged = [("b".to_string(), b"XaY".to_vec())];
        assert_ne!(corpus_hash(&split), corpus_hash(&merged));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let index = ChunkIndex::new(DistanceMetric::Cosine);
        save_index(temp_dir.path(), &index, "first").await.unwrap();
        save_index(temp_dir.path(), &index, "second").await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["corpus.sha".to_string(), "index.json".to_string()]);
        assert_eq!(
            read_corpus_hash(temp_dir.path()).await.unwrap().as_deref(),
            Some("second")
        );
    }
}
