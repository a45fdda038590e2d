//! Integration tests for the local corpus store and its cached index.

mod common;

use analyst::sources::local::IndexStatus;
use analyst::sources::{EvidenceSource, LocalStore, VisitedSources};
use analyst::types::AppError;
use analyst::utils::toml_config::LocalStoreConfig;
use common::mocks::KeywordEmbedder;
use std::sync::Arc;
use tempfile::TempDir;

const VOCABULARY: &[&str] = &["microbiome", "sleep", "insulin", "exercise"];

struct Corpus {
    _dir: TempDir,
    config: LocalStoreConfig,
}

fn corpus(files: &[(&str, &str)]) -> Corpus {
    let dir = TempDir::new().unwrap();
    let corpus_dir = dir.path().join("corpus");
    std::fs::create_dir_all(&corpus_dir).unwrap();
    for (name, content) in files {
        std::fs::write(corpus_dir.join(name), content).unwrap();
    }
    let config = LocalStoreConfig {
        corpus_dir,
        cache_dir: dir.path().join("cache"),
        top_k: 6,
        chunk_size: 1000,
        chunk_overlap: 0,
    };
    Corpus { _dir: dir, config }
}

fn default_corpus() -> Corpus {
    corpus(&[
        ("PM101.txt", "Gut microbiome diversity shifts with sleep duration."),
        ("PMC202.txt", "Insulin sensitivity improves after exercise."),
        ("notes.md", "# Notes\n\nSleep hygiene and exercise timing."),
    ])
}

#[tokio::test]
async fn test_unchanged_corpus_reuses_cached_index() {
    let corpus = default_corpus();
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));

    let first = LocalStore::open(&corpus.config, embedder.clone()).await.unwrap();
    let embedded_by_build = embedder.texts_embedded();
    assert_eq!(embedded_by_build, 3);

    let second = LocalStore::open(&corpus.config, embedder.clone()).await.unwrap();
    assert_eq!(embedder.texts_embedded(), embedded_by_build);
    assert_eq!(second.refresh().await.unwrap(), IndexStatus::Cached { chunks: 3 });

    let visited = VisitedSources::new();
    let a = first.fetch("microbiome and sleep", &visited).await.unwrap();
    let b = second.fetch("microbiome and sleep", &visited).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a[0].source, "https://pubmed.ncbi.nlm.nih.gov/101/");
}

#[tokio::test]
async fn test_changed_corpus_rebuilds() {
    let corpus = default_corpus();
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));

    let store = LocalStore::open(&corpus.config, embedder.clone()).await.unwrap();
    std::fs::write(
        corpus.config.corpus_dir.join("PM303.txt"),
        "Exercise and insulin in older adults.",
    )
    .unwrap();

    assert_eq!(store.refresh().await.unwrap(), IndexStatus::Rebuilt { chunks: 4 });
    assert_eq!(store.len(), 4);
    assert_eq!(embedder.texts_embedded(), 3 + 4);
}

#[tokio::test]
async fn test_fetch_records_sources_without_dropping_chunks() {
    let corpus = default_corpus();
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let store = LocalStore::open(&corpus.config, embedder).await.unwrap();

    let visited = VisitedSources::new();
    let first = store.fetch("insulin exercise", &visited).await.unwrap();
    let second = store.fetch("insulin exercise", &visited).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(first[0].source, "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC202/");
    assert_eq!(visited.len(), 3);
}

#[tokio::test]
async fn test_empty_corpus_is_no_documents() {
    let corpus = corpus(&[("image.png", "binary")]);
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));

    let result = LocalStore::open(&corpus.config, embedder).await;
    assert!(matches!(result, Err(AppError::NoDocuments(_))));
}
