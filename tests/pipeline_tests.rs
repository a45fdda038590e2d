//! Integration tests for deduplication, state persistence and compression.

mod common;

use analyst::rag::{CachedEmbedder, Embedder};
use analyst::research::ResearchState;
use analyst::sources::VisitedSources;
use analyst::types::{DataSource, Evidence, ReportVariant};
use common::mocks::{compressor, KeywordEmbedder};
use rstest::rstest;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[rstest]
#[case(&[])]
#[case(&["a"])]
#[case(&["a", "b", "a", "c", "b"])]
#[case(&["https://x/1", "https://x/2", "https://x/3"])]
fn test_admit_twice_yields_nothing(#[case] batch: &[&str]) {
    let visited = VisitedSources::new();
    let batch = strings(batch);
    let distinct: HashSet<&String> = batch.iter().collect();

    let first = visited.admit(&batch);
    assert_eq!(first.len(), distinct.len());
    assert_eq!(visited.len(), distinct.len());

    assert!(visited.admit(&batch).is_empty());
    assert_eq!(visited.len(), distinct.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_never_double_admit() {
    let visited = Arc::new(VisitedSources::new());
    let mut handles = Vec::new();
    for worker in 0..8 {
        let visited = Arc::clone(&visited);
        handles.push(tokio::spawn(async move {
            let batch: Vec<String> = (0..50)
                .map(|i| format!("https://shared/{}", (i + worker * 7) % 60))
                .collect();
            visited.admit(&batch)
        }));
    }

    let mut admitted = Vec::new();
    for handle in handles {
        admitted.extend(handle.await.unwrap());
    }
    let distinct: HashSet<&String> = admitted.iter().collect();
    assert_eq!(distinct.len(), admitted.len());
    assert_eq!(admitted.len(), visited.len());
}

#[tokio::test]
async fn test_state_checkpoint_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    let mut state = ResearchState::new("gut microbiome and sleep")
        .unwrap()
        .with_variant(ReportVariant::Outline)
        .with_data_source(DataSource::ExplicitUrls);
    state.visited_sources = strings(&["https://a", "https://b"]);
    state.findings = strings(&["Source: https://a\nTitle: \nContent: sleep\n"]);

    state.dump(&path).await.unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"reportVariant\": \"outline\""));
    assert!(raw.contains("\"dataSource\": \"explicit_urls\""));
    assert!(raw.contains("\"reportHeadings\": []"));

    assert_eq!(ResearchState::load(&path).await.unwrap(), state);
}

#[tokio::test]
async fn test_repeated_compression_hits_embedding_cache() {
    let keyword = Arc::new(KeywordEmbedder::new(&["flood", "evacuation"]));
    let cached: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(keyword.clone(), 128));
    let compressor = compressor(cached);

    let pages = vec![
        Evidence {
            source: "https://a".into(),
            title: None,
            content: "Flood waters closed the roads.".into(),
        },
        Evidence {
            source: "https://b".into(),
            title: None,
            content: "Evacuation started on Monday.".into(),
        },
    ];

    let floods = compressor.compress("flood", &pages, 8).await.unwrap();
    assert_eq!(floods.sources, vec!["https://a"]);
    let embedded = keyword.texts_embedded();

    let evacuation = compressor.compress("evacuation", &pages, 8).await.unwrap();
    assert_eq!(evacuation.sources, vec!["https://b"]);
    // only the new query needed embedding
    assert_eq!(keyword.texts_embedded(), embedded + 1);
}
