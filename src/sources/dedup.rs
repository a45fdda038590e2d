//! Visited-source bookkeeping for one research task lineage

use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Visited {
    order: Vec<String>,
    seen: HashSet<String>,
}

/// Append-only, ordered set of every source a task has consumed.
///
/// [`admit`](Self::admit) holds the lock for the whole call, so concurrent
/// retrieval pipelines can never admit the same source twice and a single
/// call is never observed half-applied.
#[derive(Debug, Default)]
pub struct VisitedSources {
    inner: Mutex<Visited>,
}

impl VisitedSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previously recorded sequence (duplicates are collapsed)
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let visited = Self::new();
        let sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        visited.admit(&sources);
        visited
    }

    /// Admit candidates, returning the ones never seen before in input order.
    pub fn admit(&self, candidates: &[String]) -> Vec<String> {
        let mut inner = self.inner.lock();
        let mut admitted = Vec::new();
        for candidate in candidates {
            if inner.seen.insert(candidate.clone()) {
                inner.order.push(candidate.clone());
                admitted.push(candidate.clone());
            }
        }
        admitted
    }

    pub fn contains(&self, source: &str) -> bool {
        self.inner.lock().seen.contains(source)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the visitation order
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_admit_preserves_order_and_filters_seen() {
        let visited = VisitedSources::from_sources(["https://a"]);
        let admitted = visited.admit(&strings(&["https://c", "https://a", "https://b"]));

        assert_eq!(admitted, strings(&["https://c", "https://b"]));
        assert_eq!(
            visited.snapshot(),
            strings(&["https://a", "https://c", "https://b"])
        );
    }

    #[test]
    fn test_admit_is_idempotent() {
        let visited = VisitedSources::new();
        let batch = strings(&["x", "y", "x", "z"]);

        assert_eq!(visited.admit(&batch), strings(&["x", "y", "z"]));
        assert_eq!(visited.len(), 3);
        assert!(visited.admit(&batch).is_empty());
        assert_eq!(visited.len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let visited = VisitedSources::new();
        assert!(visited.admit(&[]).is_empty());
        assert!(visited.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admission_single_winner() {
        let visited = Arc::new(VisitedSources::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let visited = Arc::clone(&visited);
            handles.push(tokio::spawn(async move {
                visited.admit(&["https://same".to_string()])
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if !handle.await.unwrap().is_empty() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(visited.snapshot(), vec!["https://same".to_string()]);
    }
}
