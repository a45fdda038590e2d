//! Web evidence: search, deduplicate, scrape

use super::{EvidenceSource, VisitedSources};
use crate::tools::scrape::ScrapePool;
use crate::tools::search::SearchProvider;
use crate::types::{DataSource, Evidence, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct WebSource {
    search: Arc<dyn SearchProvider>,
    pool: ScrapePool,
    max_results: usize,
}

impl WebSource {
    pub fn new(search: Arc<dyn SearchProvider>, pool: ScrapePool, max_results: usize) -> Self {
        Self {
            search,
            pool,
            max_results,
        }
    }
}

#[async_trait]
impl EvidenceSource for WebSource {
    async fn fetch(&self, sub_query: &str, visited: &VisitedSources) -> Result<Vec<Evidence>> {
        let hits = match self.search.search(sub_query, self.max_results).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(sub_query, error = %e, "Search failed, continuing without evidence");
                return Ok(Vec::new());
            }
        };

        let candidates: Vec<String> = hits.into_iter().map(|hit| hit.href).collect();
        let new_urls = visited.admit(&candidates);
        debug!(
            sub_query,
            candidates = candidates.len(),
            new = new_urls.len(),
            backend = self.search.name(),
            "Admitted search results"
        );
        if new_urls.is_empty() {
            return Ok(Vec::new());
        }

        let pages = self.pool.scrape_all(&new_urls).await;
        if pages.is_empty() {
            warn!(sub_query, urls = new_urls.len(), "No page yielded content");
        }
        Ok(pages.into_iter().map(Evidence::from).collect())
    }

    fn kind(&self) -> DataSource {
        DataSource::Web
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::scrape::PageScraper;
    use crate::tools::search::MockSearchProvider;
    use crate::types::{AppError, ScrapedPage, SearchHit};
    use std::time::Duration;

    struct EchoScraper;

    #[async_trait]
    impl PageScraper for EchoScraper {
        async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
            if url.contains("dead") {
                return Err(AppError::SourceFetch("404".into()));
            }
            Ok(ScrapedPage {
                url: url.to_string(),
                title: Some(url.to_string()),
                raw_content: format!("{} ", url).repeat(20),
            })
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn hit(href: &str) -> SearchHit {
        SearchHit {
            title: href.to_string(),
            href: href.to_string(),
            body: String::new(),
        }
    }

    fn source(search: MockSearchProvider) -> WebSource {
        let pool = ScrapePool::new(Arc::new(EchoScraper), 20, Duration::from_secs(10), 100);
        WebSource::new(Arc::new(search), pool, 7)
    }

    #[tokio::test]
    async fn test_fetch_skips_visited_and_dead_links() {
        let mut search = MockSearchProvider::new();
        search
            .expect_search()
            .returning(|_, _| Ok(vec![hit("https://seen"), hit("https://dead"), hit("https://new")]));
        search.expect_name().return_const("mock");

        let visited = VisitedSources::from_sources(["https://seen"]);
        let evidence = source(search).fetch("floods", &visited).await.unwrap();

        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].source, "https://new");
        assert_eq!(
            visited.snapshot(),
            vec!["https://seen", "https://dead", "https://new"]
        );
    }

    #[tokio::test]
    async fn test_search_failure_is_empty_evidence() {
        let mut search = MockSearchProvider::new();
        search
            .expect_search()
            .returning(|_, _| Err(AppError::SourceFetch("rate limited".into())));
        search.expect_name().return_const("mock");

        let visited = VisitedSources::new();
        let evidence = source(search).fetch("floods", &visited).await.unwrap();
        assert!(evidence.is_empty());
        assert!(visited.is_empty());
    }
}
