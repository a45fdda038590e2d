//! Caller-supplied URL list

use super::{EvidenceSource, VisitedSources};
use crate::tools::scrape::ScrapePool;
use crate::types::{DataSource, Evidence, Result};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

/// Scrapes a fixed URL list once, then serves the same pages to every sub-query.
///
/// The context compressor does the per-query filtering.
pub struct ExplicitUrlSource {
    urls: Vec<String>,
    pool: ScrapePool,
    pages: OnceCell<Vec<Evidence>>,
}

impl ExplicitUrlSource {
    pub fn new(urls: Vec<String>, pool: ScrapePool) -> Self {
        Self {
            urls,
            pool,
            pages: OnceCell::new(),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

#[async_trait]
impl EvidenceSource for ExplicitUrlSource {
    async fn fetch(&self, _sub_query: &str, visited: &VisitedSources) -> Result<Vec<Evidence>> {
        let pages = self
            .pages
            .get_or_init(|| async {
                let new_urls = visited.admit(&self.urls);
                let pages = self.pool.scrape_all(&new_urls).await;
                info!(
                    requested = self.urls.len(),
                    scraped = pages.len(),
                    "Scraped explicit URLs"
                );
                pages.into_iter().map(Evidence::from).collect()
            })
            .await;
        Ok(pages.clone())
    }

    fn kind(&self) -> DataSource {
        DataSource::ExplicitUrls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::scrape::PageScraper;
    use crate::types::ScrapedPage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingScraper {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageScraper for CountingScraper {
        async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ScrapedPage {
                url: url.to_string(),
                title: None,
                raw_content: "long enough content ".repeat(10),
            })
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_urls_scraped_once_across_sub_queries() {
        let scraper = Arc::new(CountingScraper::default());
        let pool = ScrapePool::new(scraper.clone(), 4, Duration::from_secs(10), 100);
        let source = ExplicitUrlSource::new(
            vec!["https://a.example".into(), "https://b.example".into()],
            pool,
        );
        let visited = VisitedSources::new();

        let first = source.fetch("flood deaths", &visited).await.unwrap();
        let second = source.fetch("evacuation", &visited).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 2);
        assert_eq!(visited.len(), 2);
    }
}
