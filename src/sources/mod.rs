//! Evidence sources
//!
//! An [`EvidenceSource`] turns one sub-query into raw evidence blocks. Three
//! implementations exist, selected by [`DataSource`]:
//!
//! - [`web::WebSource`] - search, deduplicate, scrape concurrently
//! - [`local::LocalStore`] - top-K similarity retrieval over a local corpus
//! - [`urls::ExplicitUrlSource`] - a fixed URL list scraped once per task
//!
//! Every source admits what it consumes through the task's
//! [`VisitedSources`](dedup::VisitedSources).

pub mod dedup;
pub mod local;
pub mod urls;
pub mod web;

pub use dedup::VisitedSources;
pub use local::LocalStore;
pub use urls::ExplicitUrlSource;
pub use web::WebSource;

use crate::rag::Embedder;
use crate::tools::scrape::ScrapePool;
use crate::types::{AppError, DataSource, Evidence, Result};
use crate::utils::toml_config::AnalystConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Produces raw evidence for one sub-query.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn fetch(&self, sub_query: &str, visited: &VisitedSources) -> Result<Vec<Evidence>>;

    fn kind(&self) -> DataSource;
}

/// Fixed registry of evidence sources keyed by [`DataSource`]
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<DataSource, Arc<dyn EvidenceSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own kind, replacing any previous one
    pub fn register(&mut self, source: Arc<dyn EvidenceSource>) {
        self.sources.insert(source.kind(), source);
    }

    pub fn with(mut self, source: Arc<dyn EvidenceSource>) -> Self {
        self.register(source);
        self
    }

    pub fn get(&self, kind: DataSource) -> Result<Arc<dyn EvidenceSource>> {
        self.sources.get(&kind).cloned().ok_or_else(|| {
            AppError::Config(format!("No evidence source configured for '{}'", kind))
        })
    }

    pub fn kinds(&self) -> Vec<DataSource> {
        self.sources.keys().copied().collect()
    }
}

fn scrape_pool(config: &AnalystConfig) -> Result<ScrapePool> {
    let timeout = Duration::from_secs(config.scrape.timeout_secs);
    let scraper = config.scrape.scraper.create(timeout)?;
    Ok(ScrapePool::new(
        scraper,
        config.scrape.workers,
        timeout,
        config.scrape.min_content_chars,
    ))
}

/// Build the evidence source for `kind` from configuration.
///
/// `urls` is only used by [`DataSource::ExplicitUrls`].
pub async fn build_source(
    kind: DataSource,
    config: &AnalystConfig,
    env: &HashMap<String, String>,
    embedder: Arc<dyn Embedder>,
    urls: &[String],
) -> Result<Arc<dyn EvidenceSource>> {
    match kind {
        DataSource::Web => {
            let api_key = if config.search.backend.requires_key() {
                match config.search.key_env() {
                    Some(name) => Some(AnalystConfig::resolve_env(env, &name)?),
                    None => None,
                }
            } else {
                None
            };
            let search = config.search.backend.create(api_key)?;
            Ok(Arc::new(WebSource::new(
                search,
                scrape_pool(config)?,
                config.search.max_results,
            )))
        }
        DataSource::LocalStore => {
            let store = LocalStore::open(&config.local_store, embedder).await?;
            Ok(Arc::new(store))
        }
        DataSource::ExplicitUrls => {
            if urls.is_empty() {
                return Err(AppError::InvalidInput(
                    "The explicit URL source needs at least one URL".to_string(),
                ));
            }
            Ok(Arc::new(ExplicitUrlSource::new(
                urls.to_vec(),
                scrape_pool(config)?,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(DataSource);

    #[async_trait]
    impl EvidenceSource for Fixed {
        async fn fetch(&self, _q: &str, _v: &VisitedSources) -> Result<Vec<Evidence>> {
            Ok(vec![])
        }

        fn kind(&self) -> DataSource {
            self.0
        }
    }

    struct Zero;

    #[async_trait]
    impl Embedder for Zero {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
        }

        fn model_name(&self) -> &str {
            "zero"
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SourceRegistry::new().with(Arc::new(Fixed(DataSource::Web)));

        assert_eq!(registry.get(DataSource::Web).unwrap().kind(), DataSource::Web);
        assert!(matches!(
            registry.get(DataSource::LocalStore),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_explicit_urls_require_a_url() {
        let config = AnalystConfig::default();
        let embedder: Arc<dyn Embedder> = Arc::new(Zero);
        let result = build_source(
            DataSource::ExplicitUrls,
            &config,
            &HashMap::new(),
            embedder,
            &[],
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
