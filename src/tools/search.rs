//! Web search backends
//!
//! - **DuckDuckGo** via daedra (keyless, default)
//! - **Tavily** search API
//! - **Serper** Google search API
//!
//! Keyed backends fall back to DuckDuckGo when their API call fails. All
//! backends drop YouTube results, which never scrape into useful text.

use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Search capability returning `{title, href, body}` records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, returning at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

fn drop_youtube(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    hits.into_iter()
        .filter(|hit| !hit.href.contains("youtube.com"))
        .collect()
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

// ============= Backend Registry =============

/// Configured search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    #[default]
    DuckDuckGo,
    Tavily,
    Serper,
}

impl SearchBackend {
    pub fn requires_key(&self) -> bool {
        !matches!(self, SearchBackend::DuckDuckGo)
    }

    /// Conventional environment variable for the backend's API key
    pub fn default_key_env(&self) -> Option<&'static str> {
        match self {
            SearchBackend::DuckDuckGo => None,
            SearchBackend::Tavily => Some("TAVILY_API_KEY"),
            SearchBackend::Serper => Some("SERPER_API_KEY"),
        }
    }

    /// Build the provider; keyed backends need `api_key`
    pub fn create(&self, api_key: Option<String>) -> Result<Arc<dyn SearchProvider>> {
        let require_key = |key: Option<String>| {
            key.filter(|k| !k.is_empty()).ok_or_else(|| {
                AppError::Config(format!("Search backend '{}' requires an API key", self))
            })
        };

        match self {
            SearchBackend::DuckDuckGo => Ok(Arc::new(DuckDuckGoSearch)),
            SearchBackend::Tavily => Ok(Arc::new(TavilySearch::new(
                require_key(api_key)?,
                TAVILY_ENDPOINT.to_string(),
                Arc::new(DuckDuckGoSearch),
            )?)),
            SearchBackend::Serper => Ok(Arc::new(SerperSearch::new(
                require_key(api_key)?,
                SERPER_ENDPOINT.to_string(),
                Arc::new(DuckDuckGoSearch),
            )?)),
        }
    }
}

impl fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchBackend::DuckDuckGo => "duckduckgo",
            SearchBackend::Tavily => "tavily",
            SearchBackend::Serper => "serper",
        };
        f.write_str(name)
    }
}

impl FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(SearchBackend::DuckDuckGo),
            "tavily" => Ok(SearchBackend::Tavily),
            "serper" => Ok(SearchBackend::Serper),
            other => Err(format!("Unknown search backend: {}", other)),
        }
    }
}

// ============= DuckDuckGo =============

/// DuckDuckGo search powered by daedra
pub struct DuckDuckGoSearch;

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::SourceFetch(format!("DuckDuckGo search failed: {}", e)))?;

        let hits = response
            .data
            .iter()
            .map(|r| SearchHit {
                title: r.title.clone(),
                href: r.url.clone(),
                body: r.description.clone(),
            })
            .collect();

        Ok(drop_youtube(hits))
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

// ============= Tavily =============

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily search API client
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    fallback: Arc<dyn SearchProvider>,
}

impl TavilySearch {
    pub fn new(
        api_key: String,
        endpoint: String,
        fallback: Arc<dyn SearchProvider>,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            endpoint,
            fallback,
        })
    }

    async fn query(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response: TavilyResponse = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "search_depth": "advanced",
                "max_results": max_results,
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::SourceFetch(format!("Tavily request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::SourceFetch(format!("Tavily response invalid: {}", e)))?;

        Ok(response
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                href: r.url,
                body: r.content,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        match self.query(query, max_results).await {
            Ok(hits) => Ok(drop_youtube(hits)),
            Err(e) => {
                warn!(error = %e, fallback = self.fallback.name(), "Tavily search failed, falling back");
                self.fallback.search(query, max_results).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "tavily"
    }
}

// ============= Serper =============

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Deserialize)]
struct SerperResult {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Serper (Google) search API client
pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    fallback: Arc<dyn SearchProvider>,
}

impl SerperSearch {
    pub fn new(
        api_key: String,
        endpoint: String,
        fallback: Arc<dyn SearchProvider>,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            endpoint,
            fallback,
        })
    }

    async fn query(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response: SerperResponse = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": max_results }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::SourceFetch(format!("Serper request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::SourceFetch(format!("Serper response invalid: {}", e)))?;

        Ok(response
            .organic
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                href: r.link,
                body: r.snippet,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        match self.query(query, max_results).await {
            Ok(hits) => Ok(drop_youtube(hits)),
            Err(e) => {
                warn!(error = %e, fallback = self.fallback.name(), "Serper search failed, falling back");
                self.fallback.search(query, max_results).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "serper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hit(href: &str) -> SearchHit {
        SearchHit {
            title: "fallback".to_string(),
            href: href.to_string(),
            body: String::new(),
        }
    }

    fn unused_fallback() -> Arc<dyn SearchProvider> {
        let mut fallback = MockSearchProvider::new();
        fallback.expect_search().never();
        fallback.expect_name().return_const("mock");
        Arc::new(fallback)
    }

    #[tokio::test]
    async fn test_serper_parses_organic_and_drops_youtube() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "secret"))
            .and(body_partial_json(json!({"q": "burning man", "num": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic": [
                    {"title": "News", "link": "https://news.example/a", "snippet": "mud"},
                    {"title": "Video", "link": "https://www.youtube.com/watch?v=1", "snippet": "vid"}
                ]
            })))
            .mount(&server)
            .await;

        let serper = SerperSearch::new(
            "secret".to_string(),
            format!("{}/search", server.uri()),
            unused_fallback(),
        )
        .unwrap();

        let hits = serper.search("burning man", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].href, "https://news.example/a");
        assert_eq!(hits[0].body, "mud");
    }

    #[tokio::test]
    async fn test_tavily_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({"api_key": "tv", "search_depth": "advanced"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"title": "T", "url": "https://t.example", "content": "body"}]
            })))
            .mount(&server)
            .await;

        let tavily = TavilySearch::new(
            "tv".to_string(),
            format!("{}/search", server.uri()),
            unused_fallback(),
        )
        .unwrap();

        let hits = tavily.search("floods", 5).await.unwrap();
        assert_eq!(
            hits,
            vec![SearchHit {
                title: "T".to_string(),
                href: "https://t.example".to_string(),
                body: "body".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_tavily_falls_back_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut fallback = MockSearchProvider::new();
        fallback
            .expect_search()
            .withf(|query, max| query == "floods" && *max == 5)
            .times(1)
            .returning(|_, _| Ok(vec![hit("https://ddg.example")]));
        fallback.expect_name().return_const("mock");

        let tavily =
            TavilySearch::new("tv".to_string(), server.uri(), Arc::new(fallback)).unwrap();

        let hits = tavily.search("floods", 5).await.unwrap();
        assert_eq!(hits, vec![hit("https://ddg.example")]);
    }

    #[test]
    fn test_backend_registry() {
        assert_eq!("ddg".parse::<SearchBackend>().unwrap(), SearchBackend::DuckDuckGo);
        assert_eq!(SearchBackend::Serper.to_string(), "serper");
        assert!(SearchBackend::Tavily.requires_key());
        assert!(SearchBackend::Tavily.create(None).is_err());
        assert_eq!(
            SearchBackend::DuckDuckGo.create(None).unwrap().name(),
            "duckduckgo"
        );
    }
}
