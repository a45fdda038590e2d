//! Page scrapers and the bounded scrape pool
//!
//! [`PageScraper`] fetches one URL; [`ScrapePool`] fans a batch of URLs out
//! over a fixed number of concurrent fetches, each with a timeout. Any failure,
//! timeout, or page shorter than the content floor is reported as "no content"
//! and dropped from the batch.

use crate::types::{AppError, Result, ScrapedPage};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Fetches the textual content of one URL.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage>;

    fn name(&self) -> &'static str;
}

fn is_pdf(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .map(|path| path.to_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

// ============= Scraper Registry =============

/// Configured scraper implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScraperKind {
    /// Plain HTTP GET with HTML text extraction
    #[default]
    Html,
    /// daedra page reader (Markdown conversion)
    Reader,
}

impl ScraperKind {
    pub fn create(&self, timeout: Duration) -> Result<Arc<dyn PageScraper>> {
        match self {
            ScraperKind::Html => Ok(Arc::new(HtmlScraper::new(timeout)?)),
            ScraperKind::Reader => Ok(Arc::new(ReaderScraper)),
        }
    }
}

impl fmt::Display for ScraperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScraperKind::Html => f.write_str("html"),
            ScraperKind::Reader => f.write_str("reader"),
        }
    }
}

// ============= HTML =============

/// Fetches HTML with reqwest and extracts visible text with scraper
pub struct HtmlScraper {
    client: reqwest::Client,
}

impl HtmlScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("research-analyst/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "br" | "li" | "ul" | "ol" | "tr" | "td" | "th" | "table"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "section" | "article"
            | "header" | "footer" | "nav" | "aside" | "main" | "blockquote"
            | "pre" | "hr" | "dd" | "dt" | "figcaption"
    )
}

/// Extract the title and visible text of an HTML document.
///
/// Script, style and noscript contents are skipped. Block elements start a
/// new line; runs of blank lines collapse into one line break.
pub fn extract_text(html: &str) -> Result<(Option<String>, String)> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title")
        .map_err(|e| AppError::Internal(format!("Invalid selector: {}", e)))?;
    let body_selector = Selector::parse("body")
        .map_err(|e| AppError::Internal(format!("Invalid selector: {}", e)))?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut pieces: Vec<&str> = Vec::new();
    if let Some(body) = document.select(&body_selector).next() {
        for node in body.descendants() {
            if let Some(element) = node.value().as_element() {
                if is_block(element.name()) {
                    pieces.push("\n");
                }
                continue;
            }
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .map(|name| matches!(name, "script" | "style" | "noscript"))
                .unwrap_or(false);
            if hidden {
                continue;
            }
            let after_block = node
                .prev_sibling()
                .and_then(|p| p.value().as_element().map(|e| is_block(e.name())))
                .unwrap_or(false);
            if after_block {
                pieces.push("\n");
            }
            pieces.push(text);
        }
    }

    let joined = pieces.concat();
    let text = joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok((title, text))
}

#[async_trait]
impl PageScraper for HtmlScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        if is_pdf(url) {
            return Err(AppError::SourceFetch(format!("PDF not supported: {}", url)));
        }

        let html = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::SourceFetch(format!("GET {} failed: {}", url, e)))?
            .text()
            .await
            .map_err(|e| AppError::SourceFetch(format!("Reading {} failed: {}", url, e)))?;

        let (title, raw_content) = extract_text(&html)?;
        Ok(ScrapedPage {
            url: url.to_string(),
            title,
            raw_content,
        })
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

// ============= Reader =============

/// Page reader powered by daedra
pub struct ReaderScraper;

#[async_trait]
impl PageScraper for ReaderScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        if is_pdf(url) {
            return Err(AppError::SourceFetch(format!("PDF not supported: {}", url)));
        }

        let fetch_args = daedra::VisitPageArgs {
            url: url.to_string(),
            include_images: false,
            selector: None,
        };

        let page = daedra::tools::fetch::fetch_page(&fetch_args)
            .await
            .map_err(|e| AppError::SourceFetch(format!("Failed to fetch page: {}", e)))?;

        Ok(ScrapedPage {
            url: url.to_string(),
            title: Some(page.title).filter(|t| !t.is_empty()),
            raw_content: page.content,
        })
    }

    fn name(&self) -> &'static str {
        "reader"
    }
}

// ============= Scrape Pool =============

/// Bounded concurrent scraping
///
/// Clones share one semaphore, so concurrent `scrape_all` calls from sibling
/// sub-queries together never exceed `workers` in-flight fetches.
#[derive(Clone)]
pub struct ScrapePool {
    scraper: Arc<dyn PageScraper>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    min_content_chars: usize,
}

impl ScrapePool {
    pub fn new(
        scraper: Arc<dyn PageScraper>,
        workers: usize,
        timeout: Duration,
        min_content_chars: usize,
    ) -> Self {
        Self {
            scraper,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
            min_content_chars,
        }
    }

    /// Scrape every URL, returning pages with content in input order.
    ///
    /// Never fails: dead links, timeouts, and short pages are dropped.
    pub async fn scrape_all(&self, urls: &[String]) -> Vec<ScrapedPage> {
        let mut set = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let url = url.clone();
            let scraper = Arc::clone(&self.scraper);
            let semaphore = Arc::clone(&self.permits);
            let timeout = self.timeout;

            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (index, url, Err(AppError::Internal("scrape pool closed".into())))
                    }
                };
                let result = match tokio::time::timeout(timeout, scraper.scrape(&url)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::SourceFetch(format!(
                        "timed out after {}s",
                        timeout.as_secs()
                    ))),
                };
                (index, url, result)
            });
        }

        let mut slots: Vec<Option<ScrapedPage>> = vec![None; urls.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, _, Ok(page))) if page.raw_content.chars().count() >= self.min_content_chars => {
                    slots[index] = Some(page);
                }
                Ok((_, url, Ok(_))) => {
                    debug!(url = %url, "Dropping page with too little content");
                }
                Ok((_, url, Err(e))) => {
                    warn!(url = %url, error = %e, "Scrape failed, treating as no content");
                }
                Err(e) => {
                    warn!(error = %e, "Scrape task panicked or was cancelled");
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}
