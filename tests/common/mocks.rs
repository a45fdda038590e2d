//! Scripted doubles shared by the integration tests.
//!
//! - [`ScriptedLLM`] answers by matching needles against the system and user
//!   prompt, recording every prompt it sees
//! - [`KeywordEmbedder`] embeds text as a keyword-presence vector
//! - [`MockSearch`] / [`MockScraper`] serve canned search hits and pages

#![allow(dead_code)]

use analyst::llm::LLMClient;
use analyst::prompts::PromptCatalog;
use analyst::rag::{ContextCompressor, Embedder, TextChunker};
use analyst::research::ResearchContext;
use analyst::sources::{EvidenceSource, SourceRegistry, WebSource};
use analyst::tools::scrape::{PageScraper, ScrapePool};
use analyst::tools::search::SearchProvider;
use analyst::types::{AppError, Result, ScrapedPage, SearchHit};
use analyst::utils::toml_config::ResearchConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============= Language model =============

struct Rule {
    needles: Vec<String>,
    reply: std::result::Result<String, String>,
}

/// Language model answering from a list of rules; the first rule whose
/// needles all occur in `system + prompt` wins.
#[derive(Default)]
pub struct ScriptedLLM {
    rules: Vec<Rule>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needles: &[&str], reply: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Ok(reply.to_string()),
        });
        self
    }

    pub fn fail_on(mut self, needles: &[&str]) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Err("scripted failure".to_string()),
        });
        self
    }

    /// `(system, prompt)` pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(_, prompt)| prompt)
            .filter(|p| p.contains(needle))
            .collect()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .push((system.to_string(), prompt.to_string()));
        let haystack = format!("{}\n{}", system, prompt);

        let rule = self
            .rules
            .iter()
            .find(|r| r.needles.iter().all(|n| haystack.contains(n.as_str())));
        match rule {
            Some(Rule { reply: Ok(reply), .. }) => Ok(reply.clone()),
            Some(Rule { reply: Err(e), .. }) => Err(AppError::LLM(e.clone())),
            None => Err(AppError::LLM("no scripted reply".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

// ============= Embeddings =============

/// One dimension per keyword: 1.0 when the lowercased text contains it
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts embedded so far
    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                self.vocabulary
                    .iter()
                    .map(|w| if lower.contains(w.as_str()) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

// ============= Search & scrape =============

#[derive(Default)]
pub struct MockSearch {
    results: HashMap<String, Vec<SearchHit>>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, urls: &[&str]) -> Self {
        let hits = urls
            .iter()
            .map(|url| SearchHit {
                title: url.to_string(),
                href: url.to_string(),
                body: String::new(),
            })
            .collect();
        self.results.insert(query.to_string(), hits);
        self
    }

    /// Answer `query` only after `delay`
    pub fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Queries in the order their answers were returned
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().push(query.to_string());
        if let Some(delay) = self.delays.get(query).copied() {
            tokio::time::sleep(delay).await;
        }
        self.completed.lock().push(query.to_string());
        let mut hits = self.results.get(query).cloned().unwrap_or_default();
        hits.truncate(max_results);
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Serves canned page content; unknown URLs fail like dead links
#[derive(Default)]
pub struct MockScraper {
    pages: HashMap<String, String>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, content: &str) -> Self {
        self.pages.insert(url.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl PageScraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        match self.pages.get(url) {
            Some(content) => Ok(ScrapedPage {
                url: url.to_string(),
                title: Some(format!("Title of {}", url)),
                raw_content: content.clone(),
            }),
            None => Err(AppError::SourceFetch(format!("404 for {}", url))),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ============= Wiring =============

pub fn web_source(search: Arc<MockSearch>, scraper: Arc<MockScraper>) -> Arc<dyn EvidenceSource> {
    let pool = ScrapePool::new(scraper, 20, Duration::from_secs(10), 100);
    Arc::new(WebSource::new(search, pool, 7))
}

pub fn compressor(embedder: Arc<dyn Embedder>) -> Arc<ContextCompressor> {
    let chunker = TextChunker::new(1000, 100).expect("valid chunker");
    Arc::new(ContextCompressor::new(embedder, chunker, 0.38))
}

pub fn context(
    llm: Arc<ScriptedLLM>,
    source: Arc<dyn EvidenceSource>,
    embedder: Arc<dyn Embedder>,
) -> Arc<ResearchContext> {
    Arc::new(ResearchContext::new(
        llm,
        Arc::new(PromptCatalog::builtin().expect("builtin prompts")),
        SourceRegistry::new().with(source),
        compressor(embedder),
        ResearchConfig::default(),
    ))
}

/// Pad `text` past the scrape pool's 100-character floor
pub fn article(text: &str) -> String {
    format!("{} {}", text, "Reported by field correspondents on site. ".repeat(3))
}
