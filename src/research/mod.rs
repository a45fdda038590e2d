//! Research orchestration
//!
//! # Architecture
//!
//! - [`ResearchState`] - the copyable, persistable record of one task
//! - [`ResearchOrchestrator`] - one pass: persona, sub-queries, concurrent
//!   evidence gathering
//! - [`DetailedReportCoordinator`] - a primary pass plus one pass and one
//!   written section per derived subtopic, stitched into a final document
//!
//! Both run against a shared [`ResearchContext`] holding the resolved
//! capabilities (language model, prompts, evidence sources, compressor).
//!
//! # Usage
//!
//! ```ignore
//! use analyst::research::{ResearchContext, ResearchOrchestrator, ResearchState};
//! use std::sync::Arc;
//!
//! let ctx = Arc::new(ResearchContext::from_config(&config, &env, DataSource::Web, &[]).await?);
//! let state = ResearchState::new("latest burning man floods")?;
//! let researched = ResearchOrchestrator::new(ctx).conduct(&state).await?;
//! for finding in &researched.findings {
//!     println!("{}", finding);
//! }
//! ```

pub mod coordinator;
pub mod orchestrator;
pub mod state;

pub use coordinator::DetailedReportCoordinator;
pub use orchestrator::{Phase, ResearchOrchestrator};
pub use state::ResearchState;

use crate::llm::{LLMClient, Provider};
use crate::prompts::PromptCatalog;
use crate::rag::{create_embedder, CachedEmbedder, ContextCompressor, Embedder, TextChunker};
use crate::sources::{build_source, SourceRegistry};
use crate::types::{DataSource, Result};
use crate::utils::toml_config::{AnalystConfig, ResearchConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Capabilities shared by every pass of a research run
pub struct ResearchContext {
    pub llm: Arc<dyn LLMClient>,
    pub prompts: Arc<PromptCatalog>,
    pub sources: SourceRegistry,
    pub compressor: Arc<ContextCompressor>,
    pub settings: ResearchConfig,
}

impl ResearchContext {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        prompts: Arc<PromptCatalog>,
        sources: SourceRegistry,
        compressor: Arc<ContextCompressor>,
        settings: ResearchConfig,
    ) -> Self {
        Self {
            llm,
            prompts,
            sources,
            compressor,
            settings,
        }
    }

    /// Resolve every capability from configuration.
    ///
    /// Only the evidence source for `data_source` is built; `urls` feeds the
    /// explicit URL source.
    pub async fn from_config(
        config: &AnalystConfig,
        env: &HashMap<String, String>,
        data_source: DataSource,
        urls: &[String],
    ) -> Result<Self> {
        let provider = Provider::from_config(config, env)?;
        let llm: Arc<dyn LLMClient> = Arc::from(provider.create_client().await?);
        let prompts = Arc::new(PromptCatalog::load(config.prompts.path.as_deref())?);

        let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
            create_embedder(&config.embeddings)?,
            config.research.embedding_cache_entries,
        ));
        let chunker = TextChunker::new(config.research.chunk_size, config.research.chunk_overlap)?;
        let compressor = Arc::new(ContextCompressor::new(
            Arc::clone(&embedder),
            chunker,
            config.research.similarity_threshold,
        ));

        let source = build_source(data_source, config, env, embedder, urls).await?;
        let sources = SourceRegistry::new().with(source);

        info!(
            provider = provider.name(),
            model = llm.model_name(),
            source = %data_source,
            prompts = prompts.len(),
            "Research context ready"
        );

        Ok(Self::new(llm, prompts, sources, compressor, config.research.clone()))
    }
}
