//! # Research Analyst
//!
//! Automated open-ended research: given a topic, plan sub-queries, gather
//! evidence from the web, a local document corpus or a fixed URL list,
//! deduplicate and compress it into relevant passages, and assemble a
//! structured Markdown report.
//!
//! ## Overview
//!
//! The crate can be used in two ways:
//!
//! 1. **As a CLI** - run the `analyst` binary
//! 2. **As a library** - drive the research pipeline from your own code
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use analyst::research::{ResearchContext, ResearchOrchestrator, ResearchState};
//! use analyst::report::ReportAssembler;
//! use analyst::types::DataSource;
//! use analyst::utils::toml_config::AnalystConfig;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> analyst::Result<()> {
//!     let env: HashMap<String, String> = std::env::vars().collect();
//!     let config = AnalystConfig::load(None, &env)?;
//!     let ctx = Arc::new(ResearchContext::from_config(&config, &env, DataSource::Web, &[]).await?);
//!
//!     let state = ResearchState::new("latest burning man floods")?;
//!     let mut researched = ResearchOrchestrator::new(Arc::clone(&ctx)).conduct(&state).await?;
//!     researched.report_body = ReportAssembler::new(ctx).write(&researched).await?;
//!     println!("{}", researched.report_body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama chat and embeddings (default) |
//! | `openai` | OpenAI-compatible chat API |
//! | `local-embeddings` | In-process embeddings via fastembed |
//!
//! ## Modules
//!
//! - [`types`] - Shared records and the crate error type
//! - [`utils`] - Typed configuration and structured-output recovery
//! - [`llm`] - Language-model capability and providers
//! - [`prompts`] - The prompt catalog
//! - [`rag`] - Chunking, embeddings, embedding cache, context compression
//! - [`tools`] - Search backends and page scrapers
//! - [`sources`] - Deduplication and evidence sources
//! - [`research`] - Research state, orchestrator, detailed-report coordinator
//! - [`report`] - Report writing, outline, references, publishing
//! - [`cli`] - Command-line parsing and terminal output

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line parsing and colored output.
pub mod cli;
/// Language-model clients.
pub mod llm;
/// Named prompt templates.
pub mod prompts;
/// Chunking, embeddings and context compression.
pub mod rag;
/// Report assembly and publishing.
pub mod report;
/// Research orchestration.
pub mod research;
/// Evidence sources and source deduplication.
pub mod sources;
/// Search backends and scrapers.
pub mod tools;
/// Core types and errors.
pub mod types;
/// Configuration and structured-output helpers.
pub mod utils;

pub use llm::{LLMClient, Provider};
pub use prompts::PromptCatalog;
pub use rag::ContextCompressor;
pub use report::{Publisher, ReportAssembler};
pub use research::{DetailedReportCoordinator, ResearchContext, ResearchOrchestrator, ResearchState};
pub use sources::{EvidenceSource, SourceRegistry, VisitedSources};
pub use types::{AppError, DataSource, ReportVariant, Result};
pub use utils::toml_config::{load_config, AnalystConfig};
