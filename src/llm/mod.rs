//! LLM Provider Clients and Abstractions
//!
//! Every generation step of the research pipeline (persona selection,
//! sub-query planning, subtopic selection, report writing) goes through the
//! [`LLMClient`] trait. Providers are resolved once from configuration via
//! [`Provider::from_config`] and [`Provider::create_client`].
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use analyst::llm::Provider;
//!
//! let provider = Provider::from_config(&config, &env)?;
//! let client = provider.create_client().await?;
//! let reply = client.generate_with_system("You are terse.", "What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
