//! TOML-based configuration for the research analyst
//!
//! Configuration is declared in a TOML file (`analyst.toml`), then overlaid
//! with `ANALYST_*` environment variables. Loading is a pure function of the
//! file contents and an environment map, see [`load_config`], so tests never
//! touch the process environment.
//!
//! Every section is optional; an empty file yields the defaults.

use crate::tools::scrape::ScraperKind;
use crate::tools::search::SearchBackend;
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from analyst.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystConfig {
    /// Chat model used for every generation step
    #[serde(default)]
    pub llm: ProviderConfig,

    /// Embedding model used for compression and the local store
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub local_store: LocalStoreConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_tokens() -> u32 {
    3000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

impl ProviderConfig {
    /// Model identifier regardless of provider
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Ollama { model, .. } | ProviderConfig::OpenAI { model, .. } => model,
        }
    }

    fn set_model(&mut self, value: String) {
        match self {
            ProviderConfig::Ollama { model, .. } | ProviderConfig::OpenAI { model, .. } => {
                *model = value
            }
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    /// Remote embeddings served by Ollama
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_embedding_model")]
        model: String,
    },
    /// In-process ONNX embeddings (requires the `local-embeddings` feature)
    FastEmbed {
        #[serde(default = "default_fastembed_model")]
        model: String,
    },
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_fastembed_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_embedding_model(),
        }
    }
}

// ============= Search & Scrape Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub backend: SearchBackend,

    /// Maximum number of results requested per sub-query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Environment variable holding the backend API key (Tavily, Serper)
    pub api_key_env: Option<String>,
}

fn default_max_results() -> usize {
    7
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            max_results: default_max_results(),
            api_key_env: None,
        }
    }
}

impl SearchConfig {
    /// API key env var for the backend, falling back to the conventional name
    pub fn key_env(&self) -> Option<String> {
        self.api_key_env
            .clone()
            .or_else(|| self.backend.default_key_env().map(str::to_string))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub scraper: ScraperKind,

    /// Concurrent page fetches per batch
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// Pages shorter than this are treated as having no content
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
}

fn default_workers() -> usize {
    20
}

fn default_scrape_timeout() -> u64 {
    10
}

fn default_min_content_chars() -> usize {
    100
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperKind::default(),
            workers: default_workers(),
            timeout_secs: default_scrape_timeout(),
            min_content_chars: default_min_content_chars(),
        }
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Number of sub-queries requested from the planner
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_max_subtopics")]
    pub max_subtopics: usize,

    #[serde(default = "default_max_subsections")]
    pub max_subsections: usize,

    /// Word-count target handed to report prompts
    #[serde(default = "default_total_words")]
    pub total_words: usize,

    /// Citation style label handed to report prompts
    #[serde(default = "default_report_format")]
    pub report_format: String,

    /// Minimum cosine similarity for a chunk to survive compression
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum rendered passages per sub-query
    #[serde(default = "default_max_context_results")]
    pub max_context_results: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Capacity of the in-memory embedding cache (0 disables it)
    #[serde(default = "default_embedding_cache_entries")]
    pub embedding_cache_entries: usize,
}

fn default_max_iterations() -> usize {
    3
}

fn default_max_subtopics() -> usize {
    3
}

fn default_max_subsections() -> usize {
    5
}

fn default_total_words() -> usize {
    1000
}

fn default_report_format() -> String {
    "APA".to_string()
}

fn default_similarity_threshold() -> f32 {
    0.38
}

fn default_max_context_results() -> usize {
    8
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_embedding_cache_entries() -> usize {
    4096
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_subtopics: default_max_subtopics(),
            max_subsections: default_max_subsections(),
            total_words: default_total_words(),
            report_format: default_report_format(),
            similarity_threshold: default_similarity_threshold(),
            max_context_results: default_max_context_results(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_cache_entries: default_embedding_cache_entries(),
        }
    }
}

// ============= Local Store Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Where the persisted index and corpus hash live
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub chunk_overlap: usize,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("./data/corpus")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache/index")
}

fn default_top_k() -> usize {
    6
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            cache_dir: default_cache_dir(),
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
        }
    }
}

// ============= Output, Prompts & Logging =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// JSON file replacing the built-in prompt catalog
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Environment variable '{var}' has invalid value '{value}'")]
    InvalidEnvValue { var: String, value: String },
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Build a configuration from optional TOML contents and an environment map.
///
/// Environment overrides are applied after parsing, then `~` is expanded in
/// directory values, then the result is validated.
pub fn load_config(
    file_contents: Option<&str>,
    env: &HashMap<String, String>,
) -> Result<AnalystConfig, ConfigError> {
    let mut config: AnalystConfig = match file_contents {
        Some(contents) => toml::from_str(contents)?,
        None => AnalystConfig::default(),
    };

    config.apply_env_overrides(env)?;
    config.expand_home(env);
    config.validate(env)?;

    Ok(config)
}

fn env_parse<T: std::str::FromStr>(
    env: &HashMap<String, String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match env.get(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value: value.clone(),
            }),
    }
}

fn expand_tilde(path: &Path, home: Option<&String>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => Path::new(home).join(rest),
        _ => path.to_path_buf(),
    }
}

impl AnalystConfig {
    /// Load configuration from a TOML file, or defaults when `path` is `None`
    pub fn load(
        path: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                let content = fs::read_to_string(path)?;
                load_config(Some(&content), env)
            }
            None => load_config(None, env),
        }
    }

    fn apply_env_overrides(&mut self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(model) = env.get("ANALYST_LLM_MODEL") {
            self.llm.set_model(model.clone());
        }
        if let Some(backend) = env_parse::<SearchBackend>(env, "ANALYST_SEARCH_BACKEND")? {
            self.search.backend = backend;
        }
        if let Some(n) = env_parse(env, "ANALYST_MAX_SEARCH_RESULTS")? {
            self.search.max_results = n;
        }
        if let Some(n) = env_parse(env, "ANALYST_MAX_ITERATIONS")? {
            self.research.max_iterations = n;
        }
        if let Some(n) = env_parse(env, "ANALYST_MAX_SUBTOPICS")? {
            self.research.max_subtopics = n;
        }
        if let Some(n) = env_parse(env, "ANALYST_MAX_SUBSECTIONS")? {
            self.research.max_subsections = n;
        }
        if let Some(n) = env_parse(env, "ANALYST_TOTAL_WORDS")? {
            self.research.total_words = n;
        }
        if let Some(dir) = env.get("ANALYST_CORPUS_DIR") {
            self.local_store.corpus_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env.get("ANALYST_CACHE_DIR") {
            self.local_store.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env.get("ANALYST_REPORT_DIR") {
            self.output.report_dir = PathBuf::from(dir);
        }
        if let Some(path) = env.get("ANALYST_PROMPTS_PATH") {
            self.prompts.path = Some(PathBuf::from(path));
        }
        if let Some(level) = env.get("ANALYST_LOG_LEVEL") {
            self.logging.level = level.clone();
        }
        Ok(())
    }

    fn expand_home(&mut self, env: &HashMap<String, String>) {
        let home = env.get("HOME");
        self.local_store.corpus_dir = expand_tilde(&self.local_store.corpus_dir, home);
        self.local_store.cache_dir = expand_tilde(&self.local_store.cache_dir, home);
        self.output.report_dir = expand_tilde(&self.output.report_dir, home);
        if let Some(path) = self.prompts.path.take() {
            self.prompts.path = Some(expand_tilde(&path, home));
        }
    }

    /// Validate value ranges and that referenced secrets are present in `env`
    pub fn validate(&self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        if self.scrape.workers == 0 {
            return Err(ConfigError::ValidationError(
                "scrape.workers must be at least 1".to_string(),
            ));
        }
        if self.scrape.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "scrape.timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.research.similarity_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "research.similarity_threshold must be within 0..=1, got {}",
                self.research.similarity_threshold
            )));
        }
        if self.research.chunk_size == 0 || self.research.chunk_overlap >= self.research.chunk_size
        {
            return Err(ConfigError::ValidationError(format!(
                "research.chunk_overlap ({}) must be smaller than research.chunk_size ({})",
                self.research.chunk_overlap, self.research.chunk_size
            )));
        }
        if self.local_store.chunk_size == 0
            || self.local_store.chunk_overlap >= self.local_store.chunk_size
        {
            return Err(ConfigError::ValidationError(format!(
                "local_store.chunk_overlap ({}) must be smaller than local_store.chunk_size ({})",
                self.local_store.chunk_overlap, self.local_store.chunk_size
            )));
        }
        if self.research.max_context_results == 0 || self.local_store.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_context_results and local_store.top_k must be at least 1"
                    .to_string(),
            ));
        }

        if let ProviderConfig::OpenAI { api_key_env, .. } = &self.llm {
            Self::require_env(env, api_key_env)?;
        }
        if self.search.backend.requires_key() {
            let var = self.search.key_env().ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "search backend '{}' requires search.api_key_env",
                    self.search.backend
                ))
            })?;
            Self::require_env(env, &var)?;
        }

        Ok(())
    }

    fn require_env(env: &HashMap<String, String>, name: &str) -> Result<(), ConfigError> {
        match env.get(name) {
            Some(value) if !value.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingEnvVar(name.to_string())),
        }
    }

    /// Resolve an environment variable referenced by the config
    pub fn resolve_env(env: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
        env.get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }
}
