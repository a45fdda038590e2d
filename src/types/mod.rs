use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Research Enums =============

/// Which report template/shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportVariant {
    /// Single-pass summary report
    #[default]
    Summary,
    /// Primary pass plus one sub-report per derived subtopic
    Detailed,
    /// Outline of the report structure only
    Outline,
    /// Bibliography-style report recommending sources
    Resource,
    /// One section of a detailed report
    Subtopic,
    /// Caller-defined report; not supported
    Custom,
}

impl ReportVariant {
    /// Name of the prompt template that writes this variant's body.
    ///
    /// `Custom` has no template.
    pub fn prompt_name(&self) -> Option<&'static str> {
        match self {
            ReportVariant::Summary => Some("summary_report_prompt"),
            ReportVariant::Detailed => Some("detailed_report_prompt"),
            ReportVariant::Outline => Some("outline_report_prompt"),
            ReportVariant::Resource => Some("resource_report_prompt"),
            ReportVariant::Subtopic => Some("subtopic_report_prompt"),
            ReportVariant::Custom => None,
        }
    }

    /// String form used in persisted state and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportVariant::Summary => "summary",
            ReportVariant::Detailed => "detailed",
            ReportVariant::Outline => "outline",
            ReportVariant::Resource => "resource",
            ReportVariant::Subtopic => "subtopic",
            ReportVariant::Custom => "custom",
        }
    }
}

impl fmt::Display for ReportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(ReportVariant::Summary),
            "detailed" => Ok(ReportVariant::Detailed),
            "outline" => Ok(ReportVariant::Outline),
            "resource" => Ok(ReportVariant::Resource),
            "subtopic" => Ok(ReportVariant::Subtopic),
            "custom" => Ok(ReportVariant::Custom),
            other => Err(AppError::InvalidInput(format!(
                "Unknown report variant: {}",
                other
            ))),
        }
    }
}

/// Where evidence for a research task comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Web search followed by scraping
    #[default]
    Web,
    /// Similarity retrieval over a local document corpus
    LocalStore,
    /// A fixed list of URLs supplied by the caller
    ExplicitUrls,
}

impl DataSource {
    /// String form used in persisted state and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Web => "web",
            DataSource::LocalStore => "local_store",
            DataSource::ExplicitUrls => "explicit_urls",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "web" => Ok(DataSource::Web),
            "local" | "local_store" => Ok(DataSource::LocalStore),
            "urls" | "explicit_urls" => Ok(DataSource::ExplicitUrls),
            other => Err(AppError::InvalidInput(format!(
                "Unknown data source: {}",
                other
            ))),
        }
    }
}

// ============= Evidence Types =============

/// A search-engine result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// Raw content fetched from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: Option<String>,
    pub raw_content: String,
}

/// A `{source, content}` pair produced by scraping or retrieval, before compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    pub title: Option<String>,
    pub content: String,
}

impl From<ScrapedPage> for Evidence {
    fn from(page: ScrapedPage) -> Self {
        Self {
            source: page.url,
            title: page.title,
            content: page.raw_content,
        }
    }
}

/// Persona chosen for a research task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Short label, e.g. "News Agent"
    pub kind: String,
    /// System prompt used for every model call in the task
    pub role: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Prompt '{name}' expects the following variables: [{}]",
        .variables.join(", ")
    )]
    Prompt { name: String, variables: Vec<String> },

    #[error("Prompt '{0}' is not found")]
    PromptNotFound(String),

    #[error("No documents: {0}")]
    NoDocuments(String),

    #[error("Unusable model output: {0}")]
    ModelOutput(String),

    #[error("Source fetch failed: {0}")]
    SourceFetch(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Research task cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<analyst_index::Error> for AppError {
    fn from(err: analyst_index::Error) -> Self {
        match err {
            analyst_index::Error::Io(e) => AppError::Io(e),
            other => AppError::Internal(format!("Index error: {}", other)),
        }
    }
}

impl AppError {
    /// Whether this error invalidates the whole research task.
    ///
    /// Everything else is absorbed where it happens with a logged warning.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Prompt { .. }
                | AppError::PromptNotFound(_)
                | AppError::NoDocuments(_)
                | AppError::NotImplemented(_)
                | AppError::InvalidInput(_)
                | AppError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
