//! Research progress record
//!
//! [`ResearchState`] is copied, never aliased, between stages. Stages return a
//! new snapshot; merging a subtopic back into its parent happens only through
//! [`ResearchState::merge_subtopic`].

use crate::types::{AppError, DataSource, ReportVariant, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchState {
    topic: String,
    #[serde(default)]
    pub parent_topic: Option<String>,
    #[serde(default)]
    pub report_variant: ReportVariant,
    #[serde(default)]
    pub data_source: DataSource,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_kind: Option<String>,
    /// Every source consumed by this task lineage, in visitation order
    #[serde(default)]
    pub visited_sources: Vec<String>,
    /// Findings of the first gathering pass; written once
    #[serde(default)]
    pub initial_findings: Vec<String>,
    /// One compressed context block per sub-query of the latest pass
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub report_headings: Vec<String>,
    #[serde(default)]
    pub report_body: String,
    #[serde(default)]
    pub final_report: String,
}

impl ResearchState {
    /// Start a task for `topic`; a blank topic is rejected.
    pub fn new(topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "A research task needs a topic".to_string(),
            ));
        }
        Ok(Self {
            topic,
            parent_topic: None,
            report_variant: ReportVariant::default(),
            data_source: DataSource::default(),
            role: None,
            role_kind: None,
            visited_sources: Vec::new(),
            initial_findings: Vec::new(),
            findings: Vec::new(),
            report_headings: Vec::new(),
            report_body: String::new(),
            final_report: String::new(),
        })
    }

    /// Set the report variant.
    pub fn with_variant(mut self, variant: ReportVariant) -> Self {
        self.report_variant = variant;
        self
    }

    /// Set where evidence comes from.
    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_source = source;
        self
    }

    /// The topic being researched.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Task description handed to the planner: `"<parent> - <topic>"` for
    /// subtopics, the topic itself otherwise.
    pub fn task_label(&self) -> String {
        match &self.parent_topic {
            Some(parent) => format!("{} - {}", parent, self.topic),
            None => self.topic.clone(),
        }
    }

    /// Derive the state for one subtopic pass.
    ///
    /// Role, visited sources and headings are inherited; evidence and report
    /// fields start empty.
    pub fn derive_subtopic(&self, subtopic: &str) -> Result<Self> {
        let mut derived = Self::new(subtopic)?
            .with_variant(ReportVariant::Subtopic)
            .with_data_source(self.data_source);
        derived.parent_topic = Some(self.topic.clone());
        derived.role = self.role.clone();
        derived.role_kind = self.role_kind.clone();
        derived.visited_sources = self.visited_sources.clone();
        derived.report_headings = self.report_headings.clone();
        Ok(derived)
    }

    /// Fold a finished subtopic pass back in: visited sources and headings
    /// are unioned in order, findings replaced, the body appended after a
    /// blank line.
    pub fn merge_subtopic(&mut self, subtopic: &ResearchState) {
        union_into(&mut self.visited_sources, &subtopic.visited_sources);
        union_into(&mut self.report_headings, &subtopic.report_headings);
        self.findings = subtopic.findings.clone();

        if !subtopic.report_body.is_empty() {
            if !self.report_body.is_empty() {
                self.report_body.push_str("\n\n");
            }
            self.report_body.push_str(&subtopic.report_body);
        }
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a saved state; the topic must not be blank.
    pub fn from_json(json: &str) -> Result<Self> {
        let state: Self = serde_json::from_str(json)?;
        if state.topic.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Persisted state has an empty topic".to_string(),
            ));
        }
        Ok(state)
    }

    /// Write the state as pretty JSON
    pub async fn dump(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        debug!(path = %path.display(), "Saved research state");
        Ok(())
    }

    /// Read a state written by [`ResearchState::dump`].
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}

fn union_into(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
