//! Writes finished reports to the output directory

use crate::research::ResearchState;
use crate::types::{AppError, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// `Research-<YYYY-MM-DD-HHMMSS><4 fractional digits>.md`
pub fn report_file_name(now: DateTime<Local>) -> String {
    format!(
        "Research-{}{:04}.md",
        now.format("%Y-%m-%d-%H%M%S"),
        now.timestamp_subsec_micros() / 100
    )
}

pub struct Publisher {
    report_dir: PathBuf,
}

impl Publisher {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Write the final report, or the accumulated body when there is no
    /// final report, and return the file path.
    pub async fn publish(&self, state: &ResearchState) -> Result<PathBuf> {
        let markdown = if state.final_report.trim().is_empty() {
            &state.report_body
        } else {
            &state.final_report
        };
        if markdown.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Nothing to publish for '{}'",
                state.topic()
            )));
        }

        tokio::fs::create_dir_all(&self.report_dir).await?;
        let path = self.report_dir.join(report_file_name(Local::now()));
        tokio::fs::write(&path, markdown).await?;

        info!(path = %path.display(), bytes = markdown.len(), "Report published");
        Ok(path)
    }
}
