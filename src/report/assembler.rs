//! Report body and introduction writing

use crate::research::orchestrator::{prompt_date, DEFAULT_PERSONA_ROLE};
use crate::research::{ResearchContext, ResearchState};
use crate::types::{AppError, ReportVariant, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns findings into Markdown with one model call.
pub struct ReportAssembler {
    ctx: Arc<ResearchContext>,
}

fn format_headings(headings: &[String]) -> String {
    if headings.is_empty() {
        return "None".to_string();
    }
    headings
        .iter()
        .map(|h| format!("- {}", h))
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_findings(findings: &[String]) -> String {
    findings
        .iter()
        .filter(|f| !f.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl ReportAssembler {
    pub fn new(ctx: Arc<ResearchContext>) -> Self {
        Self { ctx }
    }

    /// Write the report body for `state.report_variant`.
    ///
    /// A failed model call yields an empty body with a warning.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotImplemented`] for [`ReportVariant::Custom`]
    /// - prompt lookup or substitution errors
    pub async fn write(&self, state: &ResearchState) -> Result<String> {
        let variant = state.report_variant;
        let prompt_name = variant.prompt_name().ok_or_else(|| {
            AppError::NotImplemented(format!("'{}' reports are not supported", variant))
        })?;

        let settings = &self.ctx.settings;
        let mut vars = vec![
            ("context", join_findings(&state.findings)),
            ("total_words", settings.total_words.to_string()),
            ("report_format", settings.report_format.clone()),
            ("datetime_now", prompt_date()),
        ];
        if variant == ReportVariant::Subtopic {
            vars.push(("current_subtopic", state.topic().to_string()));
            vars.push((
                "main_topic",
                state
                    .parent_topic
                    .clone()
                    .unwrap_or_else(|| state.topic().to_string()),
            ));
            vars.push(("max_subsections", settings.max_subsections.to_string()));
            vars.push(("existing_headers", format_headings(&state.report_headings)));
        } else {
            vars.push(("question", state.topic().to_string()));
        }

        let prompt = self.ctx.prompts.get(prompt_name, &vars)?;
        let role = state.role.as_deref().unwrap_or(DEFAULT_PERSONA_ROLE);

        match self.ctx.llm.generate_with_system(role, &prompt).await {
            Ok(body) => {
                info!(variant = %variant, topic = state.topic(), chars = body.len(), "Report written");
                Ok(body.trim().to_string())
            }
            Err(e) => {
                warn!(variant = %variant, topic = state.topic(), error = %e, "Report writing failed, leaving body empty");
                Ok(String::new())
            }
        }
    }

    /// Write an introduction from the first pass's findings.
    pub async fn write_introduction(&self, state: &ResearchState) -> Result<String> {
        let prompt = self.ctx.prompts.get(
            "report_introduction",
            &[
                ("research_summary", join_findings(&state.initial_findings)),
                ("question", state.topic().to_string()),
                ("datetime_now", prompt_date()),
            ],
        )?;
        let role = state.role.as_deref().unwrap_or(DEFAULT_PERSONA_ROLE);

        match self.ctx.llm.generate_with_system(role, &prompt).await {
            Ok(intro) => {
                debug!(chars = intro.len(), "Introduction written");
                Ok(intro.trim().to_string())
            }
            Err(e) => {
                warn!(error = %e, "Introduction writing failed, leaving it empty");
                Ok(String::new())
            }
        }
    }
}
