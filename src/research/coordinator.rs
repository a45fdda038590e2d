//! Detailed reports
//!
//! [`DetailedReportCoordinator`] runs a primary research pass, plans
//! subtopics, researches and writes each subtopic in sequence, and assembles
//! introduction, table of contents, body and references into one report.

use super::orchestrator::DEFAULT_PERSONA_ROLE;
use super::{ResearchContext, ResearchOrchestrator, ResearchState};
use crate::report::{extract_headings, references, table_of_contents, ReportAssembler};
use crate::types::{AppError, ReportVariant, Result};
use crate::utils::json_recovery::recover_json;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct SubtopicReply {
    subtopics: Vec<SubtopicEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtopicEntry {
    task: String,
}

/// Primary pass, one researched and written section per subtopic, then
/// introduction, table of contents and references.
///
/// Subtopics run one after another: each inherits the sources and headings
/// accumulated so far.
pub struct DetailedReportCoordinator {
    ctx: Arc<ResearchContext>,
    orchestrator: ResearchOrchestrator,
    assembler: ReportAssembler,
    cancel: CancellationToken,
}

impl DetailedReportCoordinator {
    pub fn new(ctx: Arc<ResearchContext>) -> Self {
        Self::with_cancellation(ctx, CancellationToken::new())
    }

    pub fn with_cancellation(ctx: Arc<ResearchContext>, cancel: CancellationToken) -> Self {
        Self {
            orchestrator: ResearchOrchestrator::new(Arc::clone(&ctx))
                .with_cancellation(cancel.clone()),
            assembler: ReportAssembler::new(Arc::clone(&ctx)),
            ctx,
            cancel,
        }
    }

    #[instrument(
        name = "detailed_report",
        skip(self, state),
        fields(run_id = %Uuid::new_v4(), topic = %state.topic())
    )]
    pub async fn run(&self, state: &ResearchState) -> Result<ResearchState> {
        let mut primary = self.orchestrator.conduct(state).await?;
        info!(
            visited = primary.visited_sources.len(),
            "Primary research pass complete"
        );

        let subtopics = self.plan_subtopics(&primary).await?;
        info!(count = subtopics.len(), ?subtopics, "Subtopics planned");

        for (index, subtopic) in subtopics.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            match self.research_subtopic(&primary, subtopic).await {
                Ok(section) => {
                    info!(
                        subtopic = %subtopic,
                        position = index + 1,
                        chars = section.report_body.len(),
                        "Subtopic section written"
                    );
                    primary.merge_subtopic(&section);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(subtopic = %subtopic, error = %e, "Subtopic failed, skipping its section");
                }
            }
        }

        let introduction = self.assembler.write_introduction(&primary).await?;
        let toc = table_of_contents(&primary.report_body);
        let refs = references(&primary.visited_sources);

        primary.final_report = [
            introduction.as_str(),
            toc.trim_end(),
            primary.report_body.as_str(),
            refs.trim_end(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n");

        info!(
            chars = primary.final_report.len(),
            sources = primary.visited_sources.len(),
            "Detailed report assembled"
        );
        Ok(primary)
    }

    /// Ask the model for subtopics of the primary topic.
    ///
    /// The list is bounded by `max_subtopics`; the primary topic is appended
    /// unless the task is itself a subtopic.
    pub async fn plan_subtopics(&self, primary: &ResearchState) -> Result<Vec<String>> {
        let max_subtopics = self.ctx.settings.max_subtopics;
        let prompt = self.ctx.prompts.get(
            "subtopics_prompt",
            &[
                ("task", primary.topic().to_string()),
                ("data", primary.initial_findings.join("\n\n")),
                ("subtopics", "[]".to_string()),
                ("max_subtopics", max_subtopics.to_string()),
            ],
        )?;
        let role = primary.role.as_deref().unwrap_or(DEFAULT_PERSONA_ROLE);

        let mut subtopics: Vec<String> =
            match self.ctx.llm.generate_with_system(role, &prompt).await {
                Ok(reply) => {
                    debug!(reply = %reply, "Subtopic reply");
                    match recover_json::<SubtopicReply>(&reply) {
                        Ok(parsed) => parsed.subtopics.into_iter().map(|s| s.task).collect(),
                        Err(e) => {
                            warn!(error = %e, "Unusable subtopic reply, using no derived subtopics");
                            Vec::new()
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Subtopic planning failed, using no derived subtopics");
                    Vec::new()
                }
            };

        let mut seen = std::collections::HashSet::new();
        subtopics.retain(|s| {
            let s = s.trim();
            !s.is_empty() && s != primary.topic() && seen.insert(s.to_string())
        });
        subtopics.truncate(max_subtopics);
        if primary.report_variant != ReportVariant::Subtopic {
            subtopics.push(primary.topic().to_string());
        }
        Ok(subtopics)
    }

    async fn research_subtopic(
        &self,
        primary: &ResearchState,
        subtopic: &str,
    ) -> Result<ResearchState> {
        let derived = primary.derive_subtopic(subtopic)?;
        let mut section = self.orchestrator.conduct(&derived).await?;
        section.report_body = self.assembler.write(&section).await?;

        let headings: Vec<String> = extract_headings(&section.report_body)
            .into_iter()
            .map(|h| h.text)
            .collect();
        for heading in headings {
            if !section.report_headings.contains(&heading) {
                section.report_headings.push(heading);
            }
        }
        Ok(section)
    }
}
