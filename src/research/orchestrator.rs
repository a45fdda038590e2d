//! Single research pass
//!
//! [`ResearchOrchestrator::conduct`] walks one task through
//! `Uninitialized -> RoleChosen -> SubQueriesPlanned -> EvidenceGathered -> Done`
//! and returns a new [`ResearchState`] snapshot.

use super::{ResearchContext, ResearchState};
use crate::rag::{CompressedContext, ContextCompressor};
use crate::sources::{EvidenceSource, VisitedSources};
use crate::types::{AppError, Persona, ReportVariant, Result};
use crate::utils::json_recovery::recover_json;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_PERSONA_KIND: &str = "Default Agent";
pub const DEFAULT_PERSONA_ROLE: &str = "You are an AI critical thinker research assistant. Your sole purpose is to write well written, critically acclaimed, objective and structured reports on given text.";

/// Stages of one research pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    RoleChosen,
    SubQueriesPlanned,
    EvidenceGathered,
    Done,
}

impl Phase {
    fn advance(&mut self, next: Phase) {
        debug!(from = ?*self, to = ?next, "Research phase");
        *self = next;
    }
}

impl Persona {
    pub fn fallback() -> Self {
        Self {
            kind: DEFAULT_PERSONA_KIND.to_string(),
            role: DEFAULT_PERSONA_ROLE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PersonaReply {
    #[serde(rename = "agentType")]
    agent_type: String,
    #[serde(rename = "agentRole")]
    agent_role: String,
}

/// Today's date as handed to prompts
pub fn prompt_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

pub struct ResearchOrchestrator {
    ctx: Arc<ResearchContext>,
    cancel: CancellationToken,
}

impl ResearchOrchestrator {
    pub fn new(ctx: Arc<ResearchContext>) -> Self {
        Self {
            ctx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    /// Run one research pass, leaving `state` untouched.
    #[instrument(
        name = "research",
        skip(self, state),
        fields(run_id = %Uuid::new_v4(), topic = %state.topic(), variant = %state.report_variant)
    )]
    pub async fn conduct(&self, state: &ResearchState) -> Result<ResearchState> {
        let mut next = state.clone();
        let mut phase = Phase::Uninitialized;

        self.ensure_active()?;
        if next.role.is_none() {
            let persona = self.choose_persona(&next).await?;
            info!(persona = %persona.kind, "Persona chosen");
            next.role_kind = Some(persona.kind);
            next.role = Some(persona.role);
        }
        phase.advance(Phase::RoleChosen);

        self.ensure_active()?;
        let sub_queries = self.plan_sub_queries(&next).await?;
        info!(count = sub_queries.len(), ?sub_queries, "Sub-queries planned");
        phase.advance(Phase::SubQueriesPlanned);

        let (findings, visited) = self.gather(&next, &sub_queries).await?;
        next.findings = findings;
        next.visited_sources = visited;
        if next.initial_findings.is_empty() {
            next.initial_findings = next.findings.clone();
        }
        phase.advance(Phase::EvidenceGathered);

        info!(
            findings = next.findings.len(),
            visited = next.visited_sources.len(),
            "Evidence gathered"
        );
        phase.advance(Phase::Done);
        Ok(next)
    }

    /// Ask the model for a persona, falling back to a generic one.
    pub async fn choose_persona(&self, state: &ResearchState) -> Result<Persona> {
        let system = self.ctx.prompts.get("choose_agent_prompt", &[])?;
        let task = state.task_label();

        let reply = match self.ctx.llm.generate_with_system(&system, &task).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Persona selection failed, using default persona");
                return Ok(Persona::fallback());
            }
        };
        debug!(reply = %reply, "Persona reply");

        match recover_json::<PersonaReply>(&reply) {
            Ok(parsed) if !parsed.agent_role.trim().is_empty() => Ok(Persona {
                kind: parsed.agent_type,
                role: parsed.agent_role,
            }),
            Ok(_) => {
                warn!("Persona reply had an empty role, using default persona");
                Ok(Persona::fallback())
            }
            Err(e) => {
                warn!(error = %e, "Unusable persona reply, using default persona");
                Ok(Persona::fallback())
            }
        }
    }

    /// Ask the model for sub-queries.
    ///
    /// At most `max_iterations` are kept. Unless the task is a subtopic, the
    /// topic itself is appended last, so it is searched even when planning
    /// fails entirely.
    pub async fn plan_sub_queries(&self, state: &ResearchState) -> Result<Vec<String>> {
        let max_iterations = self.ctx.settings.max_iterations;
        let prompt = self.ctx.prompts.get(
            "search_queries_prompt",
            &[
                ("max_iterations", max_iterations.to_string()),
                ("task", state.task_label()),
                ("datetime_now", prompt_date()),
            ],
        )?;
        let role = state.role.as_deref().unwrap_or(DEFAULT_PERSONA_ROLE);

        let mut sub_queries: Vec<String> =
            match self.ctx.llm.generate_with_system(role, &prompt).await {
                Ok(reply) => {
                    debug!(reply = %reply, "Planner reply");
                    recover_json::<Vec<String>>(&reply).unwrap_or_else(|e| {
                        warn!(error = %e, "Unusable planner reply, using no derived sub-queries");
                        Vec::new()
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Sub-query planning failed, using no derived sub-queries");
                    Vec::new()
                }
            };

        sub_queries.retain(|q| !q.trim().is_empty());
        sub_queries.truncate(max_iterations);
        if state.report_variant != ReportVariant::Subtopic {
            sub_queries.push(state.topic().to_string());
        }
        Ok(sub_queries)
    }

    /// Fan out one fetch-and-compress pipeline per sub-query.
    ///
    /// Returns findings in sub-query order and the updated visited sources.
    /// Sources cited by each compressed finding are admitted to the visited
    /// set, so the references section covers everything the report quotes.
    async fn gather(
        &self,
        state: &ResearchState,
        sub_queries: &[String],
    ) -> Result<(Vec<String>, Vec<String>)> {
        self.ensure_active()?;
        let source = self.ctx.sources.get(state.data_source)?;
        let visited = Arc::new(VisitedSources::from_sources(
            state.visited_sources.iter().cloned(),
        ));
        let max_results = self.ctx.settings.max_context_results;

        let mut set = JoinSet::new();
        for (index, sub_query) in sub_queries.iter().enumerate() {
            let source = Arc::clone(&source);
            let compressor = Arc::clone(&self.ctx.compressor);
            let visited = Arc::clone(&visited);
            let sub_query = sub_query.clone();

            set.spawn(async move {
                let result =
                    gather_one(source, compressor, &visited, &sub_query, max_results).await;
                (index, sub_query, result)
            });
        }

        let mut findings = vec![String::new(); sub_queries.len()];
        loop {
            let joined = tokio::select! {
                _ = self.cancel.cancelled() => {
                    set.abort_all();
                    warn!("Research cancelled during evidence gathering");
                    return Err(AppError::Cancelled);
                }
                joined = set.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok((index, sub_query, Ok(context)))) => {
                    let recorded = visited.admit(&context.sources);
                    debug!(
                        sub_query = %sub_query,
                        sources = ?context.sources,
                        newly_recorded = recorded.len(),
                        "Sub-query compressed"
                    );
                    findings[index] = context.text;
                }
                Some(Ok((_, _, Err(e)))) if e.is_fatal() => {
                    set.abort_all();
                    return Err(e);
                }
                Some(Ok((_, sub_query, Err(e)))) => {
                    warn!(sub_query = %sub_query, error = %e, "Sub-query pipeline failed, keeping an empty finding");
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Sub-query task panicked or was aborted");
                }
            }
        }

        Ok((findings, visited.snapshot()))
    }
}

async fn gather_one(
    source: Arc<dyn EvidenceSource>,
    compressor: Arc<ContextCompressor>,
    visited: &VisitedSources,
    sub_query: &str,
    max_results: usize,
) -> Result<CompressedContext> {
    let evidence = source.fetch(sub_query, visited).await?;
    if evidence.is_empty() {
        debug!(sub_query, "No evidence for sub-query");
        return Ok(CompressedContext::default());
    }
    compressor.compress(sub_query, &evidence, max_results).await
}
