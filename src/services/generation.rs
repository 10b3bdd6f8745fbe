//! Generation pipeline orchestrator.
//!
//! DESIGN
//! ======
//! One call to [`GenerationService::generate`] runs planning, then research
//! and drafting per planned section, then the executive summary, editing and
//! the optional fact check. Sections are processed in plan order; within a
//! section the research queries run concurrently.
//!
//! The report is stored as `generating` before the first agent runs and
//! stored again when the run ends, either `completed` or `failed` with the
//! failing step recorded. A failed run is still returned as an error so the
//! handler can pick a status code. A run whose future is dropped midway
//! (request timeout, client disconnect) still ends `failed`: a guard spawns
//! the final store update on drop.
//!
//! Citation ids are assigned report-wide by a [`CitationRegistry`] as each
//! section is drafted, so numeric inline markers match the reference list.

use std::sync::Arc;
use std::time::Instant;

use crate::agents::drafting::{DraftingAgent, SectionBrief, truncate_words};
use crate::agents::editing::EditingAgent;
use crate::agents::planning::{ContentPlan, PlanningAgent};
use crate::agents::research::{DEFAULT_MAX_CONTEXT_TOKENS, ResearchAgent, TOP_K_PER_QUERY};
use crate::agents::{AgentError, AgentFailure};
use crate::error::{ErrorCode, FieldError};
use crate::models::report::MAX_SECTION_WORDS;
use crate::models::{Citation, CitationFormat, ContentStatus, GenerationRequest, ModelError, Report, Template, User, word_count};

use super::catalog::TemplateCatalog;
use super::citation::{CitationRegistry, insert_inline_citations};
use super::completion::CompletionService;
use super::rag::RagService;
use super::store::ReportStore;

/// Failure reason stored on a report whose run was dropped midway.
pub const CANCELLED_REASON: &str = "generation cancelled before completion";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request validation failed")]
    Invalid(Vec<FieldError>),

    #[error("template {0}")]
    TemplateNotFound(String),

    #[error("{stage} failed: {source}")]
    Agent {
        stage: &'static str,
        report_id: String,
        #[source]
        source: AgentError,
    },

    #[error("generated content rejected: {source}")]
    Model {
        report_id: String,
        #[source]
        source: ModelError,
    },
}

impl GenerationError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Agent { source, .. } if source.is_timeout())
    }

    /// Id of the stored failed report, when the pipeline got far enough to
    /// create one.
    #[must_use]
    pub fn report_id(&self) -> Option<&str> {
        match self {
            Self::Agent { report_id, .. } | Self::Model { report_id, .. } => Some(report_id.as_str()),
            Self::Invalid(_) | Self::TemplateNotFound(_) => None,
        }
    }
}

impl ErrorCode for GenerationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "E_VALIDATION",
            Self::TemplateNotFound(_) => "E_NOT_FOUND",
            Self::Agent { source, .. } => source.error_code(),
            Self::Model { .. } => "E_GENERATED_CONTENT",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Agent { source, .. } => source.retryable(),
            Self::Model { .. } => true,
            Self::Invalid(_) | Self::TemplateNotFound(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub max_words_limit: u32,
    pub default_citation_format: CitationFormat,
    pub enable_fact_check: bool,
}

/// A pipeline stage failure, before it is tied to a stored report.
enum StageError {
    Agent(&'static str, AgentError),
    Model(ModelError),
}

pub struct GenerationService {
    planner: PlanningAgent,
    researcher: ResearchAgent,
    drafter: DraftingAgent,
    editor: EditingAgent,
    templates: Arc<TemplateCatalog>,
    store: Arc<ReportStore>,
    options: GenerationOptions,
}

impl GenerationService {
    pub fn new(
        completion: CompletionService,
        rag: RagService,
        templates: Arc<TemplateCatalog>,
        store: Arc<ReportStore>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            planner: PlanningAgent::new(completion.clone()),
            researcher: ResearchAgent::new(rag),
            drafter: DraftingAgent::new(completion.clone()),
            editor: EditingAgent::new(completion),
            templates,
            store,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> GenerationOptions {
        self.options
    }

    /// Run the full pipeline for `user` and store the resulting report.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Invalid`] or
    /// [`GenerationError::TemplateNotFound`] before anything is stored, and
    /// an agent or model error after the failed report has been stored.
    pub async fn generate(&self, user: &User, req: GenerationRequest) -> Result<Report, GenerationError> {
        req.validate(self.options.max_words_limit).map_err(GenerationError::Invalid)?;
        let template = match req.template_id.as_deref() {
            Some(id) => Some(
                self.templates
                    .get(id.trim())
                    .ok_or_else(|| GenerationError::TemplateNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let started = Instant::now();
        let content_type = template.map_or(req.content_type, |t| t.content_type);
        let citation_format = req.citation_format.unwrap_or(self.options.default_citation_format);
        let mut report = Report::new(req.prompt.trim(), content_type, citation_format);
        report.user_id = Some(user.email.clone());
        report.template_id = template.map(|t| t.id.clone());
        report.tags.clone_from(&req.tags);
        report.metadata.clone_from(&req.metadata);
        report.mark_generating();
        self.store.insert(report.clone()).await;
        let mut pending = PendingReport::new(self.store.clone(), &report.id, started);

        let preview: String = req.prompt.chars().take(100).collect();
        tracing::info!(
            report_id = %report.id,
            user = %user.email,
            prompt = %preview,
            content_type = content_type.as_str(),
            "content generation started"
        );

        let outcome = self.run_pipeline(&mut report, &req, template).await;
        report.generation_time_seconds = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(()) => {
                report.mark_completed();
                tracing::info!(
                    report_id = %report.id,
                    sections = report.sections.len(),
                    citations = report.citations.len(),
                    total_tokens = report.total_tokens_used,
                    duration_seconds = report.generation_time_seconds,
                    "content generation completed"
                );
                Ok(report.clone())
            }
            Err(stage_error) => {
                let report_id = report.id.clone();
                let err = match stage_error {
                    StageError::Agent(stage, source) => GenerationError::Agent { stage, report_id, source },
                    StageError::Model(source) => GenerationError::Model { report_id, source },
                };
                report.mark_failed(err.to_string());
                tracing::error!(report_id = %report.id, error = %err, "content generation failed");
                Err(err)
            }
        };
        self.store.insert(report).await;
        pending.settle();
        result
    }

    async fn run_pipeline(
        &self,
        report: &mut Report,
        req: &GenerationRequest,
        template: Option<&Template>,
    ) -> Result<(), StageError> {
        let content_type = report.content_type;
        let citation_format = report.citation_format;

        let (plan, step) = self
            .planner
            .create_plan(&req.prompt, content_type, req.max_words, template)
            .await
            .map_err(|f| record(report, "planning", f))?;
        report.add_agent_step(step);
        report.set_title(&plan.title);

        let mut registry = CitationRegistry::default();
        for section in &plan.sections {
            tracing::info!(section = %section.title, "researching section");
            let (research, step) = self
                .researcher
                .research(&section.research_queries, TOP_K_PER_QUERY, DEFAULT_MAX_CONTEXT_TOKENS)
                .await
                .map_err(|f| record(report, "research", f))?;
            report.add_agent_step(step);

            let brief = SectionBrief {
                title: &section.title,
                description: &section.description,
                word_count_target: section.word_count_target,
            };
            let (content, step) = self
                .drafter
                .draft_section(&brief, &research.context, content_type, &req.prompt)
                .await
                .map_err(|f| record(report, "drafting", f))?;
            report.add_agent_step(step);

            let citations = if req.include_citations { registry.register(research.citations) } else { Vec::new() };
            let body = with_inline_citations(&content, &citations, citation_format);
            report
                .add_section(&section.title, body, citations)
                .map_err(StageError::Model)?;
        }

        if plan.executive_summary_needed {
            let body = report
                .sections
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let (summary, step) = self
                .drafter
                .draft_executive_summary(&body, &report.title)
                .await
                .map_err(|f| record(report, "summary", f))?;
            report.add_agent_step(step);
            report.executive_summary = Some(summary);
        }

        let draft = assemble_draft(report);
        let (edited, step) = self
            .editor
            .edit_content(&draft, registry.citations(), content_type, citation_format)
            .await
            .map_err(|f| record(report, "editing", f))?;
        report.add_agent_step(step);
        report.edited_content = Some(edited);

        if self.options.enable_fact_check {
            let (check, step) = self.editor.fact_check(&draft, registry.citations()).await;
            report.add_agent_step(step);
            report
                .metadata
                .insert("fact_check".into(), serde_json::to_value(&check).unwrap_or_default());
        }

        report.citations = registry.into_citations();
        record_plan(report, &plan);
        Ok(())
    }
}

/// Marks a `generating` report as failed if the run is dropped before it
/// stores its final state, e.g. on a request timeout or client disconnect.
struct PendingReport {
    store: Arc<ReportStore>,
    report_id: String,
    started: Instant,
    settled: bool,
}

impl PendingReport {
    fn new(store: Arc<ReportStore>, report_id: &str, started: Instant) -> Self {
        Self { store, report_id: report_id.to_string(), started, settled: false }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for PendingReport {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(report_id = %self.report_id, "generation cancelled outside a runtime, report left generating");
            return;
        };
        let store = self.store.clone();
        let report_id = std::mem::take(&mut self.report_id);
        let elapsed = self.started.elapsed().as_secs_f64();
        tracing::warn!(%report_id, "content generation cancelled");
        runtime.spawn(async move {
            store
                .update(&report_id, |report| {
                    if report.status == ContentStatus::Generating {
                        report.generation_time_seconds = elapsed;
                        report.mark_failed(CANCELLED_REASON);
                    }
                })
                .await;
        });
    }
}

fn record(report: &mut Report, stage: &'static str, failure: AgentFailure) -> StageError {
    report.add_agent_step(failure.step);
    StageError::Agent(stage, failure.error)
}

fn record_plan(report: &mut Report, plan: &ContentPlan) {
    report
        .metadata
        .insert("overall_strategy".into(), serde_json::Value::String(plan.overall_strategy.clone()));
    report.metadata.insert("key_points".into(), serde_json::json!(plan.key_points));
}

/// Inline markers, unless they would push the section over its word limit.
fn with_inline_citations(content: &str, citations: &[Citation], style: CitationFormat) -> String {
    let marked = insert_inline_citations(content, citations, style);
    if word_count(&marked) > MAX_SECTION_WORDS {
        return truncate_words(content, MAX_SECTION_WORDS);
    }
    marked
}

/// Summary and sections as one markdown draft for the editor.
#[must_use]
pub fn assemble_draft(report: &Report) -> String {
    let mut draft = String::new();
    if let Some(summary) = &report.executive_summary {
        draft.push_str(&format!("# Executive Summary\n\n{summary}\n\n"));
    }
    for section in &report.sections {
        draft.push_str(&format!("# {}\n\n{}\n\n", section.title, section.content));
    }
    draft.trim_end().to_string()
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;
