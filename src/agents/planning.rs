//! Planning agent: turns a prompt into a [`ContentPlan`].
//!
//! The model is asked for JSON; whatever comes back is normalized before any
//! other agent sees it. Blank sections and queries are dropped, titles are
//! cut to the section title limit, and word targets are scaled so their sum
//! fits the requested length.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AgentError, AgentFailure, AgentResult};
use crate::models::report::MAX_SECTION_TITLE_CHARS;
use crate::models::{AgentStep, ContentType, Template};
use crate::services::completion::CompletionService;

pub const AGENT_NAME: &str = "PlanningAgent";
pub const MAX_SECTIONS: usize = 10;
pub const MAX_QUERIES_PER_SECTION: usize = 3;
pub const MIN_SECTION_WORDS: u32 = 50;
pub const DEFAULT_SECTION_WORDS: u32 = 300;

fn default_true() -> bool {
    true
}

fn default_section_words() -> u32 {
    DEFAULT_SECTION_WORDS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSection {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub research_queries: Vec<String>,
    #[serde(default = "default_section_words")]
    pub word_count_target: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPlan {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub executive_summary_needed: bool,
    #[serde(default)]
    pub overall_strategy: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub sections: Vec<PlannedSection>,
}

impl ContentPlan {
    /// Clean up a model-produced plan.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidPlan`] when no usable section remains.
    pub fn normalize(mut self, max_words: u32) -> Result<Self, AgentError> {
        self.title = self.title.trim().to_string();
        self.key_points.retain(|p| !p.trim().is_empty());

        let mut sections = Vec::with_capacity(self.sections.len());
        for mut section in self.sections.drain(..) {
            let title = section.title.trim();
            if title.is_empty() {
                continue;
            }
            section.title = title.chars().take(MAX_SECTION_TITLE_CHARS).collect();
            section.description = section.description.trim().to_string();
            let mut queries: Vec<String> = section
                .research_queries
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            queries.dedup();
            queries.truncate(MAX_QUERIES_PER_SECTION);
            if queries.is_empty() {
                queries.push(section.title.clone());
            }
            section.research_queries = queries;
            section.word_count_target = section.word_count_target.max(MIN_SECTION_WORDS);
            sections.push(section);
            if sections.len() == MAX_SECTIONS {
                break;
            }
        }
        if sections.is_empty() {
            return Err(AgentError::InvalidPlan("plan has no sections".into()));
        }

        let total: u64 = sections.iter().map(|s| u64::from(s.word_count_target)).sum();
        if total > u64::from(max_words) {
            for section in &mut sections {
                let scaled = u64::from(section.word_count_target) * u64::from(max_words) / total;
                section.word_count_target = u32::try_from(scaled).unwrap_or(u32::MAX).max(MIN_SECTION_WORDS);
            }
        }
        self.sections = sections;
        Ok(self)
    }

    #[must_use]
    pub fn total_word_target(&self) -> u32 {
        self.sections.iter().map(|s| s.word_count_target).sum()
    }
}

fn output_schema() -> serde_json::Value {
    json!({
        "title": "string",
        "executive_summary_needed": "boolean",
        "overall_strategy": "string",
        "key_points": ["string"],
        "sections": [{
            "title": "string",
            "description": "string",
            "research_queries": ["string"],
            "word_count_target": "integer"
        }]
    })
}

#[must_use]
pub fn content_type_guidance(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Report => {
            "For a REPORT:\n\
             - Include executive summary\n\
             - Use formal, professional tone\n\
             - Structure with clear sections: Introduction, Analysis, Findings, Recommendations, Conclusion\n\
             - Emphasize data and evidence\n\
             - Include citations for all claims"
        }
        ContentType::Summary => {
            "For a SUMMARY:\n\
             - Be concise and focused\n\
             - Use bullet points or short paragraphs\n\
             - Highlight only the most critical information\n\
             - No need for extensive sections"
        }
        ContentType::Article => {
            "For an ARTICLE:\n\
             - Engaging introduction with a hook\n\
             - Logical flow of ideas\n\
             - Mix of information and narrative\n\
             - Strong conclusion"
        }
        ContentType::MarketingCopy => {
            "For MARKETING COPY:\n\
             - Focus on benefits and value proposition\n\
             - Use persuasive language\n\
             - Include clear call-to-action\n\
             - Emphasize customer pain points and solutions"
        }
        ContentType::Email => {
            "For an EMAIL:\n\
             - Clear subject line (use as title)\n\
             - Brief and scannable\n\
             - Professional but personable tone\n\
             - Specific call-to-action"
        }
        ContentType::Presentation => {
            "For a PRESENTATION:\n\
             - Slide-friendly structure\n\
             - Each section = potential slide\n\
             - Concise, impactful content\n\
             - Visual-first thinking"
        }
    }
}

#[must_use]
pub fn build_planning_prompt(
    prompt: &str,
    content_type: ContentType,
    max_words: u32,
    template: Option<&Template>,
) -> String {
    let template_block = template
        .map(|t| format!("\nTemplate: {}\n{}\n", t.name, t.guidance.trim()))
        .unwrap_or_default();
    format!(
        "You are an expert content strategist and planner.\n\n\
         User Request: {prompt}\n\n\
         Content Type: {content_type}\n\
         Target Length: {max_words} words\n\n\
         Your task is to create a detailed content generation plan.\n\n\
         {guidance}\n{template_block}\n\
         Requirements:\n\
         1. Create a compelling title\n\
         2. Determine if an executive summary is needed\n\
         3. Define 3-7 logical sections (fewer for short content, more for long reports)\n\
         4. For each section:\n\
         \x20  - Provide a clear, descriptive title\n\
         \x20  - Describe what should be covered in 1-2 sentences\n\
         \x20  - Specify 1-3 research queries to find relevant information\n\
         \x20  - Allocate a word count target (total across sections should match {max_words})\n\
         5. Formulate an overall content strategy\n\
         6. Identify 5-8 key points that must be addressed\n\n\
         The plan should be comprehensive, logical, and actionable for content generation agents.\n",
        guidance = content_type_guidance(content_type),
    )
}

#[derive(Clone)]
pub struct PlanningAgent {
    completion: CompletionService,
}

impl PlanningAgent {
    #[must_use]
    pub fn new(completion: CompletionService) -> Self {
        Self { completion }
    }

    /// # Errors
    ///
    /// Returns an [`AgentFailure`] when the model call fails or the plan it
    /// returns has no usable sections.
    pub async fn create_plan(
        &self,
        prompt: &str,
        content_type: ContentType,
        max_words: u32,
        template: Option<&Template>,
    ) -> AgentResult<ContentPlan> {
        let started = Instant::now();
        let step = AgentStep::new(
            AGENT_NAME,
            "planning",
            json!({
                "prompt": prompt,
                "content_type": content_type.as_str(),
                "max_words": max_words,
                "template_id": template.map(|t| t.id.as_str()),
            }),
        );
        tracing::info!(content_type = content_type.as_str(), max_words, "creating content plan");

        let planning_prompt = build_planning_prompt(prompt, content_type, max_words, template);
        let (raw, tokens) = match self
            .completion
            .generate_structured::<ContentPlan>(&planning_prompt, &output_schema(), "")
            .await
        {
            Ok(out) => out,
            Err(e) => return Err(AgentFailure::new(step, started, e)),
        };
        let plan = match raw.normalize(max_words) {
            Ok(plan) => plan,
            Err(e) => return Err(AgentFailure::new(step.with_tokens(tokens), started, e)),
        };

        let output = serde_json::to_value(&plan).unwrap_or_default();
        let step = step.finished(started, output).with_tokens(tokens);
        tracing::info!(
            sections_count = plan.sections.len(),
            duration_seconds = step.duration_seconds,
            "created content plan"
        );
        Ok((plan, step))
    }
}

#[cfg(test)]
#[path = "planning_test.rs"]
mod tests;
