//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! External collaborators (LLM, search index, Graph publisher) arrive as
//! trait objects so tests can substitute in-memory fakes. Generation is
//! `None` when no LLM is configured; the routes answer 503 instead of
//! failing at startup.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::{ConfigError, Settings};
use crate::graph::Publisher;
use crate::llm::LlmChat;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::routes::auth::AuthTokens;
use crate::search::SearchIndex;
use crate::services::catalog::TemplateCatalog;
use crate::services::completion::CompletionService;
use crate::services::generation::{GenerationOptions, GenerationService};
use crate::services::inflight::InFlight;
use crate::services::publish::PublishService;
use crate::services::rag::RagService;
use crate::services::store::ReportStore;

/// External collaborators resolved at startup.
pub struct Integrations {
    pub llm: Option<Arc<dyn LlmChat>>,
    pub search: Arc<dyn SearchIndex>,
    pub search_top_k: usize,
    pub search_min_score: f64,
    pub publisher: Option<Arc<dyn Publisher>>,
    pub sharepoint_site_id: Option<String>,
    pub sharepoint_drive_id: Option<String>,
    pub rate_limits: RateLimitConfig,
}

/// What `/health/detailed` reports about each collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStatus {
    pub llm_model: Option<String>,
    pub search_backend: &'static str,
    pub search_top_k: usize,
    pub graph_configured: bool,
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub generation: Option<Arc<GenerationService>>,
    pub publishing: Arc<PublishService>,
    pub store: Arc<ReportStore>,
    pub templates: Arc<TemplateCatalog>,
    pub auth: Arc<AuthTokens>,
    pub rate_limiter: RateLimiter,
    pub inflight: InFlight,
    pub integrations: IntegrationStatus,
}

impl AppState {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `AUTH_TOKENS` is malformed.
    pub fn new(settings: Settings, templates: TemplateCatalog, integrations: Integrations) -> Result<Self, ConfigError> {
        let auth = match &settings.auth_tokens {
            Some(raw) => AuthTokens::parse(raw.expose_secret())?,
            None => AuthTokens::disabled(),
        };

        let store = Arc::new(ReportStore::new());
        let templates = Arc::new(templates);
        let inflight = InFlight::new();

        let status = IntegrationStatus {
            llm_model: integrations.llm.as_ref().map(|llm| llm.model().to_string()),
            search_backend: integrations.search.backend(),
            search_top_k: integrations.search_top_k,
            graph_configured: integrations.publisher.is_some(),
        };

        let generation = integrations.llm.map(|llm| {
            Arc::new(GenerationService::new(
                CompletionService::new(llm),
                RagService::new(integrations.search, integrations.search_min_score),
                Arc::clone(&templates),
                Arc::clone(&store),
                GenerationOptions {
                    max_words_limit: settings.max_words_limit(),
                    default_citation_format: settings.citation_format,
                    enable_fact_check: settings.enable_fact_check,
                },
            ))
        });

        let publishing = Arc::new(PublishService::new(
            integrations.publisher,
            integrations.sharepoint_site_id,
            integrations.sharepoint_drive_id,
            Arc::clone(&store),
            inflight.clone(),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            generation,
            publishing,
            store,
            templates,
            auth: Arc::new(auth),
            rate_limiter: RateLimiter::new(integrations.rate_limits),
            inflight,
            integrations: status,
        })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::graph::{DriveTarget, GraphError, PostedMessage, UploadedFile};
    use crate::llm::types::{ChatRequest, ChatResponse, LlmError};
    use crate::search::memory::{InMemoryIndex, IndexedDocument};

    // -------------------------------------------------------------------------
    // LLM
    // -------------------------------------------------------------------------

    /// Successful response carrying `text`; 10 input and 20 output tokens.
    #[must_use]
    pub fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            text: text.to_string(),
            model: "mock-model".into(),
            stop_reason: "stop".into(),
            input_tokens: 10,
            output_tokens: 20,
        }
    }

    /// Scripted LLM: answers from a queue, then `"done"` once it runs dry.
    /// Every request is recorded before the optional delay.
    pub struct MockLlm {
        results: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
        requests: Mutex<Vec<ChatRequest>>,
        delay: Option<Duration>,
    }

    impl MockLlm {
        pub fn new<I, S>(texts: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::with_results(
                texts
                    .into_iter()
                    .map(|t| {
                        let text: String = t.into();
                        Ok(text_response(&text))
                    })
                    .collect(),
            )
        }

        #[must_use]
        pub fn with_results(results: Vec<Result<ChatResponse, LlmError>>) -> Self {
            Self { results: Mutex::new(results.into()), requests: Mutex::new(Vec::new()), delay: None }
        }

        /// Sleep for `delay` before answering each request.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        #[must_use]
        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for MockLlm {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Ok(text_response("done")))
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    /// A plan titled "Generated Plan" with one 200-word section per title,
    /// each researching its own title.
    #[must_use]
    pub fn plan_json(titles: &[&str]) -> String {
        let sections: Vec<serde_json::Value> = titles
            .iter()
            .map(|t| {
                serde_json::json!({
                    "title": t,
                    "description": format!("About {t}"),
                    "research_queries": [t],
                    "word_count_target": 200
                })
            })
            .collect();
        serde_json::json!({
            "title": "Generated Plan",
            "executive_summary_needed": true,
            "overall_strategy": "Lead with data",
            "key_points": ["growth", "risk"],
            "sections": sections
        })
        .to_string()
    }

    // -------------------------------------------------------------------------
    // GRAPH
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    pub struct RecordedUpload {
        pub target: DriveTarget,
        pub folder_path: String,
        pub file_name: String,
        pub content: String,
    }

    #[derive(Debug, Clone)]
    pub struct RecordedMessage {
        pub team_id: String,
        pub channel_id: String,
        pub html: String,
        pub subject: Option<String>,
    }

    /// Publisher that records calls, or fails every call with a fixed status.
    #[derive(Default)]
    pub struct RecordingPublisher {
        uploads: Mutex<Vec<RecordedUpload>>,
        messages: Mutex<Vec<RecordedMessage>>,
        fail_status: Option<u16>,
    }

    impl RecordingPublisher {
        #[must_use]
        pub fn failing(status: u16) -> Self {
            Self { fail_status: Some(status), ..Self::default() }
        }

        #[must_use]
        pub fn uploads(&self) -> Vec<RecordedUpload> {
            self.uploads.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        #[must_use]
        pub fn messages(&self) -> Vec<RecordedMessage> {
            self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        fn check(&self) -> Result<(), GraphError> {
            match self.fail_status {
                Some(status) => Err(GraphError::Response { status, message: "graph unavailable".into() }),
                None => Ok(()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Publisher for RecordingPublisher {
        async fn upload_file(
            &self,
            target: &DriveTarget,
            folder_path: &str,
            file_name: &str,
            content: &str,
        ) -> Result<UploadedFile, GraphError> {
            self.check()?;
            let mut uploads = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
            uploads.push(RecordedUpload {
                target: target.clone(),
                folder_path: folder_path.to_string(),
                file_name: file_name.to_string(),
                content: content.to_string(),
            });
            let path: Vec<&str> = [folder_path, file_name].into_iter().filter(|s| !s.is_empty()).collect();
            Ok(UploadedFile {
                item_id: Some(format!("item-{}", uploads.len())),
                web_url: Some(format!("https://contoso.sharepoint.com/{}", path.join("/"))),
            })
        }

        async fn post_channel_message(
            &self,
            team_id: &str,
            channel_id: &str,
            html: &str,
            subject: Option<&str>,
        ) -> Result<PostedMessage, GraphError> {
            self.check()?;
            let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
            messages.push(RecordedMessage {
                team_id: team_id.to_string(),
                channel_id: channel_id.to_string(),
                html: html.to_string(),
                subject: subject.map(ToString::to_string),
            });
            Ok(PostedMessage {
                message_id: Some(format!("msg-{}", messages.len())),
                web_url: Some(format!("https://teams.microsoft.com/l/message/{channel_id}")),
            })
        }
    }

    // -------------------------------------------------------------------------
    // APP STATE
    // -------------------------------------------------------------------------

    /// Development defaults with no environment applied.
    ///
    /// # Panics
    ///
    /// Panics if the defaults stop parsing.
    #[must_use]
    pub fn test_settings() -> Settings {
        Settings::from_lookup(|_| None).expect("default settings parse")
    }

    #[must_use]
    pub fn test_documents() -> Vec<IndexedDocument> {
        vec![
            IndexedDocument {
                id: "doc-1".into(),
                title: "Cloud Adoption Survey".into(),
                content: "Overview: enterprise cloud adoption reached 78% in 2024.".into(),
                source: Some("Cloud Adoption Survey".into()),
                url: Some("https://contoso.com/cloud-survey".into()),
                page_number: Some(4),
            },
            IndexedDocument {
                id: "doc-2".into(),
                title: "Risk Register".into(),
                content: "Risks: vendor lock-in and cost overruns lead the register.".into(),
                source: Some("Risk Register".into()),
                url: None,
                page_number: None,
            },
        ]
    }

    /// State with the given fakes. `auth_tokens` enables the auth gate.
    ///
    /// # Panics
    ///
    /// Panics if `auth_tokens` is malformed.
    #[must_use]
    pub fn test_app_state_with(
        llm: Option<Arc<MockLlm>>,
        publisher: Option<Arc<RecordingPublisher>>,
        auth_tokens: Option<&str>,
    ) -> AppState {
        let mut settings = test_settings();
        settings.auth_tokens = auth_tokens.map(|raw| SecretString::new(raw.to_string()));
        test_app_state_from(settings, llm, publisher)
    }

    /// State built from `settings` with the given fakes.
    ///
    /// # Panics
    ///
    /// Panics if `settings` holds malformed auth tokens.
    #[must_use]
    pub fn test_app_state_from(
        settings: Settings,
        llm: Option<Arc<MockLlm>>,
        publisher: Option<Arc<RecordingPublisher>>,
    ) -> AppState {
        let integrations = Integrations {
            llm: llm.map(|l| l as Arc<dyn LlmChat>),
            search: Arc::new(InMemoryIndex::new(test_documents())),
            search_top_k: 5,
            search_min_score: 0.0,
            publisher: publisher.map(|p| p as Arc<dyn Publisher>),
            sharepoint_site_id: Some("site-1".into()),
            sharepoint_drive_id: Some("drive-1".into()),
            rate_limits: RateLimitConfig::default(),
        };
        AppState::new(settings, TemplateCatalog::builtin(), integrations).expect("test state builds")
    }

    /// State with a default mock LLM, a recording publisher and auth disabled.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with(
            Some(Arc::new(MockLlm::new(Vec::<String>::new()))),
            Some(Arc::new(RecordingPublisher::default())),
            None,
        )
    }
}
