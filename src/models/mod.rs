//! Domain model: reports, sections, citations, templates, users and the
//! generation request/response envelope.

pub mod publish;
pub mod report;
pub mod request;
pub mod template;
pub mod user;

pub use publish::{SharePointPublishRequest, SharePointPublishResponse, TeamsPostRequest, TeamsPostResponse};
pub use report::{
    AgentStep, Citation, CitationFormat, ContentSection, ContentStatus, ContentType, ModelError, Report,
    SectionKind,
};
pub use request::{GenerationRequest, GenerationResponse, MAX_WORDS_CEILING};
pub use template::Template;
pub use user::User;

/// Whitespace-delimited word count, matching how targets are specified.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
