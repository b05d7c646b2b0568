//! # Knowbot Language Model
//!
//! The language-model collaborator shared by indexing and retrieval.
//!
//! ## Features
//!
//! - `LanguageModel` trait with the two operations the core depends on:
//!   section summarization and batched relevance judging
//! - `OpenAiCompatibleModel`: chat-completions client for OpenAI and
//!   compatible servers, JSON response mode
//! - `LexicalModel`: deterministic offline implementation for tooling
//!   and tests
//!
//! Judgments come back as [`RawJudgment`] values with loosely typed
//! fields; validation belongs to the caller.
//!
//! ## Example
//!
//! ```
//! use knowbot_language_model::{LanguageModel, LexicalModel, SummaryRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> knowbot_language_model::Result<()> {
//! let model = LexicalModel::new();
//! let request = SummaryRequest::content(Some("Leave".into()), "Employees get 16 weeks.");
//! let summary = model.summarize(&request).await?;
//! assert_eq!(summary.title, "Leave");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod lexical;
mod openai;
mod prompt;
mod types;

pub use config::LanguageModelConfig;
pub use error::{LanguageModelError, Result};
pub use lexical::LexicalModel;
pub use openai::OpenAiCompatibleModel;
pub use types::{CandidateBrief, RawJudgment, SectionSummary, SummaryInput, SummaryRequest};

use async_trait::async_trait;

/// Reasoning collaborator used to summarize sections and judge relevance.
///
/// Implementations must be safe to call concurrently; callers bound
/// concurrency and apply their own timeouts.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Produce a title and summary for one section
    async fn summarize(&self, request: &SummaryRequest) -> Result<SectionSummary>;

    /// Judge every candidate against `query` in a single call
    async fn judge_relevance(
        &self,
        query: &str,
        candidates: &[CandidateBrief],
    ) -> Result<Vec<RawJudgment>>;
}
