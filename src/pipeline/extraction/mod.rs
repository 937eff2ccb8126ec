pub mod types;
pub mod llm;
pub mod model;
pub mod parser;
pub mod pattern;
pub mod prompt;

pub use types::*;
pub use llm::*;
pub use model::*;
pub use pattern::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::StrategyKind;
use crate::pipeline::resolve::ResolveOptions;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Model backend unreachable at {0}")]
    Connection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model backend rate limited the request")]
    RateLimited,

    #[error("Model backend returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No API key configured for the model backend")]
    MissingApiKey,
}

/// A way of turning raw text into sections, blocks and field candidates.
///
/// Both operations are infallible: a strategy that cannot produce a real
/// result returns a degraded one (see [`StructureAnalysis::degraded`] and
/// [`FieldCandidateSet::is_all_empty`]) so that the pipeline never fails on
/// extraction alone.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Segment `text` into sections and deal blocks.
    async fn analyze_structure(&self, text: &str) -> StructureAnalysis;

    /// Extract the locally stated fields of one block.
    async fn extract_candidates(&self, block_text: &str, shared: &SharedFieldSet)
        -> FieldCandidateSet;

    /// Defaults the resolver applies for this strategy.
    fn resolve_options(&self) -> ResolveOptions;
}
