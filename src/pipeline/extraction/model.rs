use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::llm::{complete_with_retry, LlmClient, RetryPolicy};
use super::parser::{parse_candidate_response, parse_structure_response};
use super::prompt::{build_candidate_messages, build_structure_messages};
use super::types::{FieldCandidateSet, SharedFieldSet, StructureAnalysis};
use super::{ExtractionStrategy, LlmError};
use crate::models::StrategyKind;
use crate::pipeline::resolve::ResolveOptions;

/// Extraction delegated to a text-completion backend.
///
/// Every call is bounded by `timeout` (retries included). Any failure is
/// logged and replaced by a degraded result.
pub struct ModelStrategy {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
    timeout: Duration,
    options: ResolveOptions,
}

impl ModelStrategy {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            policy,
            timeout,
            options: ResolveOptions::for_model(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    async fn call(&self, messages: &[super::llm::ChatMessage]) -> Result<String, LlmError> {
        match tokio::time::timeout(
            self.timeout,
            complete_with_retry(self.client.as_ref(), messages, &self.policy),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for ModelStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Model
    }

    async fn analyze_structure(&self, text: &str) -> StructureAnalysis {
        let messages = build_structure_messages(text);
        let result = self
            .call(&messages)
            .await
            .and_then(|response| parse_structure_response(&response));

        match result {
            Ok(analysis) => {
                tracing::debug!(
                    model = self.client.model_name(),
                    sections = analysis.sections.len(),
                    blocks = analysis.block_count(),
                    "Model structure analysis complete"
                );
                analysis
            }
            Err(e) => {
                tracing::warn!(
                    model = self.client.model_name(),
                    error = %e,
                    "Structure analysis degraded to a single block"
                );
                StructureAnalysis::degraded(text)
            }
        }
    }

    async fn extract_candidates(
        &self,
        block_text: &str,
        shared: &SharedFieldSet,
    ) -> FieldCandidateSet {
        let messages = build_candidate_messages(block_text, shared);
        let result = self
            .call(&messages)
            .await
            .and_then(|response| parse_candidate_response(&response));

        result.unwrap_or_else(|e| {
            tracing::warn!(
                model = self.client.model_name(),
                error = %e,
                "Candidate extraction degraded to empty candidates"
            );
            FieldCandidateSet::new()
        })
    }

    fn resolve_options(&self) -> ResolveOptions {
        self.options.clone()
    }
}
