//! Deal processing pipeline.
//!
//! Single entry point driving raw text through the extraction stages:
//! structure analysis → per-block candidates → inheritance → build.
//!
//! The strategy is injected as a trait object so the pipeline stays testable
//! with either the rule-based or a mocked model-backed strategy.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::Instrument;

use crate::models::Deal;
use crate::pipeline::builder::{DealBuilder, ValidationError};
use crate::pipeline::extraction::ExtractionStrategy;
use crate::pipeline::normalize::remove_invisible_chars;
use crate::pipeline::resolve::resolve;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A block that produced no deal.
#[derive(Debug, Clone, Serialize)]
pub struct BlockFailure {
    pub block_index: usize,
    pub raw_text: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: ValidationError,
}

fn serialize_error<S: serde::Serializer>(e: &ValidationError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&e.to_string())
}

/// Everything one message produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    pub deals: Vec<Deal>,
    pub failures: Vec<BlockFailure>,
    pub block_count: usize,
    /// True when extraction fell back to a best-effort result.
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct DealPipeline {
    strategy: Arc<dyn ExtractionStrategy>,
    builder: DealBuilder,
}

impl DealPipeline {
    pub fn new(strategy: Arc<dyn ExtractionStrategy>) -> Self {
        let builder = DealBuilder::new(strategy.kind());
        Self { strategy, builder }
    }

    pub fn strategy(&self) -> &dyn ExtractionStrategy {
        self.strategy.as_ref()
    }

    /// Process one inbound message. Never fails: blocks that do not validate
    /// are reported in `failures`.
    pub async fn process(&self, text: &str) -> ProcessingReport {
        let span = tracing::info_span!("process", strategy = %self.strategy.kind());
        self.process_inner(text).instrument(span).await
    }

    async fn process_inner(&self, text: &str) -> ProcessingReport {
        let cleaned = remove_invisible_chars(text);
        tracing::debug!(text = %cleaned, "Processing message");

        let analysis = self.strategy.analyze_structure(&cleaned).await;
        let options = self.strategy.resolve_options();

        let blocks: Vec<_> = analysis
            .sections
            .iter()
            .flat_map(|section| section.blocks.iter().map(move |block| (section, block)))
            .collect();

        // Blocks are independent; extract them concurrently
        let candidates = join_all(
            blocks
                .iter()
                .map(|(section, block)| self.strategy.extract_candidates(&block.text, &section.shared)),
        )
        .await;

        let mut report = ProcessingReport {
            deals: Vec::new(),
            failures: Vec::new(),
            block_count: blocks.len(),
            degraded: analysis.degraded,
        };

        for (index, ((section, block), local)) in blocks.iter().zip(candidates).enumerate() {
            if local.is_all_empty() {
                report.degraded = true;
            }
            let resolved = resolve(block, &section.shared, &local, &options);
            match self.builder.build(&resolved, &block.text) {
                Ok(deal) => report.deals.push(deal),
                Err(error) => {
                    tracing::info!(block = index, error = %error, "Block failed validation");
                    report.failures.push(BlockFailure {
                        block_index: index,
                        raw_text: block.text.clone(),
                        error,
                    });
                }
            }
        }

        if report.degraded {
            tracing::warn!(blocks = report.block_count, "Extraction degraded");
        }
        tracing::info!(
            blocks = report.block_count,
            deals = report.deals.len(),
            failures = report.failures.len(),
            "Message processed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldName, PricingModel, Provenance, Region, RegionSet};
    use crate::pipeline::extraction::{MockLlmClient, ModelStrategy, PatternStrategy, RetryPolicy};
    use std::time::Duration;

    const SUTRA: &str = "Partner: Sutra\nAU - 1300+13% - Beatskai iq (fb)\nUK - 1350+10% - Immediate core (native/fb)";

    fn pattern_pipeline() -> DealPipeline {
        DealPipeline::new(Arc::new(PatternStrategy::new()))
    }

    #[tokio::test]
    async fn sutra_scenario() {
        let report = pattern_pipeline().process(SUTRA).await;
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.deals.len(), 2);

        let first = &report.deals[0];
        assert_eq!(first.parsed_data.partner, "Sutra");
        assert_eq!(first.flag(FieldName::Partner), Provenance::Inherited);
        assert_eq!(first.parsed_data.geo, vec!["AU"]);
        assert_eq!(first.parsed_data.region, RegionSet::single(Region::Tier1));
        assert_eq!(first.parsed_data.cpa, Some(1300.0));
        assert_eq!(first.parsed_data.crg, Some(0.13));
        assert!(first.parsed_data.source.contains(&"Facebook".to_string()));
        assert_eq!(first.parsed_data.pricing_model, PricingModel::CpaCrg);

        let second = &report.deals[1];
        assert_eq!(second.parsed_data.partner, "Sutra");
        assert_eq!(second.flag(FieldName::Partner), Provenance::Inherited);
        assert_eq!(second.parsed_data.geo, vec!["UK"]);
        assert_eq!(second.parsed_data.cpa, Some(1350.0));
        assert_eq!(second.parsed_data.crg, Some(0.10));
        assert_eq!(second.parsed_data.source, vec!["Native", "Facebook"]);
    }

    #[tokio::test]
    async fn shared_deduction_converted_to_decimal() {
        let text = "Partner: X\nuntil 5% wrong number\nDE - 1000+10%";
        let report = pattern_pipeline().process(text).await;
        let deal = &report.deals[0];
        assert_eq!(deal.parsed_data.deduction_limit, Some(0.05));
        assert_eq!(deal.flag(FieldName::DeductionLimit), Provenance::Inherited);
    }

    #[tokio::test]
    async fn pattern_defaults_language_and_source() {
        let report = pattern_pipeline().process("Partner: X\nDE - 1000+10%").await;
        let deal = &report.deals[0];
        assert_eq!(deal.parsed_data.language, "Native");
        assert_eq!(deal.parsed_data.source, vec!["Facebook"]);
        assert_eq!(deal.flag(FieldName::Source), Provenance::Inferred);
    }

    #[tokio::test]
    async fn block_without_partner_reported_as_failure() {
        let report = pattern_pipeline().process("DE - 1000+10%").await;
        assert!(report.deals.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error.field, FieldName::Partner);
    }

    #[tokio::test]
    async fn invisible_characters_tolerated() {
        let text = "Partner: Sutra\u{200B}\r\n🇦🇺 AU - 1300+13% - Beatskai iq (fb)";
        let report = pattern_pipeline().process(text).await;
        assert_eq!(report.deals.len(), 1);
        assert_eq!(report.deals[0].parsed_data.partner, "Sutra");
    }

    #[tokio::test]
    async fn model_strategy_output_treated_like_pattern() {
        let structure = r#"{"sections":[{"shared_fields":{"partner":"Sutra"},"deal_blocks":[{"text":"AU - 1300+13% - Beatskai iq (fb)","inherits_from":["partner"]}]}]}"#;
        let candidates = r#"{"parsed_data":{"geo":["AU"],"cpa":1300,"crg":"13%","source":["fb"],"funnels":["Beatskai iq"],"pricing_model":"CPA/CRG"},"metadata":{"confidence_flags":{"geo":"explicit","cpa":"explicit","crg":"explicit","source":"explicit","funnels":"explicit","pricing_model":"explicit"}}}"#;
        let client = MockLlmClient::new(candidates).then(Ok(structure.to_string()));
        let strategy = ModelStrategy::new(Arc::new(client), RetryPolicy::immediate(3), Duration::from_secs(5));
        let report = DealPipeline::new(Arc::new(strategy)).process(SUTRA).await;

        assert!(!report.degraded);
        assert_eq!(report.deals.len(), 1);
        let deal = &report.deals[0];
        assert_eq!(deal.parsed_data.partner, "Sutra");
        assert_eq!(deal.flag(FieldName::Partner), Provenance::Inherited);
        assert_eq!(deal.parsed_data.crg, Some(0.13));
        assert_eq!(deal.parsed_data.source, vec!["Facebook"]);
    }

    #[tokio::test]
    async fn model_failure_degrades_without_failing() {
        let strategy = ModelStrategy::new(
            Arc::new(MockLlmClient::new("not json")),
            RetryPolicy::immediate(3),
            Duration::from_secs(5),
        );
        let report = DealPipeline::new(Arc::new(strategy)).process(SUTRA).await;
        assert!(report.degraded);
        assert_eq!(report.block_count, 1);
        assert!(report.deals.is_empty());
        assert_eq!(report.failures.len(), 1);
    }
}
