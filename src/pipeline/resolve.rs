//! Inheritance resolution: merges section-level shared fields into a block's
//! local candidates.
//!
//! Precedence per field:
//! 1. a local explicit value is kept as is;
//! 2. otherwise a shared value the block inherits is pulled in, canonicalized,
//!    and tagged inherited;
//! 3. otherwise a locally inferred value is kept, or a normalizer default is
//!    applied and tagged inferred;
//! 4. otherwise the field is empty.

use serde::{Deserialize, Serialize};

use crate::models::{FieldName, Provenance};
use crate::pipeline::extraction::{CandidateValue, FieldCandidateSet, RawDealBlock, SharedFieldSet};
use crate::pipeline::normalize::{
    canonical_language, classify_regions, clean_text, infer_language_from_geo,
    infer_pricing_model, normalize_sources, parse_geo_line, parse_percentage,
    parse_pricing_model, split_multi, DEFAULT_LANGUAGE, DEFAULT_SOURCE,
};

/// Defaults applied at step 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveOptions {
    pub language_default: String,
    /// Pattern extraction defaults the source; model extraction does not.
    pub source_default: Option<String>,
    /// Opt-in rule: English when every geo is English-speaking. Checked
    /// before the language default, never merged with it.
    pub infer_language_from_geo: bool,
}

impl ResolveOptions {
    pub fn for_pattern() -> Self {
        Self {
            language_default: DEFAULT_LANGUAGE.to_string(),
            source_default: Some(DEFAULT_SOURCE.to_string()),
            infer_language_from_geo: false,
        }
    }

    pub fn for_model() -> Self {
        Self {
            language_default: DEFAULT_LANGUAGE.to_string(),
            source_default: None,
            infer_language_from_geo: false,
        }
    }

    pub fn with_geo_language(mut self, enabled: bool) -> Self {
        self.infer_language_from_geo = enabled;
        self
    }
}

/// Canonicalize a raw shared value for `field`. Percentages become decimal
/// numbers here, at the moment they leave the shared context.
pub fn canonicalize_shared(field: FieldName, raw: &str) -> Option<CandidateValue> {
    let value = match field {
        FieldName::Partner => CandidateValue::Text(clean_text(raw)),
        FieldName::Language => CandidateValue::Text(canonical_language(&clean_text(raw))),
        FieldName::Source => CandidateValue::List(normalize_sources(raw)),
        FieldName::PricingModel => {
            CandidateValue::Text(parse_pricing_model(raw)?.as_str().to_string())
        }
        FieldName::DeductionLimit => CandidateValue::Number(parse_percentage(raw)?),
        _ => return None,
    };
    (!value.is_blank()).then_some(value)
}

/// Geo codes from whatever shape the geo candidate holds.
fn geo_codes(value: Option<&CandidateValue>) -> Vec<String> {
    match value {
        Some(CandidateValue::List(items)) => items
            .iter()
            .flat_map(|i| split_multi(i))
            .map(|g| g.trim().to_uppercase())
            .collect(),
        Some(CandidateValue::Text(text)) => {
            let parsed = parse_geo_line(text);
            if parsed.is_empty() {
                split_multi(text).into_iter().map(|g| g.to_uppercase()).collect()
            } else {
                parsed
            }
        }
        _ => Vec::new(),
    }
}

/// Resolve one block's candidates against its section's shared fields.
pub fn resolve(
    block: &RawDealBlock,
    shared: &SharedFieldSet,
    local: &FieldCandidateSet,
    options: &ResolveOptions,
) -> FieldCandidateSet {
    let mut resolved = FieldCandidateSet::new();

    // Derived fields go last: language may depend on geo, region on geo,
    // pricing model on the prices.
    let derived = [FieldName::Language, FieldName::Region, FieldName::PricingModel];
    let order = FieldName::ALL
        .iter()
        .copied()
        .filter(|f| !derived.contains(f))
        .chain(derived.iter().copied());

    for field in order {
        let candidate = local.get(field);

        // 1. explicit wins
        if candidate.provenance == Provenance::Explicit && candidate.has_value() {
            if let Some(value) = candidate.value.clone() {
                resolved.set(field, value, Provenance::Explicit);
            }
            continue;
        }

        // 2. inherited from the section
        if block.inherits(field) {
            if let Some(value) = shared.get(field).and_then(|raw| canonicalize_shared(field, raw)) {
                resolved.set(field, value, Provenance::Inherited);
                continue;
            }
        }

        // 3. local inference, then normalizer defaults
        if candidate.has_value() {
            if let Some(value) = candidate.value.clone() {
                resolved.set(field, value, candidate.provenance);
            }
            continue;
        }
        if let Some(value) = default_for(field, &resolved, options) {
            resolved.set_inferred(field, value);
        }
        // 4. otherwise left empty
    }

    resolved
}

fn default_for(
    field: FieldName,
    resolved: &FieldCandidateSet,
    options: &ResolveOptions,
) -> Option<CandidateValue> {
    match field {
        FieldName::Language => {
            let geos = geo_codes(resolved.value(FieldName::Geo));
            let from_geo = options
                .infer_language_from_geo
                .then(|| infer_language_from_geo(&geos))
                .flatten();
            Some(CandidateValue::Text(
                from_geo.map(str::to_string).unwrap_or_else(|| options.language_default.clone()),
            ))
        }
        FieldName::Source => options
            .source_default
            .as_ref()
            .map(|s| CandidateValue::List(vec![s.clone()])),
        FieldName::Region => {
            let geos = geo_codes(resolved.value(FieldName::Geo));
            if geos.is_empty() {
                return None;
            }
            Some(CandidateValue::Text(classify_regions(&geos).to_string()))
        }
        FieldName::PricingModel => infer_pricing_model(
            resolved.has_value(FieldName::Cpa),
            resolved.has_value(FieldName::Crg),
            resolved.has_value(FieldName::Cpl),
        )
        .map(|m| CandidateValue::Text(m.as_str().to_string())),
        _ => None,
    }
}
