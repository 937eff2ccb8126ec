use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Deal, DealData, DealMetadata, FieldName, PricingModel, Provenance, RegionSet, StrategyKind,
};
use crate::pipeline::extraction::{CandidateValue, FieldCandidateSet};
use crate::pipeline::normalize::{
    canonical_language, classify_regions, clean_text, dedup_case_insensitive,
    normalize_source_list, parse_amount, parse_geo_line, parse_percentage, parse_pricing_model,
    split_multi, DEFAULT_LANGUAGE,
};

/// A field violates its invariant.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: FieldName,
    pub reason: String,
}

impl ValidationError {
    fn new(field: FieldName, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A user-supplied edit could not be applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Invalid value {input:?} for {field}: expected {expected}")]
    InvalidInput {
        field: FieldName,
        expected: &'static str,
        input: String,
    },

    #[error("Edit rejected: {0}")]
    Validation(#[from] ValidationError),
}

impl EditError {
    pub fn field(&self) -> FieldName {
        match self {
            EditError::InvalidInput { field, .. } => *field,
            EditError::Validation(e) => e.field,
        }
    }
}

/// A converted field value, ready to be stored in [`DealData`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Regions(RegionSet),
    Pricing(PricingModel),
    Number(Option<f64>),
    List(Vec<String>),
}

// ═══════════════════════════════════════════════════════════
// Typed conversion shared by building and editing
// ═══════════════════════════════════════════════════════════

fn invalid(field: FieldName, input: &str) -> EditError {
    EditError::InvalidInput {
        field,
        expected: field.expected_format(),
        input: input.to_string(),
    }
}

/// Geo codes from free text: flags and separators are tolerated, every
/// remaining token must be a two-letter code.
fn parse_geo_input(input: &str) -> Option<Vec<String>> {
    let parsed = parse_geo_line(input);
    if !parsed.is_empty() {
        return Some(parsed);
    }
    let upper: Vec<String> = split_multi(&input.replace(' ', ","))
        .into_iter()
        .map(|g| g.to_uppercase())
        .collect();
    let valid = !upper.is_empty()
        && upper
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_uppercase()));
    valid.then_some(upper)
}

/// Convert user or candidate text into a typed value for `field`.
///
/// Percentages accept `"15%"`, `"15"` or `"0.15"` and are stored as decimals.
/// Amounts strip currency symbols. The pricing model must name one of the
/// three models. `"-"` clears optional numbers and funnels.
pub fn parse_field_input(field: FieldName, input: &str) -> Result<FieldValue, EditError> {
    let trimmed = input.trim();
    let clears = matches!(trimmed, "-" | "none" | "null");

    match field {
        FieldName::Partner => {
            let cleaned = clean_text(trimmed);
            if cleaned.is_empty() {
                return Err(invalid(field, input));
            }
            Ok(FieldValue::Text(cleaned))
        }
        FieldName::Language => {
            let cleaned = clean_text(trimmed);
            if cleaned.is_empty() {
                return Err(invalid(field, input));
            }
            Ok(FieldValue::Text(canonical_language(&cleaned)))
        }
        FieldName::Region => {
            let regions = RegionSet::from_str(trimmed).map_err(|_| invalid(field, input))?;
            if regions.is_empty() {
                return Err(invalid(field, input));
            }
            Ok(FieldValue::Regions(regions))
        }
        FieldName::Geo => parse_geo_input(trimmed)
            .map(FieldValue::List)
            .ok_or_else(|| invalid(field, input)),
        FieldName::Source => {
            let sources = normalize_source_list(&[clean_text(trimmed)]);
            if sources.is_empty() {
                return Err(invalid(field, input));
            }
            Ok(FieldValue::List(sources))
        }
        FieldName::PricingModel => parse_pricing_model(trimmed)
            .map(FieldValue::Pricing)
            .ok_or_else(|| invalid(field, input)),
        FieldName::Cpa | FieldName::Cpl => {
            if clears {
                return Ok(FieldValue::Number(None));
            }
            let amount = parse_amount(trimmed).ok_or_else(|| invalid(field, input))?;
            Ok(FieldValue::Number(Some(amount)))
        }
        FieldName::Crg | FieldName::Cr | FieldName::DeductionLimit => {
            if clears {
                return Ok(FieldValue::Number(None));
            }
            let value = parse_percentage(trimmed).ok_or_else(|| invalid(field, input))?;
            Ok(FieldValue::Number(Some(value)))
        }
        FieldName::Funnels => {
            if clears || trimmed.is_empty() {
                return Ok(FieldValue::List(Vec::new()));
            }
            Ok(FieldValue::List(clean_list(&split_multi(trimmed))))
        }
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    dedup_case_insensitive(
        items
            .iter()
            .flat_map(|i| split_multi(i))
            .map(|i| clean_text(&i))
            .filter(|i| !i.is_empty()),
    )
}

/// Store a converted value into the record.
fn assign(data: &mut DealData, field: FieldName, value: FieldValue) -> Result<(), ValidationError> {
    let mismatch = || ValidationError::new(field, "value has the wrong type");
    match (field, value) {
        (FieldName::Partner, FieldValue::Text(v)) => data.partner = v,
        (FieldName::Language, FieldValue::Text(v)) => data.language = v,
        (FieldName::Region, FieldValue::Regions(v)) => data.region = v,
        (FieldName::Geo, FieldValue::List(v)) => data.geo = v,
        (FieldName::Source, FieldValue::List(v)) => data.source = v,
        (FieldName::Funnels, FieldValue::List(v)) => data.funnels = v,
        (FieldName::PricingModel, FieldValue::Pricing(v)) => data.pricing_model = v,
        (FieldName::Cpa, FieldValue::Number(v)) => data.cpa = v,
        (FieldName::Crg, FieldValue::Number(v)) => data.crg = v,
        (FieldName::Cpl, FieldValue::Number(v)) => data.cpl = v,
        (FieldName::Cr, FieldValue::Number(v)) => data.cr = v,
        (FieldName::DeductionLimit, FieldValue::Number(v)) => data.deduction_limit = v,
        _ => return Err(mismatch()),
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════

/// Check every record invariant.
pub fn validate(data: &DealData) -> Result<(), ValidationError> {
    if data.partner.trim().is_empty() {
        return Err(ValidationError::new(FieldName::Partner, "partner is required"));
    }
    if data.geo.is_empty() {
        return Err(ValidationError::new(FieldName::Geo, "at least one geo is required"));
    }
    if let Some(bad) = data
        .geo
        .iter()
        .find(|g| g.len() != 2 || !g.chars().all(|c| c.is_ascii_uppercase()))
    {
        return Err(ValidationError::new(
            FieldName::Geo,
            format!("{bad:?} is not a two-letter country code"),
        ));
    }
    if data.region.is_empty() {
        return Err(ValidationError::new(FieldName::Region, "region is required"));
    }
    if data.source.is_empty() {
        return Err(ValidationError::new(FieldName::Source, "at least one source is required"));
    }
    if data.funnels.iter().any(|f| f.trim().is_empty()) {
        return Err(ValidationError::new(FieldName::Funnels, "funnel names must not be empty"));
    }

    for (field, value) in [(FieldName::Cpa, data.cpa), (FieldName::Cpl, data.cpl)] {
        if let Some(v) = value {
            if !v.is_finite() || v <= 0.0 {
                return Err(ValidationError::new(field, format!("must be positive, got {v}")));
            }
        }
    }
    for (field, value) in [
        (FieldName::Crg, data.crg),
        (FieldName::Cr, data.cr),
        (FieldName::DeductionLimit, data.deduction_limit),
    ] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(ValidationError::new(
                    field,
                    format!("must be between 0% and 100%, got {v}"),
                ));
            }
        }
    }

    match data.pricing_model {
        PricingModel::CpaCrg if data.cpa.is_none() || data.crg.is_none() => Err(
            ValidationError::new(FieldName::PricingModel, "CPA/CRG requires both cpa and crg"),
        ),
        PricingModel::Cpl if data.cpl.is_none() => Err(ValidationError::new(
            FieldName::PricingModel,
            "CPL requires cpl",
        )),
        PricingModel::Cpa if data.cpa.is_none() => Err(ValidationError::new(
            FieldName::PricingModel,
            "CPA requires cpa",
        )),
        _ => Ok(()),
    }
}

// ═══════════════════════════════════════════════════════════
// Building
// ═══════════════════════════════════════════════════════════

/// Turns resolved candidates into validated [`Deal`]s.
#[derive(Debug, Clone, Copy)]
pub struct DealBuilder {
    strategy: StrategyKind,
}

impl DealBuilder {
    pub fn new(strategy: StrategyKind) -> Self {
        Self { strategy }
    }

    /// Build a deal, or fail with the first violated invariant. Never
    /// returns a partially built record.
    pub fn build(&self, candidates: &FieldCandidateSet, raw_text: &str) -> Result<Deal, ValidationError> {
        let mut flags: BTreeMap<FieldName, Provenance> = FieldName::ALL
            .iter()
            .map(|f| (*f, candidates.provenance(*f)))
            .collect();

        let text_of = |field: FieldName| -> Option<String> {
            candidates
                .value(field)
                .map(CandidateValue::as_text)
                .filter(|s| !s.trim().is_empty())
        };

        let partner = text_of(FieldName::Partner)
            .map(|p| clean_text(&p))
            .unwrap_or_default();

        let geo = match candidates.value(FieldName::Geo) {
            Some(CandidateValue::List(items)) => {
                items.iter().map(|g| clean_text(g).to_uppercase()).collect()
            }
            Some(other) => parse_geo_input(&other.as_text()).ok_or_else(|| {
                ValidationError::new(FieldName::Geo, format!("cannot read geo from {:?}", other.as_text()))
            })?,
            None => Vec::new(),
        };
        let geo = dedup_case_insensitive(geo.into_iter().filter(|g: &String| !g.is_empty()));

        let region = match text_of(FieldName::Region) {
            Some(raw) => RegionSet::from_str(&raw)
                .map_err(|_| ValidationError::new(FieldName::Region, format!("unknown region {raw:?}")))?,
            None => {
                flags.insert(FieldName::Region, Provenance::Inferred);
                classify_regions(&geo)
            }
        };

        let language = match text_of(FieldName::Language) {
            Some(raw) => canonical_language(&clean_text(&raw)),
            None => {
                flags.insert(FieldName::Language, Provenance::Inferred);
                DEFAULT_LANGUAGE.to_string()
            }
        };

        let source = match candidates.value(FieldName::Source) {
            Some(CandidateValue::List(items)) => normalize_source_list(items),
            Some(other) => normalize_source_list(&[other.as_text()]),
            None => Vec::new(),
        };

        let funnels = match candidates.value(FieldName::Funnels) {
            Some(CandidateValue::List(items)) => clean_list(items),
            Some(other) => clean_list(&[other.as_text()]),
            None => Vec::new(),
        };

        let amount = |field: FieldName| -> Result<Option<f64>, ValidationError> {
            match candidates.value(field) {
                Some(CandidateValue::Number(n)) => Ok(Some(*n)),
                Some(other) => parse_amount(&other.as_text()).map(Some).ok_or_else(|| {
                    ValidationError::new(field, format!("not an amount: {:?}", other.as_text()))
                }),
                None => Ok(None),
            }
        };
        let percentage = |field: FieldName| -> Result<Option<f64>, ValidationError> {
            match candidates.value(field) {
                Some(CandidateValue::Number(n)) => Ok(Some(*n)),
                Some(other) => parse_percentage(&other.as_text()).map(Some).ok_or_else(|| {
                    ValidationError::new(field, format!("not a percentage: {:?}", other.as_text()))
                }),
                None => Ok(None),
            }
        };

        let cpa = amount(FieldName::Cpa)?;
        let cpl = amount(FieldName::Cpl)?;
        let crg = percentage(FieldName::Crg)?;
        let cr = percentage(FieldName::Cr)?;
        let deduction_limit = percentage(FieldName::DeductionLimit)?;

        let pricing_model = match text_of(FieldName::PricingModel) {
            Some(raw) => parse_pricing_model(&raw).ok_or_else(|| {
                ValidationError::new(FieldName::PricingModel, format!("unknown pricing model {raw:?}"))
            })?,
            None => {
                flags.insert(FieldName::PricingModel, Provenance::Inferred);
                crate::pipeline::normalize::infer_pricing_model(
                    cpa.is_some(),
                    crg.is_some(),
                    cpl.is_some(),
                )
                .ok_or_else(|| {
                    ValidationError::new(FieldName::PricingModel, "no price to infer a pricing model from")
                })?
            }
        };

        let data = DealData {
            partner,
            region,
            geo,
            language,
            source,
            pricing_model,
            cpa,
            crg,
            cpl,
            funnels,
            cr,
            deduction_limit,
        };
        validate(&data)?;

        // Flags mirror the final values: a field left empty stays empty.
        for field in FieldName::ALL {
            if is_field_empty(&data, *field) {
                flags.insert(*field, Provenance::Empty);
            }
        }
        let shared_fields = flags
            .iter()
            .filter(|(_, p)| **p == Provenance::Inherited)
            .map(|(f, _)| *f)
            .collect();

        Ok(Deal {
            id: Uuid::new_v4(),
            raw_text: raw_text.to_string(),
            parsed_data: data,
            metadata: DealMetadata {
                confidence_flags: flags,
                shared_fields,
                strategy: self.strategy,
                created_at: Utc::now(),
            },
        })
    }
}

fn is_field_empty(data: &DealData, field: FieldName) -> bool {
    match field {
        FieldName::Cpa => data.cpa.is_none(),
        FieldName::Crg => data.crg.is_none(),
        FieldName::Cpl => data.cpl.is_none(),
        FieldName::Cr => data.cr.is_none(),
        FieldName::DeductionLimit => data.deduction_limit.is_none(),
        FieldName::Funnels => data.funnels.is_empty(),
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════
// Editing
// ═══════════════════════════════════════════════════════════

/// Apply a user edit to one field of `deal`.
///
/// The input is converted with [`parse_field_input`], the whole record is
/// re-validated, and the field is flagged explicit. Editing the geo
/// re-derives the region unless the region itself was set explicitly. On
/// any error the deal is left untouched.
pub fn apply_edit(deal: &mut Deal, field: FieldName, input: &str) -> Result<(), EditError> {
    let value = parse_field_input(field, input)?;
    let mut data = deal.parsed_data.clone();
    assign(&mut data, field, value)?;

    let rederive_region =
        field == FieldName::Geo && deal.flag(FieldName::Region) != Provenance::Explicit;
    if rederive_region {
        data.region = classify_regions(&data.geo);
    }

    validate(&data)?;

    deal.parsed_data = data;
    let flags = &mut deal.metadata.confidence_flags;
    // A cleared field is still a user decision
    flags.insert(field, Provenance::Explicit);
    if rederive_region {
        flags.insert(FieldName::Region, Provenance::Inferred);
    }
    deal.metadata.shared_fields.retain(|f| *f != field);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;

    fn sutra_candidates() -> FieldCandidateSet {
        let mut set = FieldCandidateSet::new();
        set.set(FieldName::Partner, CandidateValue::Text("Sutra".into()), Provenance::Inherited);
        set.set_explicit(FieldName::Geo, CandidateValue::List(vec!["AU".into()]));
        set.set_inferred(FieldName::Region, CandidateValue::Text("TIER1".into()));
        set.set_inferred(FieldName::Language, CandidateValue::Text("Native".into()));
        set.set_explicit(FieldName::Source, CandidateValue::List(vec!["Facebook".into()]));
        set.set_inferred(FieldName::PricingModel, CandidateValue::Text("CPA/CRG".into()));
        set.set_explicit(FieldName::Cpa, CandidateValue::Number(1300.0));
        set.set_explicit(FieldName::Crg, CandidateValue::Number(0.13));
        set.set_explicit(FieldName::Funnels, CandidateValue::List(vec!["Beatskai iq".into()]));
        set
    }

    fn build(set: &FieldCandidateSet) -> Result<Deal, ValidationError> {
        DealBuilder::new(StrategyKind::Pattern).build(set, "AU - 1300+13% - Beatskai iq (fb)")
    }

    #[test]
    fn builds_valid_deal() {
        let deal = build(&sutra_candidates()).unwrap();
        let data = &deal.parsed_data;
        assert_eq!(data.partner, "Sutra");
        assert_eq!(data.geo, vec!["AU"]);
        assert_eq!(data.region, RegionSet::single(Region::Tier1));
        assert_eq!(data.pricing_model, PricingModel::CpaCrg);
        assert_eq!(data.cpa, Some(1300.0));
        assert_eq!(data.crg, Some(0.13));
        assert_eq!(deal.flag(FieldName::Partner), Provenance::Inherited);
        assert_eq!(deal.flag(FieldName::Cpl), Provenance::Empty);
        assert_eq!(deal.metadata.shared_fields, vec![FieldName::Partner]);
        assert_eq!(deal.raw_text, "AU - 1300+13% - Beatskai iq (fb)");
        assert_eq!(deal.metadata.confidence_flags.len(), 12);
    }

    #[test]
    fn crg_out_of_range_rejected() {
        let mut set = sutra_candidates();
        set.set_explicit(FieldName::Crg, CandidateValue::Number(1.3));
        let err = build(&set).unwrap_err();
        assert_eq!(err.field, FieldName::Crg);
    }

    #[test]
    fn non_positive_cpa_rejected() {
        let mut set = sutra_candidates();
        set.set_explicit(FieldName::Cpa, CandidateValue::Number(0.0));
        assert_eq!(build(&set).unwrap_err().field, FieldName::Cpa);
    }

    #[test]
    fn cpa_crg_requires_both_prices() {
        let mut set = sutra_candidates();
        set.clear(FieldName::Crg);
        set.set_explicit(FieldName::PricingModel, CandidateValue::Text("CPA/CRG".into()));
        let err = build(&set).unwrap_err();
        assert_eq!(err.field, FieldName::PricingModel);
    }

    #[test]
    fn cpl_requires_cpl() {
        let mut set = sutra_candidates();
        set.set_explicit(FieldName::PricingModel, CandidateValue::Text("CPL".into()));
        assert_eq!(build(&set).unwrap_err().field, FieldName::PricingModel);
    }

    #[test]
    fn missing_partner_rejected() {
        let mut set = sutra_candidates();
        set.clear(FieldName::Partner);
        assert_eq!(build(&set).unwrap_err().field, FieldName::Partner);
    }

    #[test]
    fn all_empty_candidates_fail_validation() {
        assert!(build(&FieldCandidateSet::new()).is_err());
    }

    #[test]
    fn hygiene_on_text_fields() {
        let mut set = sutra_candidates();
        set.set_explicit(FieldName::Partner, CandidateValue::Text(" 🚀 Sutra\u{200B} ".into()));
        set.set_explicit(
            FieldName::Funnels,
            CandidateValue::List(vec!["A | B".into(), "a".into(), "✅ C".into()]),
        );
        let deal = build(&set).unwrap();
        assert_eq!(deal.parsed_data.partner, "Sutra");
        assert_eq!(deal.parsed_data.funnels, vec!["A", "B", "C"]);
    }

    #[test]
    fn textual_numbers_converted() {
        let mut set = sutra_candidates();
        set.set_explicit(FieldName::Cpa, CandidateValue::Text("$1,300".into()));
        set.set_explicit(FieldName::Crg, CandidateValue::Text("13%".into()));
        let deal = build(&set).unwrap();
        assert_eq!(deal.parsed_data.cpa, Some(1300.0));
        assert_eq!(deal.parsed_data.crg, Some(0.13));
    }

    #[test]
    fn edit_crg_percentage() {
        let mut deal = build(&sutra_candidates()).unwrap();
        deal.apply_edit(FieldName::Crg, "15%").unwrap();
        assert_eq!(deal.parsed_data.crg, Some(0.15));
        assert_eq!(deal.flag(FieldName::Crg), Provenance::Explicit);
    }

    #[test]
    fn invalid_edit_leaves_deal_unchanged() {
        let mut deal = build(&sutra_candidates()).unwrap();
        let before = deal.clone();
        let err = deal.apply_edit(FieldName::Crg, "abc").unwrap_err();
        assert!(matches!(err, EditError::InvalidInput { field: FieldName::Crg, .. }));
        assert_eq!(deal, before);
    }

    #[test]
    fn edit_violating_invariant_rejected() {
        let mut deal = build(&sutra_candidates()).unwrap();
        let before = deal.clone();
        let err = deal.apply_edit(FieldName::Crg, "150%").unwrap_err();
        assert!(matches!(err, EditError::Validation(_)));
        let err = deal.apply_edit(FieldName::Crg, "-").unwrap_err();
        assert!(matches!(err, EditError::Validation(_)));
        assert_eq!(deal, before);
    }

    #[test]
    fn pricing_model_edit_validated_against_enumeration() {
        let mut deal = build(&sutra_candidates()).unwrap();
        assert!(deal.apply_edit(FieldName::PricingModel, "flat").is_err());
        deal.apply_edit(FieldName::PricingModel, "cpa").unwrap();
        assert_eq!(deal.parsed_data.pricing_model, PricingModel::Cpa);
        assert_eq!(deal.flag(FieldName::PricingModel), Provenance::Explicit);
    }

    #[test]
    fn editing_geo_rederives_region() {
        let mut deal = build(&sutra_candidates()).unwrap();
        deal.apply_edit(FieldName::Geo, "NO FI").unwrap();
        assert_eq!(deal.parsed_data.geo, vec!["NO", "FI"]);
        assert_eq!(deal.parsed_data.region, RegionSet::single(Region::Nordics));
        assert_eq!(deal.flag(FieldName::Region), Provenance::Inferred);
    }

    #[test]
    fn explicit_region_survives_geo_edit() {
        let mut deal = build(&sutra_candidates()).unwrap();
        deal.apply_edit(FieldName::Region, "TIER3").unwrap();
        deal.apply_edit(FieldName::Geo, "BR").unwrap();
        assert_eq!(deal.parsed_data.region, RegionSet::single(Region::Tier3));
    }

    #[test]
    fn edited_inherited_field_leaves_shared_list() {
        let mut deal = build(&sutra_candidates()).unwrap();
        deal.apply_edit(FieldName::Partner, "Deum").unwrap();
        assert!(deal.metadata.shared_fields.is_empty());
        assert_eq!(deal.flag(FieldName::Partner), Provenance::Explicit);
    }

    #[test]
    fn funnels_can_be_cleared() {
        let mut deal = build(&sutra_candidates()).unwrap();
        deal.apply_edit(FieldName::Funnels, "-").unwrap();
        assert!(deal.parsed_data.funnels.is_empty());
        assert_eq!(deal.flag(FieldName::Funnels), Provenance::Explicit);
    }

    #[test]
    fn cleared_optional_number_is_explicit() {
        let mut deal = build(&sutra_candidates()).unwrap();
        deal.apply_edit(FieldName::Cr, "5%").unwrap();
        deal.apply_edit(FieldName::Cr, "-").unwrap();
        assert_eq!(deal.parsed_data.cr, None);
        assert_eq!(deal.flag(FieldName::Cr), Provenance::Explicit);
    }

    #[test]
    fn negative_edits_rejected_not_flipped() {
        assert_eq!(
            parse_field_input(FieldName::Cpl, "-25").unwrap(),
            FieldValue::Number(Some(-25.0))
        );

        let mut deal = build(&sutra_candidates()).unwrap();
        let before = deal.clone();
        let err = deal.apply_edit(FieldName::Cpa, "-100").unwrap_err();
        assert!(matches!(err, EditError::Validation(ref e) if e.field == FieldName::Cpa));
        let err = deal.apply_edit(FieldName::Crg, "-10%").unwrap_err();
        assert!(matches!(err, EditError::Validation(ref e) if e.field == FieldName::Crg));
        assert_eq!(deal, before);
    }

    #[test]
    fn field_input_parsing() {
        assert_eq!(
            parse_field_input(FieldName::Cpl, "€ 25").unwrap(),
            FieldValue::Number(Some(25.0))
        );
        assert_eq!(
            parse_field_input(FieldName::Source, "fb / gg").unwrap(),
            FieldValue::List(vec!["Facebook".into(), "Google".into()])
        );
        assert_eq!(
            parse_field_input(FieldName::Geo, "de, at").unwrap(),
            FieldValue::List(vec!["DE".into(), "AT".into()])
        );
        assert!(parse_field_input(FieldName::Geo, "Germany").is_err());
        assert!(parse_field_input(FieldName::Region, "EUROPE").is_err());
        assert!(parse_field_input(FieldName::Partner, "   ").is_err());
    }
}
