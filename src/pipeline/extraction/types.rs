use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{FieldName, Provenance};

/// Result of segmenting one inbound message into sections and deal blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub sections: Vec<RawSection>,
    /// Set when the analysis is a fallback rather than a real segmentation.
    pub degraded: bool,
}

impl StructureAnalysis {
    /// Single block spanning the whole input with no shared context.
    pub fn single_block(text: &str) -> Self {
        Self {
            sections: vec![RawSection {
                text: text.to_string(),
                shared: SharedFieldSet::new(),
                blocks: vec![RawDealBlock {
                    text: text.to_string(),
                    inherits_from: Vec::new(),
                }],
            }],
            degraded: false,
        }
    }

    /// The best-effort result returned when analysis fails.
    pub fn degraded(text: &str) -> Self {
        Self {
            degraded: true,
            ..Self::single_block(text)
        }
    }

    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }
}

/// A contiguous span of input sharing one context (usually one partner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
    pub text: String,
    pub shared: SharedFieldSet,
    pub blocks: Vec<RawDealBlock>,
}

/// Raw text of one deal and the shared fields it may inherit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDealBlock {
    pub text: String,
    pub inherits_from: Vec<FieldName>,
}

impl RawDealBlock {
    pub fn inherits(&self, field: FieldName) -> bool {
        self.inherits_from.contains(&field)
    }
}

// ═══════════════════════════════════════════════════════════
// SharedFieldSet: section-level raw values
// ═══════════════════════════════════════════════════════════

/// Raw, unnormalized values stated once for a whole section. Only the
/// shareable fields (see [`FieldName::SHAREABLE`]) are admitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedFieldSet {
    values: BTreeMap<FieldName, String>,
}

impl SharedFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw value. Returns false (and stores nothing) when the field
    /// is not shareable or the value is blank.
    pub fn insert(&mut self, field: FieldName, raw: &str) -> bool {
        let raw = raw.trim();
        if !field.is_shareable() || raw.is_empty() {
            return false;
        }
        self.values.insert(field, raw.to_string());
        true
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Overlay `other` on a copy of `self`.
    pub fn merged_with(&self, other: &SharedFieldSet) -> SharedFieldSet {
        let mut merged = self.clone();
        for (field, value) in other.iter() {
            merged.insert(field, value);
        }
        merged
    }
}

// ═══════════════════════════════════════════════════════════
// FieldCandidateSet: per-block candidates with provenance
// ═══════════════════════════════════════════════════════════

/// A raw candidate value before type conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateValue {
    Number(f64),
    List(Vec<String>),
    Text(String),
}

impl CandidateValue {
    /// Blank strings and empty lists carry no information.
    pub fn is_blank(&self) -> bool {
        match self {
            CandidateValue::Text(s) => s.trim().is_empty(),
            CandidateValue::List(items) => items.iter().all(|i| i.trim().is_empty()),
            CandidateValue::Number(n) => !n.is_finite(),
        }
    }

    /// Text view: lists joined with ", ", numbers formatted plainly.
    pub fn as_text(&self) -> String {
        match self {
            CandidateValue::Text(s) => s.clone(),
            CandidateValue::List(items) => items.join(", "),
            CandidateValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub value: Option<CandidateValue>,
    pub provenance: Provenance,
}

impl FieldCandidate {
    pub fn empty() -> Self {
        Self {
            value: None,
            provenance: Provenance::Empty,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_blank())
    }
}

/// Candidates for every field of a deal. All twelve keys are always present;
/// an absent value is tagged [`Provenance::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidateSet {
    fields: BTreeMap<FieldName, FieldCandidate>,
}

impl Default for FieldCandidateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldCandidateSet {
    pub fn new() -> Self {
        let fields = FieldName::ALL
            .iter()
            .map(|f| (*f, FieldCandidate::empty()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: FieldName) -> &FieldCandidate {
        // new() seeds every key and nothing removes them
        static EMPTY: FieldCandidate = FieldCandidate {
            value: None,
            provenance: Provenance::Empty,
        };
        self.fields.get(&field).unwrap_or(&EMPTY)
    }

    /// Set a value with its provenance. Blank values are stored as empty.
    pub fn set(&mut self, field: FieldName, value: CandidateValue, provenance: Provenance) {
        let candidate = if value.is_blank() || provenance == Provenance::Empty {
            FieldCandidate::empty()
        } else {
            FieldCandidate {
                value: Some(value),
                provenance,
            }
        };
        self.fields.insert(field, candidate);
    }

    pub fn set_explicit(&mut self, field: FieldName, value: CandidateValue) {
        self.set(field, value, Provenance::Explicit);
    }

    pub fn set_inferred(&mut self, field: FieldName, value: CandidateValue) {
        self.set(field, value, Provenance::Inferred);
    }

    pub fn clear(&mut self, field: FieldName) {
        self.fields.insert(field, FieldCandidate::empty());
    }

    pub fn provenance(&self, field: FieldName) -> Provenance {
        self.get(field).provenance
    }

    pub fn value(&self, field: FieldName) -> Option<&CandidateValue> {
        self.get(field).value.as_ref()
    }

    pub fn has_value(&self, field: FieldName) -> bool {
        self.get(field).has_value()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldCandidate)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// True when no field carries a value, the shape of a degraded extraction.
    pub fn is_all_empty(&self) -> bool {
        self.fields.values().all(|c| !c.has_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_candidate_set_has_every_field_empty() {
        let set = FieldCandidateSet::new();
        assert_eq!(set.iter().count(), 12);
        for field in FieldName::ALL {
            assert_eq!(set.provenance(*field), Provenance::Empty);
            assert!(set.value(*field).is_none());
        }
        assert!(set.is_all_empty());
    }

    #[test]
    fn blank_value_stored_as_empty() {
        let mut set = FieldCandidateSet::new();
        set.set_explicit(FieldName::Partner, CandidateValue::Text("  ".into()));
        assert_eq!(set.provenance(FieldName::Partner), Provenance::Empty);
        set.set_explicit(FieldName::Funnels, CandidateValue::List(vec![]));
        assert_eq!(set.provenance(FieldName::Funnels), Provenance::Empty);
    }

    #[test]
    fn set_and_read_back() {
        let mut set = FieldCandidateSet::new();
        set.set_explicit(FieldName::Cpa, CandidateValue::Number(1300.0));
        assert!(set.has_value(FieldName::Cpa));
        assert_eq!(set.provenance(FieldName::Cpa), Provenance::Explicit);
        assert!(!set.is_all_empty());
    }

    #[test]
    fn shared_set_rejects_non_shareable_fields() {
        let mut shared = SharedFieldSet::new();
        assert!(shared.insert(FieldName::Partner, "Sutra"));
        assert!(!shared.insert(FieldName::Geo, "DE"));
        assert!(!shared.insert(FieldName::Language, "   "));
        assert_eq!(shared.get(FieldName::Partner), Some("Sutra"));
        assert!(!shared.contains(FieldName::Geo));
    }

    #[test]
    fn shared_merge_overlays() {
        let mut base = SharedFieldSet::new();
        base.insert(FieldName::Partner, "A");
        base.insert(FieldName::Language, "Native");
        let mut over = SharedFieldSet::new();
        over.insert(FieldName::Partner, "B");
        let merged = base.merged_with(&over);
        assert_eq!(merged.get(FieldName::Partner), Some("B"));
        assert_eq!(merged.get(FieldName::Language), Some("Native"));
    }

    #[test]
    fn degraded_analysis_is_one_block() {
        let analysis = StructureAnalysis::degraded("anything");
        assert!(analysis.degraded);
        assert_eq!(analysis.block_count(), 1);
        assert!(analysis.sections[0].shared.is_empty());
        assert_eq!(analysis.sections[0].blocks[0].text, "anything");
    }

    #[test]
    fn candidate_value_untagged_json() {
        let v: CandidateValue = serde_json::from_str("1300").unwrap();
        assert_eq!(v, CandidateValue::Number(1300.0));
        let v: CandidateValue = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(v, CandidateValue::List(vec!["a".into(), "b".into()]));
    }
}
