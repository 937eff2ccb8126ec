use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::enums::{FieldName, PricingModel, Provenance, Region, StrategyKind};
use crate::db::DatabaseError;

/// A validated advertising deal, ready for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    /// The original block text, kept verbatim for audit and deduplication.
    pub raw_text: String,
    pub parsed_data: DealData,
    pub metadata: DealMetadata,
}

/// Canonical, typed deal fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealData {
    pub partner: String,
    pub region: RegionSet,
    pub geo: Vec<String>,
    pub language: String,
    pub source: Vec<String>,
    pub pricing_model: PricingModel,
    pub cpa: Option<f64>,
    pub crg: Option<f64>,
    pub cpl: Option<f64>,
    pub funnels: Vec<String>,
    pub cr: Option<f64>,
    pub deduction_limit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealMetadata {
    /// Provenance of every `parsed_data` field.
    pub confidence_flags: BTreeMap<FieldName, Provenance>,
    /// Fields whose value came from the enclosing section.
    pub shared_fields: Vec<FieldName>,
    pub strategy: StrategyKind,
    pub created_at: DateTime<Utc>,
}

impl Deal {
    pub fn flag(&self, field: FieldName) -> Provenance {
        self.metadata
            .confidence_flags
            .get(&field)
            .copied()
            .unwrap_or(Provenance::Empty)
    }

    /// Apply a user-supplied value to one field.
    ///
    /// The value is converted with the same rules the builder uses, the whole
    /// record is re-validated, and the field is flagged explicit. On error the
    /// deal is left untouched.
    pub fn apply_edit(
        &mut self,
        field: FieldName,
        input: &str,
    ) -> Result<(), crate::pipeline::builder::EditError> {
        crate::pipeline::builder::apply_edit(self, field, input)
    }
}

impl DealData {
    /// First geo code, used for single-line summaries.
    pub fn primary_geo(&self) -> &str {
        self.geo.first().map(String::as_str).unwrap_or("")
    }
}

// ═══════════════════════════════════════════════════════════
// RegionSet: one region per distinct geo bucket
// ═══════════════════════════════════════════════════════════

/// Ordered, duplicate-free set of regions. A multi-geo deal spanning two
/// buckets renders as `TIER1|NORDICS`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionSet(Vec<Region>);

impl RegionSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(region: Region) -> Self {
        Self(vec![region])
    }

    /// Add a region unless already present.
    pub fn insert(&mut self, region: Region) {
        if !self.0.contains(&region) {
            self.0.push(region);
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Region> for RegionSet {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        let mut set = RegionSet::new();
        for region in iter {
            set.insert(region);
        }
        set
    }
}

impl fmt::Display for RegionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(|r| r.as_str()).collect();
        f.write_str(&joined.join("|"))
    }
}

impl FromStr for RegionSet {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = RegionSet::new();
        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            set.insert(Region::from_str(&part.to_uppercase())?);
        }
        Ok(set)
    }
}

impl Serialize for RegionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RegionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RegionSet::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_set_dedups_in_order() {
        let set: RegionSet = [Region::Tier1, Region::Nordics, Region::Tier1]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "TIER1|NORDICS");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn region_set_parses_pipe_joined() {
        let set = RegionSet::from_str("latam | TIER3").unwrap();
        assert_eq!(set.regions(), &[Region::Latam, Region::Tier3]);
    }

    #[test]
    fn region_set_rejects_unknown() {
        assert!(RegionSet::from_str("EUROPE").is_err());
    }

    #[test]
    fn region_set_serializes_as_string() {
        let set = RegionSet::single(Region::Baltics);
        assert_eq!(serde_json::to_string(&set).unwrap(), "\"BALTICS\"");
        let back: RegionSet = serde_json::from_str("\"BALTICS|LATAM\"").unwrap();
        assert_eq!(back.len(), 2);
    }
}
