//! Field normalizers: pure conversions from raw substrings to canonical values.

pub mod geo;
pub mod language;
pub mod lists;
pub mod percent;
pub mod region;
pub mod text;

pub use geo::*;
pub use language::*;
pub use lists::*;
pub use percent::*;
pub use region::*;
pub use text::*;

use crate::models::PricingModel;

/// Default traffic source applied by the pattern strategy.
pub const DEFAULT_SOURCE: &str = "Facebook";

/// Lenient pricing-model parsing: `"cpa+crg"`, `"CPA / CRG"`, `"crg"` and
/// `"CPA/CRG"` all map to [`PricingModel::CpaCrg`].
pub fn parse_pricing_model(raw: &str) -> Option<PricingModel> {
    let compact: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    match compact.as_str() {
        "CPA" => Some(PricingModel::Cpa),
        "CPL" => Some(PricingModel::Cpl),
        "CPACRG" | "CRG" | "CRGCPA" | "HYBRID" => Some(PricingModel::CpaCrg),
        _ => None,
    }
}

/// Infer a pricing model from which prices are populated.
pub fn infer_pricing_model(cpa: bool, crg: bool, cpl: bool) -> Option<PricingModel> {
    match (cpa, crg, cpl) {
        (true, true, _) => Some(PricingModel::CpaCrg),
        (true, false, _) => Some(PricingModel::Cpa),
        (false, _, true) => Some(PricingModel::Cpl),
        _ => None,
    }
}
