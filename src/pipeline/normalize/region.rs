use crate::models::{Region, RegionSet};

/// Country codes per region bucket. Anything unlisted falls into TIER3.
const LATAM: &[&str] = &[
    "AR", "BO", "BR", "CL", "CO", "CR", "CU", "DO", "EC", "SV", "GT", "HN", "MX", "NI", "PA",
    "PY", "PE", "UY", "VE",
];
const NORDICS: &[&str] = &["DK", "FI", "IS", "NO", "SE"];
const BALTICS: &[&str] = &["EE", "LV", "LT"];
const TIER1: &[&str] = &[
    "AU", "CA", "FR", "DE", "IT", "JP", "NL", "NZ", "SG", "ES", "GB", "US", "UK", "BE", "CH",
    "AT", "IE",
];

/// Classify a two-letter country code into its region bucket.
pub fn classify_region(code: &str) -> Region {
    let code = code.trim().to_uppercase();
    let code = code.as_str();
    if LATAM.contains(&code) {
        Region::Latam
    } else if NORDICS.contains(&code) {
        Region::Nordics
    } else if BALTICS.contains(&code) {
        Region::Baltics
    } else if TIER1.contains(&code) {
        Region::Tier1
    } else {
        Region::Tier3
    }
}

/// Classify every geo of a deal; duplicates collapse, order follows the geos.
pub fn classify_regions<S: AsRef<str>>(geos: &[S]) -> RegionSet {
    geos.iter().map(|g| classify_region(g.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(classify_region("BR"), Region::Latam);
        assert_eq!(classify_region("SE"), Region::Nordics);
        assert_eq!(classify_region("LT"), Region::Baltics);
        assert_eq!(classify_region("US"), Region::Tier1);
        assert_eq!(classify_region("UK"), Region::Tier1);
    }

    #[test]
    fn unknown_code_defaults_to_tier3() {
        assert_eq!(classify_region("ZZ"), Region::Tier3);
        assert_eq!(classify_region("RO"), Region::Tier3);
    }

    #[test]
    fn lowercase_input_accepted() {
        assert_eq!(classify_region(" mx "), Region::Latam);
    }

    #[test]
    fn multi_geo_pipe_joined_and_deduplicated() {
        let regions = classify_regions(&["NO", "FI", "IE", "SE"]);
        assert_eq!(regions.to_string(), "NORDICS|TIER1");
    }

    #[test]
    fn empty_geo_list_gives_empty_set() {
        let geos: [&str; 0] = [];
        assert!(classify_regions(&geos).is_empty());
    }
}
