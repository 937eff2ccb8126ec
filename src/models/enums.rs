use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Region {
    Latam => "LATAM",
    Nordics => "NORDICS",
    Baltics => "BALTICS",
    Tier1 => "TIER1",
    Tier3 => "TIER3",
});

str_enum!(PricingModel {
    Cpa => "CPA",
    Cpl => "CPL",
    CpaCrg => "CPA/CRG",
});

str_enum!(Provenance {
    Explicit => "explicit",
    Inherited => "inherited",
    Inferred => "inferred",
    Empty => "empty",
});

str_enum!(FieldName {
    Partner => "partner",
    Region => "region",
    Geo => "geo",
    Language => "language",
    Source => "source",
    PricingModel => "pricing_model",
    Cpa => "cpa",
    Crg => "crg",
    Cpl => "cpl",
    Funnels => "funnels",
    Cr => "cr",
    DeductionLimit => "deduction_limit",
});

str_enum!(DealStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(StrategyKind {
    Pattern => "pattern",
    Model => "model",
});

impl FieldName {
    /// Fields a section may state once for all of its deal blocks.
    pub const SHAREABLE: &'static [FieldName] = &[
        FieldName::Partner,
        FieldName::Language,
        FieldName::Source,
        FieldName::PricingModel,
        FieldName::DeductionLimit,
    ];

    pub fn is_shareable(&self) -> bool {
        Self::SHAREABLE.contains(self)
    }

    /// Fields stored as a decimal fraction in [0, 1] and written as percentages.
    pub fn is_percentage(&self) -> bool {
        matches!(self, FieldName::Crg | FieldName::Cr | FieldName::DeductionLimit)
    }

    /// Fields holding an ordered list of values.
    pub fn is_list(&self) -> bool {
        matches!(self, FieldName::Geo | FieldName::Source | FieldName::Funnels)
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            FieldName::Partner => "Partner",
            FieldName::Region => "Region",
            FieldName::Geo => "GEO",
            FieldName::Language => "Language",
            FieldName::Source => "Source",
            FieldName::PricingModel => "Pricing Model",
            FieldName::Cpa => "CPA",
            FieldName::Crg => "CRG",
            FieldName::Cpl => "CPL",
            FieldName::Funnels => "Funnels",
            FieldName::Cr => "CR",
            FieldName::DeductionLimit => "Deduction Limit",
        }
    }

    /// Accepted input format, shown when an edit value is rejected.
    pub fn expected_format(&self) -> &'static str {
        match self {
            FieldName::Partner => "a non-empty partner name",
            FieldName::Region => "one or more of LATAM, NORDICS, BALTICS, TIER1, TIER3 separated by |",
            FieldName::Geo => "one or more two-letter country codes, e.g. DE or NO FI SE",
            FieldName::Language => "a language name, e.g. Native or English",
            FieldName::Source => "one or more sources separated by commas, e.g. fb, Google",
            FieldName::PricingModel => "one of CPA, CPL, CPA/CRG",
            FieldName::Cpa | FieldName::Cpl => "a positive amount, e.g. 1300",
            FieldName::Crg | FieldName::Cr | FieldName::DeductionLimit => {
                "a percentage between 0% and 100%, e.g. 15%"
            }
            FieldName::Funnels => "funnel names separated by commas (or - to clear)",
        }
    }
}
