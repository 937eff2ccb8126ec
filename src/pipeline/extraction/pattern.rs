use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::types::{
    CandidateValue, FieldCandidateSet, RawDealBlock, RawSection, SharedFieldSet,
    StructureAnalysis,
};
use super::ExtractionStrategy;
use crate::models::{FieldName, PricingModel, StrategyKind};
use crate::pipeline::normalize::{
    canonical_language, clean_text, decode_flags, dedup_case_insensitive, infer_pricing_model,
    is_geo_only_line, is_geo_token, is_regional_indicator, known_source, language_name,
    normalize_sources, parse_amount, parse_geo_line, parse_percentage, parse_pricing_model,
    remove_invisible_chars, split_multi, strip_geo_label, trim_leading_decoration,
};
use crate::pipeline::resolve::ResolveOptions;

// ── Labelled lines ─────────────────────────────────────────

static PARTNER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:partner|company|brand)\s*[:\-–]\s*(.+)$").unwrap()
});
static LANGUAGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:language|lang)\s*[:\-–]\s*(.+)$").unwrap());
static SPEAKING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z]+)\s+speak(?:ing|ers?)\b").unwrap());
static SOURCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:sources?|traffic)\s*[:\-–]\s*(.+)$").unwrap());
static MODEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:model|pricing(?:\s+model)?|deal\s+type)\s*[:\-–]\s*(.+)$").unwrap()
});
static FUNNELS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:funnels?|offers?)\s*[:\-–]\s*(.+)$").unwrap());
static CR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:cr|conversion(?:\s+rate)?)\s*[:\-–]\s*(.+)$").unwrap()
});
static DEDUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:until|up\s+to)\s+(\d+(?:[.,]\d+)?)\s*%\s*(?:of\s+)?(?:wrong|invalid|fake|bad)|deduction(?:\s+limit)?\s*[:\-–]?\s*(\d+(?:[.,]\d+)?)\s*%?|all\s+campaigns\b.*?(\d+(?:[.,]\d+)?)\s*%",
    )
    .unwrap()
});

// ── Prices ─────────────────────────────────────────────────

static CPA_CRG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d.,]*)\s*[$€]?\s*\+\s*(\d+(?:[.,]\d+)?)\s*%").unwrap()
});
static CPL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcpl\s*[:\-–=]?\s*[$€]?\s*(\d[\d.,]*)|(\d[\d.,]*)\s*[$€]?\s*cpl\b").unwrap()
});
static CPA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcpa\s*[:\-–=]?\s*[$€]?\s*(\d[\d.,]*)|(\d[\d.,]*)\s*[$€]?\s*cpa\b").unwrap()
});
static CRG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcrg\s*[:\-–=]?\s*(\d+(?:[.,]\d+)?)\s*%?|(\d+(?:[.,]\d+)?)\s*%\s*crg\b")
        .unwrap()
});
static BARE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$€]?\s*\d[\d.,]*\s*[$€]?$").unwrap());

// ── Segments ───────────────────────────────────────────────

static DASH_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[-–—]\s+").unwrap());
static PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());
static MAINLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:mainly|mostly|only)\s+").unwrap());

/// First capture group that matched.
fn first_capture(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .map(|m| m.as_str().trim().to_string())
}

/// Section-wide deduction wording, returned as a percentage string.
fn deduction_value(line: &str) -> Option<String> {
    first_capture(&DEDUCTION, line).map(|n| format!("{n}%"))
}

/// A line opens a new deal block when it starts with a flag glyph, a `GEO:`
/// label, or a two-letter uppercase country token.
pub fn is_block_start(line: &str) -> bool {
    let content = trim_leading_decoration(line);
    if content.chars().next().is_some_and(is_regional_indicator) {
        return true;
    }
    if strip_geo_label(content).len() != content.len() {
        return true;
    }
    let first = content
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or("");
    is_geo_token(first)
}

/// The geo part of a block-start line: everything before the first price,
/// dash, parenthesis or colon.
fn geo_segment(line: &str) -> String {
    let decoded = decode_flags(line);
    let body = strip_geo_label(&decoded);
    let end = body
        .find(|c: char| c.is_ascii_digit() || matches!(c, '-' | '–' | '(' | ':' | '+' | '$' | '€'))
        .unwrap_or(body.len());
    body[..end].to_string()
}

/// Language hinted next to the geo (`FR fr`, `AU ENG`). Uppercase
/// two-letter tokens are geos, never languages.
fn language_hint(segment: &str) -> Option<&'static str> {
    segment
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '|' | '/'))
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .filter(|t| !(t.len() == 2 && t.chars().all(|c| c.is_ascii_uppercase())))
        .find_map(language_name)
}

fn is_price_segment(segment: &str) -> bool {
    CPA_CRG.is_match(segment)
        || CPL.is_match(segment)
        || CPA.is_match(segment)
        || CRG.is_match(segment)
        || segment
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '%' | '.' | ',' | '$' | '€' | '+'))
}

// ═══════════════════════════════════════════════════════════
// Structure analysis
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
struct SectionDraft {
    lines: Vec<String>,
    shared: SharedFieldSet,
    blocks: Vec<BlockDraft>,
}

struct BlockDraft {
    lines: Vec<String>,
}

impl BlockDraft {
    fn has_pricing(&self) -> bool {
        self.lines.iter().any(|l| l.chars().any(|c| c.is_ascii_digit()))
    }

    fn is_geo_header(&self) -> bool {
        self.lines.iter().all(|l| is_geo_only_line(l))
    }
}

impl SectionDraft {
    fn is_started(&self) -> bool {
        !self.blocks.is_empty() || self.shared.contains(FieldName::Partner)
    }

    /// Interpret a line from the shared region before the first block.
    fn absorb_shared_line(&mut self, content: &str) {
        if let Some(value) = first_capture(&LANGUAGE_LINE, content) {
            self.shared.insert(FieldName::Language, &value);
        } else if let Some(value) = first_capture(&SPEAKING_LINE, content) {
            self.shared.insert(FieldName::Language, &value);
        } else if let Some(value) = first_capture(&SOURCE_LINE, content) {
            self.shared.insert(FieldName::Source, &value);
        } else if let Some(value) = first_capture(&MODEL_LINE, content) {
            self.shared.insert(FieldName::PricingModel, &value);
        }
    }

    fn finish(self) -> Option<RawSection> {
        if self.blocks.is_empty() {
            return None;
        }
        let inherits_from = FieldName::SHAREABLE.to_vec();
        Some(RawSection {
            text: self.lines.join("\n"),
            shared: self.shared,
            blocks: self
                .blocks
                .into_iter()
                .map(|b| RawDealBlock {
                    text: b.lines.join("\n"),
                    inherits_from: inherits_from.clone(),
                })
                .collect(),
        })
    }
}

/// Deterministic segmentation into sections and blocks.
pub fn analyze_text(text: &str) -> StructureAnalysis {
    let cleaned = remove_invisible_chars(text);
    let mut sections = Vec::new();
    let mut current = SectionDraft::default();

    for raw_line in cleaned.lines() {
        let line = raw_line.trim();
        let content = trim_leading_decoration(line);
        if content.is_empty() {
            continue;
        }

        if let Some(partner) = first_capture(&PARTNER_LINE, content) {
            if current.is_started() {
                sections.extend(std::mem::take(&mut current).finish());
            }
            current.shared.insert(FieldName::Partner, &clean_text(&partner));
            current.lines.push(line.to_string());
            continue;
        }

        current.lines.push(line.to_string());

        if let Some(deduction) = deduction_value(content) {
            current.shared.insert(FieldName::DeductionLimit, &deduction);
            continue;
        }

        if current.blocks.is_empty() && !is_block_start(content) {
            current.absorb_shared_line(content);
            continue;
        }

        if is_block_start(content) {
            match current.blocks.last_mut() {
                // A country list under a geo header, or the details line of a
                // header that only named countries
                Some(block)
                    if !block.has_pricing()
                        && (is_geo_only_line(content) || block.is_geo_header()) =>
                {
                    block.lines.push(line.to_string());
                }
                _ => current.blocks.push(BlockDraft {
                    lines: vec![line.to_string()],
                }),
            }
            continue;
        }

        if let Some(block) = current.blocks.last_mut() {
            block.lines.push(line.to_string());
        }
    }
    sections.extend(current.finish());

    if sections.is_empty() {
        // No block start anywhere: treat the whole message as one deal
        let mut analysis = StructureAnalysis::single_block(cleaned.trim());
        analysis.sections[0].blocks[0].inherits_from = FieldName::SHAREABLE.to_vec();
        return analysis;
    }

    StructureAnalysis {
        sections,
        degraded: false,
    }
}

// ═══════════════════════════════════════════════════════════
// Candidate extraction
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
struct BlockFields {
    partner: Option<String>,
    geos: Vec<String>,
    language: Option<String>,
    sources: Vec<String>,
    pricing_model: Option<PricingModel>,
    cpa: Option<f64>,
    crg: Option<f64>,
    cpl: Option<f64>,
    funnels: Vec<String>,
    cr: Option<f64>,
    deduction_limit: Option<f64>,
}

impl BlockFields {
    fn scan_prices(&mut self, content: &str) {
        if let Some(caps) = CPA_CRG.captures(content) {
            if self.cpa.is_none() {
                self.cpa = caps.get(1).and_then(|m| parse_amount(m.as_str()));
            }
            if self.crg.is_none() {
                self.crg = caps
                    .get(2)
                    .and_then(|m| parse_percentage(&format!("{}%", m.as_str())));
            }
        } else {
            if self.cpa.is_none() {
                self.cpa = first_capture(&CPA, content).and_then(|n| parse_amount(&n));
            }
            if self.crg.is_none() {
                self.crg = first_capture(&CRG, content)
                    .and_then(|n| parse_percentage(&format!("{n}%")));
            }
        }
        if self.cpl.is_none() {
            self.cpl = first_capture(&CPL, content).and_then(|n| parse_amount(&n));
        }
    }

    fn scan_parenthesised_sources(&mut self, content: &str) {
        for caps in PARENS.captures_iter(content) {
            let parts = split_multi(&caps[1]);
            if !parts.is_empty() && parts.iter().all(|p| known_source(p).is_some()) {
                self.sources.extend(normalize_sources(&caps[1]));
            }
        }
    }

    fn scan_segments(&mut self, content: &str, skip_first: bool) {
        if !DASH_SEPARATOR.is_match(content) {
            return;
        }
        for (i, segment) in DASH_SEPARATOR.split(content).enumerate() {
            if i == 0 && skip_first {
                continue;
            }
            let without_parens = PARENS.replace_all(segment, "");
            let segment = without_parens.trim();
            if segment.is_empty() || segment.contains(':') {
                continue;
            }
            if is_price_segment(segment) {
                if BARE_AMOUNT.is_match(segment) && self.cpa.is_none() && self.cpl.is_none() {
                    self.cpa = parse_amount(segment);
                }
                continue;
            }
            if is_geo_only_line(segment) {
                continue;
            }
            let segment = MAINLY.replace(segment, "");
            self.funnels
                .extend(split_multi(&segment).into_iter().map(|f| clean_text(&f)));
        }
    }

    fn into_candidates(self) -> FieldCandidateSet {
        let mut set = FieldCandidateSet::new();
        if let Some(partner) = self.partner {
            set.set_explicit(FieldName::Partner, CandidateValue::Text(partner));
        }
        set.set_explicit(FieldName::Geo, CandidateValue::List(self.geos));
        if let Some(language) = self.language {
            set.set_explicit(FieldName::Language, CandidateValue::Text(language));
        }
        set.set_explicit(
            FieldName::Source,
            CandidateValue::List(dedup_case_insensitive(self.sources)),
        );

        match self.pricing_model {
            Some(model) => set.set_explicit(
                FieldName::PricingModel,
                CandidateValue::Text(model.as_str().into()),
            ),
            None => {
                if let Some(model) =
                    infer_pricing_model(self.cpa.is_some(), self.crg.is_some(), self.cpl.is_some())
                {
                    set.set_inferred(
                        FieldName::PricingModel,
                        CandidateValue::Text(model.as_str().into()),
                    );
                }
            }
        }

        let numbers = [
            (FieldName::Cpa, self.cpa),
            (FieldName::Crg, self.crg),
            (FieldName::Cpl, self.cpl),
            (FieldName::Cr, self.cr),
            (FieldName::DeductionLimit, self.deduction_limit),
        ];
        for (field, value) in numbers {
            if let Some(value) = value {
                set.set_explicit(field, CandidateValue::Number(value));
            }
        }

        let funnels: Vec<String> = self.funnels.into_iter().filter(|f| !f.is_empty()).collect();
        set.set_explicit(
            FieldName::Funnels,
            CandidateValue::List(dedup_case_insensitive(funnels)),
        );
        set
    }
}

/// Extract the locally stated fields of one block.
pub fn extract_block(block_text: &str) -> FieldCandidateSet {
    let mut fields = BlockFields::default();

    for raw_line in block_text.lines() {
        let content = trim_leading_decoration(raw_line.trim());
        if content.is_empty() {
            continue;
        }

        if let Some(value) = first_capture(&PARTNER_LINE, content) {
            fields.partner = Some(clean_text(&value));
            continue;
        }
        if let Some(value) = first_capture(&LANGUAGE_LINE, content)
            .or_else(|| first_capture(&SPEAKING_LINE, content))
        {
            fields.language = Some(canonical_language(&clean_text(&value)));
            continue;
        }
        if let Some(value) = first_capture(&SOURCE_LINE, content) {
            fields.sources.extend(normalize_sources(&value));
            continue;
        }
        if let Some(value) = first_capture(&FUNNELS_LINE, content) {
            fields
                .funnels
                .extend(split_multi(&value).into_iter().map(|f| clean_text(&f)));
            continue;
        }
        if let Some(value) = first_capture(&CR_LINE, content) {
            fields.cr = parse_percentage(&value);
            continue;
        }
        if let Some(value) = deduction_value(content) {
            fields.deduction_limit = parse_percentage(&value);
            continue;
        }
        if let Some(value) = first_capture(&MODEL_LINE, content) {
            fields.pricing_model = parse_pricing_model(&value);
        }

        let block_start = is_block_start(content);
        if block_start {
            let segment = geo_segment(content);
            fields.geos.extend(parse_geo_line(&segment));
            if fields.language.is_none() {
                fields.language = language_hint(&segment).map(str::to_string);
            }
        }

        fields.scan_prices(content);
        fields.scan_parenthesised_sources(content);
        fields.scan_segments(content, block_start);
    }

    fields.geos = dedup_case_insensitive(fields.geos);
    fields.into_candidates()
}

// ═══════════════════════════════════════════════════════════
// Strategy
// ═══════════════════════════════════════════════════════════

/// Rule-based extraction. Deterministic and offline.
pub struct PatternStrategy {
    options: ResolveOptions,
}

impl Default for PatternStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStrategy {
    pub fn new() -> Self {
        Self {
            options: ResolveOptions::for_pattern(),
        }
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ExtractionStrategy for PatternStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pattern
    }

    async fn analyze_structure(&self, text: &str) -> StructureAnalysis {
        analyze_text(text)
    }

    async fn extract_candidates(
        &self,
        block_text: &str,
        _shared: &SharedFieldSet,
    ) -> FieldCandidateSet {
        extract_block(block_text)
    }

    fn resolve_options(&self) -> ResolveOptions {
        self.options.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;

    const SUTRA: &str = "Partner: Sutra\nAU - 1300+13% - Beatskai iq (fb)\nUK - 1350+10% - Immediate core (native/fb)";

    fn list(set: &FieldCandidateSet, field: FieldName) -> Vec<String> {
        match set.value(field) {
            Some(CandidateValue::List(items)) => items.clone(),
            other => panic!("expected list for {field}, got {other:?}"),
        }
    }

    fn number(set: &FieldCandidateSet, field: FieldName) -> Option<f64> {
        match set.value(field) {
            Some(CandidateValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    #[test]
    fn block_start_detection() {
        assert!(is_block_start("AU - 1300+13%"));
        assert!(is_block_start("🇩🇪DE 1200"));
        assert!(is_block_start("GEO: ES"));
        assert!(is_block_start("• UK/IE - 1000"));
        assert!(!is_block_start("Partner: Sutra"));
        assert!(!is_block_start("CR: 10%"));
        assert!(!is_block_start("Funnels: Quantum AI"));
    }

    #[test]
    fn sutra_message_has_one_section_two_blocks() {
        let analysis = analyze_text(SUTRA);
        assert!(!analysis.degraded);
        assert_eq!(analysis.sections.len(), 1);
        let section = &analysis.sections[0];
        assert_eq!(section.shared.get(FieldName::Partner), Some("Sutra"));
        assert_eq!(section.blocks.len(), 2);
        assert!(section.blocks[0].text.starts_with("AU"));
        assert!(section.blocks[1].inherits(FieldName::Partner));
    }

    #[test]
    fn sutra_first_block_candidates() {
        let set = extract_block("AU - 1300+13% - Beatskai iq (fb)");
        assert_eq!(list(&set, FieldName::Geo), vec!["AU"]);
        assert_eq!(number(&set, FieldName::Cpa), Some(1300.0));
        assert_eq!(number(&set, FieldName::Crg), Some(0.13));
        assert_eq!(list(&set, FieldName::Source), vec!["Facebook"]);
        assert_eq!(list(&set, FieldName::Funnels), vec!["Beatskai iq"]);
        assert_eq!(set.provenance(FieldName::PricingModel), Provenance::Inferred);
        assert_eq!(set.provenance(FieldName::Partner), Provenance::Empty);
        assert_eq!(set.provenance(FieldName::Cpl), Provenance::Empty);
    }

    #[test]
    fn sources_order_preserved_and_deduplicated() {
        let set = extract_block("UK - 1350+10% - Immediate core (native/fb/FB)");
        assert_eq!(list(&set, FieldName::Source), vec!["Native", "Facebook"]);
        assert_eq!(number(&set, FieldName::Crg), Some(0.1));
    }

    #[test]
    fn multiple_sections_split_on_partner_lines() {
        let text = "Partner: A\nDE - 1000+10%\n\nPartner: B\nFR - 900+8%\nIT - 800+7%";
        let analysis = analyze_text(text);
        assert_eq!(analysis.sections.len(), 2);
        assert_eq!(analysis.sections[0].shared.get(FieldName::Partner), Some("A"));
        assert_eq!(analysis.sections[1].shared.get(FieldName::Partner), Some("B"));
        assert_eq!(analysis.sections[1].blocks.len(), 2);
    }

    #[test]
    fn shared_region_labels() {
        let text = "Partner: Deum\nENG speaking\nSource: google\nModel: CPA\nDE - 1000";
        let shared = &analyze_text(text).sections[0].shared;
        assert_eq!(shared.get(FieldName::Language), Some("ENG"));
        assert_eq!(shared.get(FieldName::Source), Some("google"));
        assert_eq!(shared.get(FieldName::PricingModel), Some("CPA"));
    }

    #[test]
    fn deduction_wording_goes_to_shared_anywhere() {
        let text = "Partner: X\nDE - 1000+10%\nuntil 5% wrong number\nFR - 900+9%";
        let analysis = analyze_text(text);
        let section = &analysis.sections[0];
        assert_eq!(section.shared.get(FieldName::DeductionLimit), Some("5%"));
        assert_eq!(section.blocks.len(), 2);
        assert!(!section.blocks[0].text.contains("wrong"));
    }

    #[test]
    fn geo_list_continues_price_less_header() {
        let text = "Partner: N\n🇳🇴🇫🇮🇸🇪 Nordics\nNO FI SE\n1200+12% - Quantum AI";
        let analysis = analyze_text(text);
        assert_eq!(analysis.block_count(), 1);
        let set = extract_block(&analysis.sections[0].blocks[0].text);
        assert_eq!(list(&set, FieldName::Geo), vec!["NO", "FI", "SE"]);
        assert_eq!(number(&set, FieldName::Cpa), Some(1200.0));
        assert_eq!(list(&set, FieldName::Funnels), vec!["Quantum AI"]);
    }

    #[test]
    fn flag_header_merges_with_details_line() {
        let text = "Partner: G\n🇩🇪DE\nDE - 1300+13%";
        assert_eq!(analyze_text(text).block_count(), 1);
    }

    #[test]
    fn inline_language_hint() {
        let set = extract_block("FR fr 1200+10%");
        assert_eq!(list(&set, FieldName::Geo), vec!["FR"]);
        assert_eq!(set.value(FieldName::Language), Some(&CandidateValue::Text("French".into())));
        let set = extract_block("AU ENG - 1000+10%");
        assert_eq!(set.value(FieldName::Language), Some(&CandidateValue::Text("English".into())));
    }

    #[test]
    fn labelled_block_lines() {
        let block = "GEO: ES\nprice: 1100+11%\nsource: fb, google\nfunnels: A, B | a\ncr: 8%\nmodel: cpa+crg";
        let set = extract_block(block);
        assert_eq!(list(&set, FieldName::Geo), vec!["ES"]);
        assert_eq!(list(&set, FieldName::Source), vec!["Facebook", "Google"]);
        assert_eq!(list(&set, FieldName::Funnels), vec!["A", "B"]);
        assert_eq!(number(&set, FieldName::Cr), Some(0.08));
        assert_eq!(set.provenance(FieldName::PricingModel), Provenance::Explicit);
    }

    #[test]
    fn cpl_deal() {
        let set = extract_block("MX - cpl 25$ - Bitcoin Era");
        assert_eq!(number(&set, FieldName::Cpl), Some(25.0));
        assert_eq!(number(&set, FieldName::Cpa), None);
        assert_eq!(
            set.value(FieldName::PricingModel),
            Some(&CandidateValue::Text("CPL".into()))
        );
        assert_eq!(list(&set, FieldName::Funnels), vec!["Bitcoin Era"]);
    }

    #[test]
    fn mainly_prefix_dropped() {
        let set = extract_block("IT - 1000+10% - mainly Oil Profit");
        assert_eq!(list(&set, FieldName::Funnels), vec!["Oil Profit"]);
    }

    #[test]
    fn bare_amount_is_cpa() {
        let set = extract_block("PL - 900 - Quantum AI");
        assert_eq!(number(&set, FieldName::Cpa), Some(900.0));
    }

    #[test]
    fn every_field_present_even_when_empty() {
        let set = extract_block("garbage");
        assert_eq!(set.iter().count(), 12);
        assert!(set.is_all_empty());
    }

    #[test]
    fn message_without_block_start_is_single_block() {
        let analysis = analyze_text("hello there\nno deals here");
        assert_eq!(analysis.block_count(), 1);
        assert!(!analysis.degraded);
    }

    #[tokio::test]
    async fn strategy_defaults() {
        let strategy = PatternStrategy::new();
        assert_eq!(strategy.kind(), StrategyKind::Pattern);
        assert_eq!(
            strategy.resolve_options().source_default.as_deref(),
            Some("Facebook")
        );
        let analysis = strategy.analyze_structure(SUTRA).await;
        assert_eq!(analysis.block_count(), 2);
    }
}
