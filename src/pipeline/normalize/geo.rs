use super::lists::dedup_case_insensitive;
use super::text::is_regional_indicator;

/// Uppercase pairs that show up next to geos but are never countries.
const NOT_GEO: &[&str] = &["FB", "GG", "TT", "YT", "IG", "CR", "OR", "TO", "NA"];

/// Decode a regional-indicator pair (🇩🇪) into its two-letter code.
fn flag_letter(c: char) -> Option<char> {
    if is_regional_indicator(c) {
        let offset = c as u32 - 0x1F1E6;
        char::from_u32('A' as u32 + offset)
    } else {
        None
    }
}

/// Replace flag glyphs with their country code, padded with spaces so that
/// `🇩🇪DE` and `🇳🇴🇫🇮` both tokenize cleanly.
pub fn decode_flags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match flag_letter(c) {
            Some(first) => {
                if let Some(second) = chars.peek().copied().and_then(flag_letter) {
                    chars.next();
                    out.push(' ');
                    out.push(first);
                    out.push(second);
                    out.push(' ');
                }
            }
            None => out.push(c),
        }
    }
    out
}

/// Extract country codes from a geo line.
///
/// Flags are decoded, an optional `GEO:` label is dropped, and the rest is
/// split on whitespace, commas, pipes and slashes. Only two-letter uppercase
/// tokens survive; duplicates are removed keeping first occurrence.
pub fn parse_geo_line(line: &str) -> Vec<String> {
    let decoded = decode_flags(line);
    let body = strip_geo_label(&decoded);
    let codes = body
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '|' | '/' | ';' | '&'))
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|t| is_geo_token(t))
        .map(str::to_string);
    dedup_case_insensitive(codes)
}

/// A two-letter uppercase ASCII token that is not a known non-geo pair.
pub fn is_geo_token(token: &str) -> bool {
    token.len() == 2
        && token.chars().all(|c| c.is_ascii_uppercase())
        && !NOT_GEO.contains(&token)
}

/// Drop a leading `GEO:` or `GEOS:` label.
pub fn strip_geo_label(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("geo:") => &trimmed[4..],
        _ => match trimmed.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("geos:") => &trimmed[5..],
            _ => trimmed,
        },
    }
}

/// True when a line carries only geos and decoration, no pricing or labels.
pub fn is_geo_only_line(line: &str) -> bool {
    let decoded = decode_flags(line);
    let body = strip_geo_label(&decoded);
    let mut any = false;
    for token in body.split(|c: char| c.is_whitespace() || matches!(c, ',' | '|' | '/' | '-')) {
        let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if token.is_empty() {
            continue;
        }
        if !is_geo_token(token) {
            return false;
        }
        any = true;
    }
    any
}
