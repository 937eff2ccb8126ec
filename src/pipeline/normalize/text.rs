// String hygiene for textual deal fields.
// Removes invisible Unicode, emoji and box-drawing glyphs, normalizes whitespace.

/// Clean a textual field value: strip decoration glyphs and invisible
/// characters, collapse runs of whitespace, trim.
pub fn clean_text(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .map(|c| if is_decoration(c) { ' ' } else { c })
        .filter(|c| !is_invisible(*c))
        .collect();
    collapse_whitespace(&stripped)
}

/// Remove invisible characters only, keeping line structure. Used on
/// inbound text before structure analysis.
pub fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if *c == '\n' || *c == '\t' || *c == ' ' {
                return true;
            }
            !is_invisible(*c) && !(c.is_control() && *c != '\r')
        })
        .collect::<String>()
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Zero-width, bidi and formatting characters.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'  // Zero-width space
        | '\u{200C}' // Zero-width non-joiner
        | '\u{200D}' // Zero-width joiner
        | '\u{200E}' // Left-to-right mark
        | '\u{200F}' // Right-to-left mark
        | '\u{202A}'..='\u{202E}' // Embeddings and overrides
        | '\u{2060}'..='\u{2064}' // Word joiner, invisible operators
        | '\u{FE00}'..='\u{FE0F}' // Variation selectors
        | '\u{FEFF}' // BOM
        | '\u{E0020}'..='\u{E007F}' // Tag characters (flag sequences)
    )
}

/// Emoji, pictographs, regional indicators, box drawing and similar glyphs
/// that decorate deal messages without carrying field content.
pub fn is_decoration(c: char) -> bool {
    matches!(
        c,
        '\u{1F000}'..='\u{1FAFF}' // Emoji, pictographs, regional indicators
        | '\u{2600}'..='\u{27BF}' // Misc symbols, dingbats
        | '\u{2B00}'..='\u{2BFF}' // Arrows, stars
        | '\u{2500}'..='\u{259F}' // Box drawing, block elements
        | '\u{25A0}'..='\u{25FF}' // Geometric shapes
        | '\u{2190}'..='\u{21FF}' // Arrows
        | '\u{2022}' // Bullet
        | '\u{20E3}' // Keycap
    )
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop decoration and punctuation from the start of a line so that
/// block-start detection sees the first meaningful token.
pub fn trim_leading_decoration(line: &str) -> &str {
    line.trim_start_matches(|c: char| {
        c.is_whitespace() || is_invisible(c) || (is_decoration(c) && !is_regional_indicator(c))
            || matches!(c, '-' | '*' | '>' | '•' | '·')
    })
}

pub fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}
