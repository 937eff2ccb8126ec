/// Default language when a deal states none.
pub const DEFAULT_LANGUAGE: &str = "Native";

/// Geos whose traffic is English-speaking. Used only by the opt-in
/// geo-based language rule, never by the Native default.
const ENGLISH_GEOS: &[&str] = &["UK", "GB", "US", "AU", "CA", "IE", "NZ"];

/// Map a language spelling (name, code, or shorthand) onto a display name.
pub fn canonical_language(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    let lower = lower
        .trim_end_matches(" speaking")
        .trim_end_matches(" speakers")
        .trim();
    match language_name(lower) {
        Some(name) => name.to_string(),
        None => trimmed.to_string(),
    }
}

/// Recognize a language token, returning its display name.
pub fn language_name(token: &str) -> Option<&'static str> {
    let name = match token.to_lowercase().as_str() {
        "native" | "nat" => "Native",
        "en" | "eng" | "english" => "English",
        "fr" | "fre" | "french" => "French",
        "de" | "ger" | "german" => "German",
        "it" | "ita" | "italian" => "Italian",
        "es" | "spa" | "spanish" => "Spanish",
        "pt" | "por" | "portuguese" => "Portuguese",
        "nl" | "dutch" => "Dutch",
        "pl" | "polish" => "Polish",
        "sv" | "swedish" => "Swedish",
        "no" | "norwegian" => "Norwegian",
        "fi" | "finnish" => "Finnish",
        "da" | "danish" => "Danish",
        "cs" | "czech" => "Czech",
        "ro" | "romanian" => "Romanian",
        "hu" | "hungarian" => "Hungarian",
        "ar" | "arabic" => "Arabic",
        "ru" | "russian" => "Russian",
        "tr" | "turkish" => "Turkish",
        "ja" | "japanese" => "Japanese",
        _ => return None,
    };
    Some(name)
}

/// Infer English for deals whose every geo is English-speaking.
///
/// This rule is separate from the Native default and applies only when a
/// caller opts in.
pub fn infer_language_from_geo<S: AsRef<str>>(geos: &[S]) -> Option<&'static str> {
    if geos.is_empty() {
        return None;
    }
    let all_english = geos
        .iter()
        .all(|g| ENGLISH_GEOS.contains(&g.as_ref().to_uppercase().as_str()));
    all_english.then_some("English")
}
