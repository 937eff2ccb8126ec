/// Split a multi-value field on `,` `|` `/` `;` and ` & `, trimming each
/// part. Order is preserved and duplicates are dropped case-insensitively
/// (first spelling wins).
pub fn split_multi(raw: &str) -> Vec<String> {
    let unified = raw.replace(" & ", ",");
    let parts = unified
        .split([',', '|', '/', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "&")
        .map(str::to_string);
    dedup_case_insensitive(parts)
}

/// Order-preserving, case-insensitive de-duplication.
pub fn dedup_case_insensitive<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for item in items {
        let key = item.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(item);
        }
    }
    out
}

/// Map a source spelling onto its canonical name.
pub fn canonical_source(raw: &str) -> String {
    let trimmed = raw.trim();
    match known_source(trimmed) {
        Some(name) => name.to_string(),
        None => trimmed.to_string(),
    }
}

/// Canonical name of a recognised traffic source, if any.
pub fn known_source(raw: &str) -> Option<&'static str> {
    let canonical = match raw.trim().to_lowercase().as_str() {
        "fb" | "facebook" | "meta" | "fb ads" | "facebook ads" => "Facebook",
        "google" | "gg" | "adwords" | "google ads" | "ggl" => "Google",
        "native" | "natives" => "Native",
        "seo" => "SEO",
        "taboola" => "Taboola",
        "outbrain" => "Outbrain",
        "bing" | "msn" => "Bing",
        "tiktok" | "tt" | "tik tok" => "TikTok",
        "push" | "push notifications" => "Push",
        "email" | "e-mail" | "mail" => "Email",
        "youtube" | "yt" => "YouTube",
        "ig" | "instagram" => "Instagram",
        _ => return None,
    };
    Some(canonical)
}

/// Split and canonicalize a source field. `"native/fb, FB"` → `[Native, Facebook]`.
pub fn normalize_sources(raw: &str) -> Vec<String> {
    dedup_case_insensitive(split_multi(raw).iter().map(|s| canonical_source(s)))
}

/// Canonicalize an already-split source list.
pub fn normalize_source_list<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    dedup_case_insensitive(
        items
            .iter()
            .flat_map(|s| split_multi(s.as_ref()))
            .map(|s| canonical_source(&s)),
    )
}
