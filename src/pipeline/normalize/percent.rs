use std::sync::LazyLock;

use regex::Regex;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());

/// Parse a percentage into a decimal fraction.
///
/// Accepts `"10%"`, `"10"`, `"0.1"`, `"8-10%"` (midpoint) and `"2%|3%"`
/// (first alternative). Values above 1 are read as percentage points.
/// Returns `None` when no number is present.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    let first = raw.split('|').next().unwrap_or("");
    let numbers: Vec<f64> = NUMBER
        .find_iter(first)
        .filter_map(|m| {
            let magnitude = m.as_str().replace(',', ".").parse::<f64>().ok()?;
            Some(if is_negated(&first[..m.start()]) { -magnitude } else { magnitude })
        })
        .collect();

    let value = match numbers.as_slice() {
        [] => return None,
        // A sign is kept so validation can reject it
        _ if numbers.iter().any(|n| *n < 0.0) => numbers.iter().copied().find(|n| *n < 0.0)?,
        [single] => *single,
        // "8-10%" and "8 to 10%" are ranges; take the midpoint
        [low, high, ..] if is_range(first) => (low + high) / 2.0,
        [first_number, ..] => *first_number,
    };

    Some(percentage_to_decimal(value, first.contains('%')))
}

/// Convert a numeric percentage to a decimal fraction.
pub fn percentage_to_decimal(value: f64, had_percent_sign: bool) -> f64 {
    if had_percent_sign || value.abs() > 1.0 {
        round_fraction(value / 100.0)
    } else {
        value
    }
}

/// Whether the number following `before` carries a minus sign. A dash that
/// follows another number is a range separator, not a sign.
fn is_negated(before: &str) -> bool {
    let before = before.trim_end();
    match before.strip_suffix('-') {
        Some(rest) => !rest.trim_end().ends_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

fn is_range(text: &str) -> bool {
    text.contains('-') || text.contains('–') || text.to_lowercase().contains(" to ")
}

/// Round away floating noise so 13 / 100 stores as 0.13.
fn round_fraction(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Render a decimal fraction as a percentage string: 0.1 → "10%", 0.135 → "13.5%".
pub fn format_percentage(value: f64) -> String {
    format!("{}%", format_number(value * 100.0))
}

/// Render a number without trailing zeros: 1300.0 → "1300", 12.50 → "12.5".
pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Parse a money amount: strips currency symbols, spaces and thousand
/// separators. `"$1,300"` → 1300.0, `"€ 900"` → 900.0. A leading minus is
/// kept: `"-100"` → -100.0.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let negative = raw
        .trim_start_matches(|c: char| c.is_whitespace() || c == '$' || c == '€')
        .starts_with('-');
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    // A comma followed by exactly three digits is a thousands separator
    let normalized = match cleaned.rfind(',') {
        Some(_) if cleaned.contains('.') => cleaned.replace(',', ""),
        Some(pos) if cleaned.len() - pos - 1 == 3 => cleaned.replace(',', ""),
        Some(_) => cleaned.replace(',', "."),
        None => cleaned,
    };
    let amount = normalized.parse::<f64>().ok()?;
    Some(if negative { -amount } else { amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_sign_divides_by_hundred() {
        assert_eq!(parse_percentage("10%"), Some(0.1));
        assert_eq!(parse_percentage("13%"), Some(0.13));
    }

    #[test]
    fn bare_points_above_one_are_percentages() {
        assert_eq!(parse_percentage("15"), Some(0.15));
    }

    #[test]
    fn decimal_fraction_kept() {
        assert_eq!(parse_percentage("0.1"), Some(0.1));
    }

    #[test]
    fn range_takes_midpoint() {
        assert_eq!(parse_percentage("10-12%"), Some(0.11));
        assert_eq!(parse_percentage("8 - 10 %"), Some(0.09));
    }

    #[test]
    fn alternatives_take_first() {
        assert_eq!(parse_percentage("2%|3%"), Some(0.02));
    }

    #[test]
    fn no_number_is_none() {
        assert_eq!(parse_percentage("abc"), None);
        assert_eq!(parse_percentage(""), None);
    }

    #[test]
    fn ten_percent_round_trips_for_display() {
        let decimal = parse_percentage("10%").unwrap();
        assert_eq!(format_percentage(decimal), "10%");
    }

    #[test]
    fn fractional_percentage_display() {
        assert_eq!(format_percentage(0.135), "13.5%");
        assert_eq!(format_percentage(0.05), "5%");
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount("$1,300"), Some(1300.0));
        assert_eq!(parse_amount("€ 900"), Some(900.0));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("1300"), Some(1300.0));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn negative_values_keep_their_sign() {
        assert_eq!(parse_amount("-100"), Some(-100.0));
        assert_eq!(parse_amount("$-1,300"), Some(-1300.0));
        assert_eq!(parse_amount("- 25"), Some(-25.0));
        assert_eq!(parse_percentage("-10%"), Some(-0.1));
        assert_eq!(parse_percentage("- 10"), Some(-0.1));
        assert_eq!(parse_percentage("-0.1"), Some(-0.1));
        // Dashes between numbers are still ranges
        assert_eq!(parse_percentage("8-10%"), Some(0.09));
    }

    #[test]
    fn number_formatting_trims_zeros() {
        assert_eq!(format_number(1300.0), "1300");
        assert_eq!(format_number(12.5), "12.5");
    }
}
