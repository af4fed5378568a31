//! Pure, total transforms from raw extracted strings to canonical forms.
//!
//! Every function is deterministic and fails closed: missing or unparsable
//! input yields `None`, never a guess.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

fn strip_invisible(value: &str) -> String {
    value.replace(['\u{feff}', '\u{200b}'], "")
}

/// Lowercase, collapse internal whitespace, and drop the punctuation noise
/// that trails legal-entity suffixes ("Acme Supplies, Inc." and
/// "acme supplies inc" compare equal).
pub fn normalize_vendor_name(value: &str) -> Option<String> {
    let cleaned = strip_invisible(value).replace([',', '.', ';'], "");
    let collapsed = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Uppercase a reference string, removing whitespace and commas and trimming
/// dashes from the edges.
fn normalize_reference(value: &str) -> Option<String> {
    let cleaned: String = strip_invisible(value)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let trimmed = cleaned.trim_matches('-').to_uppercase();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub fn normalize_invoice_number(value: &str) -> Option<String> {
    normalize_reference(value)
}

pub fn normalize_po_number(value: &str) -> Option<String> {
    normalize_reference(value)
}

/// Parse a currency-formatted string into a fixed-point amount.
///
/// Handles symbol prefixes, thousands separators in either convention, and
/// parenthesized negatives. Returns `None` (not zero) when the input cannot
/// be read unambiguously.
pub fn normalize_amount(value: &str) -> Option<Decimal> {
    let trimmed = strip_invisible(value);
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        return None;
    }

    let negative = trimmed.starts_with('(') && trimmed.ends_with(')') || trimmed.contains('-');
    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let plain = resolve_separators(&digits)?;
    let mut amount = Decimal::from_str(&plain).ok()?;
    if negative {
        amount.set_sign_negative(true);
    }
    Some(amount)
}

/// Reduce a digit string with `.`/`,` separators to a plain `1234.56` form.
fn resolve_separators(digits: &str) -> Option<String> {
    let has_dot = digits.contains('.');
    let has_comma = digits.contains(',');

    match (has_dot, has_comma) {
        (false, false) => Some(digits.to_string()),
        (true, true) => {
            // The rightmost separator is the decimal point; the other kind
            // marks thousands.
            let last_dot = digits.rfind('.').unwrap_or(0);
            let last_comma = digits.rfind(',').unwrap_or(0);
            let (decimal, thousands) = if last_dot > last_comma {
                ('.', ',')
            } else {
                (',', '.')
            };
            let stripped = digits.replace(thousands, "");
            if stripped.matches(decimal).count() != 1 {
                return None;
            }
            Some(stripped.replace(decimal, "."))
        }
        (true, false) => resolve_single_separator(digits, '.'),
        (false, true) => resolve_single_separator(digits, ','),
    }
}

fn resolve_single_separator(digits: &str, separator: char) -> Option<String> {
    let groups: Vec<&str> = digits.split(separator).collect();
    let tail = groups.last().copied().unwrap_or_default();

    if groups.len() == 2 && tail.len() != 3 {
        // A lone separator not followed by a thousands-sized group reads as
        // the decimal point: "1,50" and "1.5" both mean one and a half.
        return Some(format!("{}.{}", groups[0], tail));
    }

    // Groups of exactly three digits read as thousands separators, covering
    // both "1,234,567" and the European "1.234" convention.
    if groups.iter().skip(1).all(|group| group.len() == 3) {
        return Some(digits.replace(separator, ""));
    }

    None
}

const DAY_FIRST_FORMATS: [&str; 2] = ["%d.%m.%Y", "%d.%m.%y"];

/// Parse common date renderings to a calendar date, refusing to guess when
/// day and month cannot be told apart.
pub fn normalize_date(value: &str) -> Option<NaiveDate> {
    let trimmed = strip_invisible(value);
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(parsed);
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y/%m/%d") {
        return Some(parsed);
    }
    for format in DAY_FIRST_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%B %d, %Y") {
        return Some(parsed);
    }

    parse_slashed(trimmed)
}

/// Slash-separated dates are accepted only when day-first and month-first
/// readings agree or exactly one of them is a valid date.
fn parse_slashed(value: &str) -> Option<NaiveDate> {
    let day_first = NaiveDate::parse_from_str(value, "%d/%m/%Y").ok();
    let month_first = NaiveDate::parse_from_str(value, "%m/%d/%Y").ok();

    match (day_first, month_first) {
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(_), Some(_)) => None,
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn vendor_name_strips_legal_suffix_noise() {
        assert_eq!(
            normalize_vendor_name("  Acme Supplies, Inc.  ").as_deref(),
            Some("acme supplies inc")
        );
    }

    #[test]
    fn vendor_name_is_case_and_whitespace_invariant() {
        let variants = [
            "Acme   Supplies Inc",
            "ACME SUPPLIES INC",
            "\u{feff}acme supplies\tinc",
        ];
        for variant in variants {
            assert_eq!(
                normalize_vendor_name(variant).as_deref(),
                Some("acme supplies inc"),
                "variant {variant:?}"
            );
        }
    }

    #[test]
    fn vendor_name_is_idempotent() {
        let once = normalize_vendor_name("  Müller & Söhne GmbH. ").expect("normalizes");
        let twice = normalize_vendor_name(&once).expect("normalizes again");
        assert_eq!(once, twice);
    }

    #[test]
    fn vendor_name_empty_input_yields_none() {
        assert_eq!(normalize_vendor_name("   "), None);
        assert_eq!(normalize_vendor_name(""), None);
    }

    #[test]
    fn invoice_number_uppercases_and_trims_edge_dashes() {
        assert_eq!(
            normalize_invoice_number(" -inv 2024, 001- ").as_deref(),
            Some("INV2024001")
        );
        assert_eq!(
            normalize_invoice_number("re-2024-17").as_deref(),
            Some("RE-2024-17")
        );
        assert_eq!(normalize_invoice_number("  ,- "), None);
    }

    #[test]
    fn amount_parses_common_currency_formats() {
        assert_eq!(
            normalize_amount("$1,234.56"),
            Some(Decimal::new(123_456, 2))
        );
        assert_eq!(
            normalize_amount("1.234,56 EUR"),
            Some(Decimal::new(123_456, 2))
        );
        assert_eq!(normalize_amount("2,500"), Some(Decimal::new(2_500, 0)));
        assert_eq!(normalize_amount("19,9"), Some(Decimal::new(199, 1)));
        assert_eq!(normalize_amount("(42.00)"), Some(Decimal::new(-4_200, 2)));
    }

    #[test]
    fn amount_fails_closed_instead_of_returning_zero() {
        assert_eq!(normalize_amount("n/a"), None);
        assert_eq!(normalize_amount(""), None);
        assert_eq!(normalize_amount("12,34,5"), None);
    }

    #[test]
    fn date_parses_iso_dotted_and_rfc3339() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(normalize_date("2025-03-14"), Some(expected));
        assert_eq!(normalize_date("14.03.2025"), Some(expected));
        assert_eq!(normalize_date("2025-03-14T08:30:00Z"), Some(expected));
        assert_eq!(normalize_date("March 14, 2025"), Some(expected));
    }

    #[test]
    fn date_refuses_ambiguous_slashed_input() {
        assert_eq!(normalize_date("03/04/2025"), None);
        assert_eq!(
            normalize_date("25/04/2025"),
            NaiveDate::from_ymd_opt(2025, 4, 25)
        );
        assert_eq!(
            normalize_date("05/05/2025"),
            NaiveDate::from_ymd_opt(2025, 5, 5)
        );
    }

    #[test]
    fn date_empty_or_garbage_yields_none() {
        assert_eq!(normalize_date("  "), None);
        assert_eq!(normalize_date("not-a-date"), None);
    }
}
