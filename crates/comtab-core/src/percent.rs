//! Brazilian-format percentage parsing.
//!
//! Source spreadsheets carry commissions as pt-BR strings: `"8,50"`,
//! `"8.50"`, `"8,50%"`, `"1.234,56"`. Unparseable input maps to `0.0` —
//! a missing commission is a legitimate blank cell, not an error.

/// Parse a pt-BR percentage string into percent units (`"8,50"` → `8.5`).
///
/// Handles `%` suffixes, embedded spaces, and thousands separators
/// (`"1.234,56"` → `1234.56`). Returns `0.0` for empty or unparseable input.
pub fn parse_percent_br(value: &str) -> f64 {
    let s: String = value
        .trim()
        .chars()
        .filter(|c| *c != '%' && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return 0.0;
    }

    // "1.234,56": dots are thousands separators, comma is the decimal mark.
    // Otherwise any comma is a decimal mark.
    let normalized = if s.matches(',').count() == 1 && s.matches('.').count() >= 1 {
        s.replace('.', "").replace(',', ".")
    } else {
        s.replace(',', ".")
    };

    normalized.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn comma_decimal() {
        assert_eq!(parse_percent_br("8,50"), 8.5);
    }

    #[test]
    fn dot_decimal() {
        assert_eq!(parse_percent_br("8.50"), 8.5);
    }

    #[test]
    fn percent_suffix_stripped() {
        assert_eq!(parse_percent_br("8,50%"), 8.5);
        assert_eq!(parse_percent_br(" 8.50 % "), 8.5);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(parse_percent_br("1.234,56"), 1234.56);
    }

    #[test]
    fn empty_and_garbage_are_zero() {
        assert_eq!(parse_percent_br(""), 0.0);
        assert_eq!(parse_percent_br("   "), 0.0);
        assert_eq!(parse_percent_br("n/a"), 0.0);
        assert_eq!(parse_percent_br("%"), 0.0);
    }

    proptest! {
        #[test]
        fn never_panics(s in "\\PC*") {
            let _ = parse_percent_br(&s);
        }

        #[test]
        fn two_decimal_comma_round_trips(int in 0u32..100, frac in 0u32..100) {
            let s = format!("{int},{frac:02}");
            let parsed = parse_percent_br(&s);
            let expected = int as f64 + frac as f64 / 100.0;
            prop_assert!((parsed - expected).abs() < 1e-9);
        }
    }
}
