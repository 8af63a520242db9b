// Monetary value strings ("€20M", "£500K") to plain amounts.

use crate::normalize::MISSING_SENTINEL;

const CURRENCY_SYMBOLS: &[char] = &['€', '£', '$'];

/// Parse a formatted transfer fee or market value.
///
/// Currency symbols, whitespace and thousands separators are stripped; a
/// trailing `K` multiplies by 1,000 and `M` by 1,000,000 (case-insensitive).
/// Empty, sentinel or otherwise unparseable input yields `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if cleaned.is_empty() || cleaned == MISSING_SENTINEL {
        return None;
    }

    let (numeral, multiplier) = if let Some(n) = cleaned.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = cleaned.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    let value: f64 = numeral.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-6)
    }

    #[test]
    fn millions() {
        assert!(approx(parse_amount("€15M"), 15_000_000.0));
        assert!(approx(parse_amount("€20.5M"), 20_500_000.0));
    }

    #[test]
    fn thousands() {
        assert!(approx(parse_amount("£500K"), 500_000.0));
        assert!(approx(parse_amount("£750k"), 750_000.0));
    }

    #[test]
    fn no_suffix() {
        assert!(approx(parse_amount("$1,250,000"), 1_250_000.0));
        assert!(approx(parse_amount(" 42 "), 42.0));
    }

    #[test]
    fn spaced_symbol_and_suffix() {
        assert!(approx(parse_amount("€ 3.2 M"), 3_200_000.0));
    }

    #[test]
    fn missing_values() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn unparseable_values() {
        assert_eq!(parse_amount("Free"), None);
        assert_eq!(parse_amount("Loan"), None);
        assert_eq!(parse_amount("€M"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }
}
