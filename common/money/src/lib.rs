use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Amounts travel as decimal strings end to end to avoid floating-point
/// drift; this module only normalizes and compares them.

/// Normalize a monetary value to 2 decimal places (plain scale reduction,
/// matching what the gateways expect in hash strings: "100" -> "100.00").
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    value.with_scale(2)
}

/// Parse a decimal string into its canonical two-decimal form.
/// Returns `None` for unparsable input.
pub fn canonical_amount(raw: &str) -> Option<String> {
    let value = BigDecimal::from_str(raw.trim()).ok()?;
    Some(normalize_scale(&value).to_string())
}

/// Compare two decimal strings after normalization. Unparsable input never
/// matches anything.
pub fn amounts_match(a: &str, b: &str) -> bool {
    match (canonical_amount(a), canonical_amount(b)) {
        (Some(ca), Some(cb)) => ca == cb,
        _ => false,
    }
}
