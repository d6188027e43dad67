use rust_decimal::Decimal;
use std::str::FromStr;

/// Currency symbols that may prefix an amount printed on a receipt.
pub const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// Parse a printed amount such as `"1,234.56"` or `"$4.88"` into a two-place decimal.
///
/// Thousands separators and a leading currency symbol are ignored. Returns `None`
/// for anything that is not a plain non-negative number.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let trimmed = s.trim().trim_start_matches(CURRENCY_SYMBOLS).trim_start();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return None;
    }
    let clean = trimmed.replace(',', "");
    let dec = Decimal::from_str(&clean).ok()?;
    Some(dec.round_dp(2))
}
