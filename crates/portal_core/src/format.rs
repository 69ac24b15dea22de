//! Fixed-point coin formatting.

/// Format a raw on-chain amount with `decimals` places of precision, keeping
/// `precision` fraction digits. Extra digits are truncated, not rounded.
///
/// `format_coin(500_000_000, 8, 2) == "5.00"`
pub fn format_coin(raw: u128, decimals: u8, precision: usize) -> String {
    // 10^38 is the largest power of ten a u128 holds.
    let decimals = u32::from(decimals.min(38));
    let scale = 10u128.pow(decimals);
    let whole = raw / scale;
    let frac = raw % scale;

    if precision == 0 {
        return whole.to_string();
    }

    let mut digits = format!("{frac:0width$}", width = decimals as usize);
    if decimals == 0 {
        digits.clear();
    }
    digits.truncate(precision);
    while digits.len() < precision {
        digits.push('0');
    }
    format!("{whole}.{digits}")
}

/// Parse an unsigned decimal amount as returned by the RPC (`"500000000"`).
pub fn parse_amount(text: &str) -> Option<u128> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
