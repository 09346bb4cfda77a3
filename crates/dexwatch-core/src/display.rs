//! Presentation-boundary formatting.
//!
//! Records keep raw `Decimal` values; these helpers render them for
//! subscribers that want a ready-made label.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::record::Record;

/// Token amount decimals shown in labels.
const AMOUNT_DP: u32 = 6;
/// Maximum USD fraction digits shown in labels.
const USD_DP: u32 = 3;

/// Render a trade amount, e.g. `"1.500000 WBNB ($150,000)"`.
pub fn display_amount(record: &Record) -> String {
    let amount = record
        .raw_amount
        .round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::MidpointAwayFromZero);
    let mut label = format!("{amount:.6}");

    if let Some(symbol) = record.currency.as_deref().filter(|s| !s.is_empty()) {
        label.push(' ');
        label.push_str(symbol);
    }
    if let Some(usd) = record.amount_usd {
        label.push_str(&format!(" (${})", group_thousands(usd, USD_DP)));
    }
    label
}

/// Render a decimal with `,` thousands separators and at most `dp` fraction digits.
pub fn group_thousands(value: Decimal, dp: u32) -> String {
    let rounded = value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 4);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample_record;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display_amount_full() {
        let record = sample_record("0xabc", 0);
        assert_eq!(display_amount(&record), "1.500000 WBNB ($150,000)");
    }

    #[test]
    fn test_display_amount_without_optional_fields() {
        let mut record = sample_record("0xabc", 0);
        record.currency = None;
        record.amount_usd = None;
        record.raw_amount = dec!(0.1234567);
        assert_eq!(display_amount(&record), "0.123457");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(dec!(0), 3), "0");
        assert_eq!(group_thousands(dec!(999), 3), "999");
        assert_eq!(group_thousands(dec!(1000), 3), "1,000");
        assert_eq!(group_thousands(dec!(1234567.891234), 3), "1,234,567.891");
        assert_eq!(group_thousands(dec!(-1234.5), 3), "-1,234.5");
        assert_eq!(group_thousands(dec!(100000.000), 3), "100,000");
    }
}
