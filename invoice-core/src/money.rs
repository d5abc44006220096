//! Decimal helpers for currency values and permissive form input.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `1234.5` becomes `"1,234.50"`.
pub fn format_grouped(value: Decimal) -> String {
    let mut cents = round2(value);
    cents.rescale(2);
    let text = cents.abs().to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if cents.is_sign_negative() && !cents.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// `prefix` followed by the grouped amount, sign first: `-$12.00`.
pub fn format_money(value: Decimal, prefix: &str) -> String {
    let grouped = format_grouped(value);
    match grouped.strip_prefix('-') {
        Some(positive) => format!("-{prefix}{positive}"),
        None => format!("{prefix}{grouped}"),
    }
}

/// Rates and tax percentages. Anything unparsable or negative reads as
/// zero so typing is never blocked.
pub fn parse_rate(input: &str) -> Decimal {
    match Decimal::from_str(input.trim()) {
        Ok(value) if value.is_sign_positive() => value,
        _ => Decimal::ZERO,
    }
}

/// Quantities fall back to 1 when the input is not a whole number.
pub fn parse_quantity(input: &str) -> u32 {
    input.trim().parse().unwrap_or(1)
}

/// Percentage as written on the invoice: `8.5`, `10`.
pub fn format_percent(rate: Decimal) -> String {
    rate.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(dec!(0.125)), dec!(0.13));
        assert_eq!(round2(dec!(42.504)), dec!(42.50));
        assert_eq!(round2(dec!(-0.125)), dec!(-0.13));
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_grouped(dec!(0)), "0.00");
        assert_eq!(format_grouped(dec!(999.5)), "999.50");
        assert_eq!(format_grouped(dec!(1000)), "1,000.00");
        assert_eq!(format_grouped(dec!(1234567.891)), "1,234,567.89");
    }

    #[test]
    fn money_puts_sign_before_prefix() {
        assert_eq!(format_money(dec!(550), "$"), "$550.00");
        assert_eq!(format_money(dec!(-12), "$"), "-$12.00");
        assert_eq!(format_money(dec!(1000), "INR "), "INR 1,000.00");
    }

    #[test]
    fn permissive_parsing() {
        assert_eq!(parse_rate("12.5"), dec!(12.5));
        assert_eq!(parse_rate(" 100 "), dec!(100));
        assert_eq!(parse_rate("abc"), Decimal::ZERO);
        assert_eq!(parse_rate("-3"), Decimal::ZERO);
        assert_eq!(parse_rate(""), Decimal::ZERO);
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity("0"), 0);
        assert_eq!(parse_quantity("two"), 1);
        assert_eq!(parse_quantity("-1"), 1);
    }

    #[test]
    fn percent_drops_trailing_zeros() {
        assert_eq!(format_percent(dec!(8.50)), "8.5");
        assert_eq!(format_percent(dec!(10.0)), "10");
    }
}
