//! Type-safe price representation using decimal arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::locale::CurrencyCode;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(cents, 2), currency_code)
    }

    /// Amount in cents, rounded half away from zero.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_cents(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;

        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    /// Format for display in the currency's home style.
    #[must_use]
    pub fn display(&self) -> String {
        format_price(self.amount, self.currency_code)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format an amount the way shoppers of that currency expect.
///
/// - EUR uses Dutch formatting: `€ 1.234,56`
/// - GBP: `£1,234.56`
/// - USD: `$1,234.56`
#[must_use]
pub fn format_price(amount: Decimal, currency: CurrencyCode) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let (group_sep, decimal_sep) = match currency {
        CurrencyCode::Eur => ('.', ','),
        CurrencyCode::Gbp | CurrencyCode::Usd => (',', '.'),
    };
    let grouped = group_thousands(whole, group_sep);
    let sign = if negative { "-" } else { "" };

    match currency {
        CurrencyCode::Eur => format!("{sign}€ {grouped}{decimal_sep}{fraction}"),
        CurrencyCode::Gbp | CurrencyCode::Usd => {
            format!("{sign}{}{grouped}{decimal_sep}{fraction}", currency.symbol())
        }
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_eur_uses_dutch_separators() {
        assert_eq!(format_price(dec("59.99"), CurrencyCode::Eur), "€ 59,99");
        assert_eq!(format_price(dec("1234.5"), CurrencyCode::Eur), "€ 1.234,50");
    }

    #[test]
    fn test_format_gbp_and_usd() {
        assert_eq!(format_price(dec("109.99"), CurrencyCode::Gbp), "£109.99");
        assert_eq!(format_price(dec("1234567"), CurrencyCode::Usd), "$1,234,567.00");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_price(dec("0.125"), CurrencyCode::Usd), "$0.13");
        assert_eq!(format_price(dec("-5"), CurrencyCode::Usd), "-$5.00");
        assert_eq!(format_price(dec("-0.001"), CurrencyCode::Usd), "$0.00");
    }

    #[test]
    fn test_cents_round_trip() {
        let price = Price::from_cents(7999, CurrencyCode::Eur);
        assert_eq!(price.amount, dec("79.99"));
        assert_eq!(price.to_cents(), Some(7999));
        assert_eq!(Price::new(dec("0.005"), CurrencyCode::Eur).to_cents(), Some(1));
    }

    #[test]
    fn test_display() {
        let price = Price::from_cents(14999, CurrencyCode::Gbp);
        assert_eq!(price.to_string(), "£149.99");
    }
}
