//! Price representation using decimal arithmetic.
//!
//! The backend sends prices as plain JSON numbers in the store currency
//! (MAD). They are parsed into [`Decimal`] so cart totals never accumulate
//! floating point error.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency every price in the marketplace is denominated in.
pub const STORE_CURRENCY: &str = "MAD";

/// Errors that can occur when parsing a [`Price`] from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount expressed in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<i64> for Price {
    fn from(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {STORE_CURRENCY}", self.0)
    }
}

impl core::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_owned()))?;
        if amount.is_sign_negative() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_json_number() {
        let price: Price = serde_json::from_str("29.99").unwrap();
        assert_eq!(price, Price::from_cents(2999));

        let price: Price = serde_json::from_str("20").unwrap();
        assert_eq!(price, Price::from(20_i64));
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from(20_i64).times(2), Price::from_cents(1050).times(3)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(7150));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(5998).to_string(), "59.98 MAD");
        assert_eq!(Price::from(100_i64).to_string(), "100.00 MAD");
    }

    #[test]
    fn test_parse() {
        assert_eq!("19.99".parse::<Price>().unwrap(), Price::from_cents(1999));
        assert_eq!("abc".parse::<Price>().unwrap_err(), PriceError::Invalid("abc".to_string()));
        assert_eq!("-1".parse::<Price>().unwrap_err(), PriceError::Negative);
    }
}
