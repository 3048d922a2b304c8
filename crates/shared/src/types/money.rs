//! Money type with integer minor-unit precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `i64` minor units (cents); all arithmetic is checked integer
//! arithmetic. `rust_decimal` is used only to scale minor units for display.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Largest representable magnitude in minor units (2^53).
///
/// Amounts beyond this ceiling fail with [`MoneyError::ArithmeticOverflow`]
/// instead of silently wrapping.
pub const MAX_MINOR_UNITS: i64 = 1 << 53;

/// Errors from money arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Operands carry different currencies.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: Currency,
        /// Currency of the right operand.
        right: Currency,
    },

    /// Result magnitude exceeds the representable ceiling.
    #[error("Arithmetic overflow: amount exceeds {MAX_MINOR_UNITS} minor units")]
    ArithmeticOverflow,
}

/// Represents a monetary amount with currency.
///
/// The amount is a signed number of minor units (e.g. cents). Negative
/// amounts are permitted only inside signed ledger deltas, never as a
/// resulting account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// The amount in the smallest currency unit (e.g., cents).
    pub amount: i64,
    /// ISO 4217 currency code (e.g., "USD", "IDR").
    pub currency: Currency,
}

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Indonesian Rupiah
    Idr,
    /// Japanese Yen
    Jpy,
}

impl Currency {
    /// Number of minor-unit digits after the decimal point.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        match self {
            Self::Usd | Self::Eur | Self::Idr => 2,
            Self::Jpy => 0,
        }
    }
}

impl Money {
    /// Creates a money amount from minor units.
    #[must_use]
    pub const fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.amount < 0
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Adds two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` for mixed currencies and
    /// `ArithmeticOverflow` when the result magnitude exceeds the ceiling.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::ArithmeticOverflow)?;
        Self::within_ceiling(amount, self.currency)
    }

    /// Subtracts `other` from `self` in the same currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` for mixed currencies and
    /// `ArithmeticOverflow` when the result magnitude exceeds the ceiling.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(MoneyError::ArithmeticOverflow)?;
        Self::within_ceiling(amount, self.currency)
    }

    /// Negates the amount.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the negated magnitude exceeds the
    /// ceiling.
    pub fn checked_neg(self) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_neg()
            .ok_or(MoneyError::ArithmeticOverflow)?;
        Self::within_ceiling(amount, self.currency)
    }

    /// Compares two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` for mixed currencies. Use [`PartialOrd`]
    /// when a `None` result is acceptable instead.
    pub fn compare(&self, other: &Self) -> Result<Ordering, MoneyError> {
        self.require_same_currency(*other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Formats the amount at the currency's minor-unit exponent,
    /// e.g. `1500` USD minor units renders as `"15.00 USD"`.
    #[must_use]
    pub fn to_display(&self) -> String {
        let scaled = Decimal::new(self.amount, self.currency.minor_unit_exponent());
        format!("{} {}", scaled, self.currency)
    }

    fn require_same_currency(self, other: Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }

    fn within_ceiling(amount: i64, currency: Currency) -> Result<Self, MoneyError> {
        if amount.abs() > MAX_MINOR_UNITS {
            return Err(MoneyError::ArithmeticOverflow);
        }
        Ok(Self { amount, currency })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

impl PartialOrd for Money {
    /// Ordering is defined only within one currency; mixed currencies
    /// compare as `None`.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency == other.currency {
            Some(self.amount.cmp(&other.amount))
        } else {
            None
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usd => write!(f, "USD"),
            Self::Eur => write!(f, "EUR"),
            Self::Idr => write!(f, "IDR"),
            Self::Jpy => write!(f, "JPY"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "IDR" => Ok(Self::Idr),
            "JPY" => Ok(Self::Jpy),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[test]
    fn test_money_from_minor() {
        let money = Money::from_minor(100_00, Currency::Usd);
        assert_eq!(money.amount, 100_00);
        assert_eq!(money.currency, Currency::Usd);
    }

    #[test]
    fn test_money_zero() {
        let money = Money::zero(Currency::Idr);
        assert!(money.is_zero());
        assert!(!money.is_negative());
        assert!(!money.is_positive());
    }

    #[test]
    fn test_money_sign_predicates() {
        assert!(Money::from_minor(10, Currency::Usd).is_positive());
        assert!(Money::from_minor(-10, Currency::Usd).is_negative());
        assert!(!Money::from_minor(-10, Currency::Usd).is_positive());
    }

    #[test]
    fn test_checked_add() {
        let a = Money::from_minor(150, Currency::Usd);
        let b = Money::from_minor(50, Currency::Usd);
        assert_eq!(a.checked_add(b).unwrap(), Money::from_minor(200, Currency::Usd));
    }

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::from_minor(50, Currency::Usd);
        let b = Money::from_minor(150, Currency::Usd);
        // Signed deltas are allowed at the Money level; balance rules live
        // in the ledger.
        assert_eq!(a.checked_sub(b).unwrap(), Money::from_minor(-100, Currency::Usd));
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::from_minor(100, Currency::Usd);
        let eur = Money::from_minor(100, Currency::Eur);
        assert_eq!(
            usd.checked_add(eur),
            Err(MoneyError::CurrencyMismatch {
                left: Currency::Usd,
                right: Currency::Eur,
            })
        );
        assert_eq!(
            usd.compare(&eur),
            Err(MoneyError::CurrencyMismatch {
                left: Currency::Usd,
                right: Currency::Eur,
            })
        );
    }

    #[test]
    fn test_overflow_at_ceiling() {
        let near = Money::from_minor(MAX_MINOR_UNITS, Currency::Usd);
        let one = Money::from_minor(1, Currency::Usd);
        assert_eq!(near.checked_add(one), Err(MoneyError::ArithmeticOverflow));

        let low = Money::from_minor(-MAX_MINOR_UNITS, Currency::Usd);
        assert_eq!(low.checked_sub(one), Err(MoneyError::ArithmeticOverflow));
    }

    #[test]
    fn test_overflow_beyond_i64() {
        let max = Money::from_minor(i64::MAX, Currency::Usd);
        let one = Money::from_minor(1, Currency::Usd);
        assert_eq!(max.checked_add(one), Err(MoneyError::ArithmeticOverflow));
    }

    #[test]
    fn test_checked_neg() {
        let a = Money::from_minor(250, Currency::Usd);
        assert_eq!(a.checked_neg().unwrap(), Money::from_minor(-250, Currency::Usd));
    }

    #[test]
    fn test_compare_same_currency() {
        let a = Money::from_minor(100, Currency::Usd);
        let b = Money::from_minor(200, Currency::Usd);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
        assert_eq!(b.compare(&a).unwrap(), Ordering::Greater);
        assert_eq!(a.compare(&a).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_partial_ord_mixed_currency_is_none() {
        let usd = Money::from_minor(100, Currency::Usd);
        let jpy = Money::from_minor(100, Currency::Jpy);
        assert_eq!(usd.partial_cmp(&jpy), None);
        assert!(usd < Money::from_minor(200, Currency::Usd));
    }

    #[rstest]
    #[case(Money::from_minor(15_00, Currency::Usd), "15.00 USD")]
    #[case(Money::from_minor(5, Currency::Usd), "0.05 USD")]
    #[case(Money::from_minor(-250, Currency::Eur), "-2.50 EUR")]
    #[case(Money::from_minor(1500, Currency::Jpy), "1500 JPY")]
    fn test_to_display(#[case] money: Money, #[case] expected: &str) {
        assert_eq!(money.to_display(), expected);
    }

    #[test]
    fn test_display_matches_decimal_scaling() {
        use rust_decimal_macros::dec;
        let money = Money::from_minor(123_45, Currency::Usd);
        let scaled = Decimal::new(money.amount, 2);
        assert_eq!(scaled, dec!(123.45));
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::Usd.to_string(), "USD");
        assert_eq!(Currency::Eur.to_string(), "EUR");
        assert_eq!(Currency::Idr.to_string(), "IDR");
        assert_eq!(Currency::Jpy.to_string(), "JPY");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("EUR").unwrap(), Currency::Eur);
        assert_eq!(Currency::from_str("IDR").unwrap(), Currency::Idr);
        assert_eq!(Currency::from_str("JPY").unwrap(), Currency::Jpy);

        assert!(Currency::from_str("XXX").is_err());
        assert!(Currency::from_str("").is_err());
    }
}
