//! Value Objects for the web store

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Digits allowed after the decimal point for any stored amount.
pub const MONEY_DECIMAL_PLACES: u32 = 2;
/// Total significant digits allowed for any stored amount.
pub const MONEY_MAX_DIGITS: u32 = 20;

/// Fixed-point monetary amount (`NUMERIC(20, 2)` in storage). Serializes as
/// a two-decimal string, e.g. `"10.50"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }

    /// Build from an integer number of cents, e.g. `Money::from_cents(19_999)` is 199.99.
    pub fn from_cents(cents: i64) -> Self { Self(Decimal::new(cents, MONEY_DECIMAL_PLACES)) }

    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    pub fn multiply(&self, qty: usize) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Checks the amount fits the storage column: non-negative, at most two
    /// decimal places and twenty digits overall.
    pub fn check(&self) -> Result<(), MoneyError> {
        if self.0.is_sign_negative() && !self.0.is_zero() { return Err(MoneyError::Negative); }
        let normalized = self.0.normalize();
        if normalized.scale() > MONEY_DECIMAL_PLACES { return Err(MoneyError::TooManyDecimalPlaces); }
        let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;
        if integer_digits > MONEY_MAX_DIGITS - MONEY_DECIMAL_PLACES { return Err(MoneyError::TooManyDigits); }
        Ok(())
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::ZERO, Add::add) }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self { iter.copied().sum() }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError { Negative, TooManyDecimalPlaces, TooManyDigits }

impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "Ensure this value is greater than or equal to 0."),
            Self::TooManyDecimalPlaces => write!(f, "Ensure that there are no more than {MONEY_DECIMAL_PLACES} decimal places."),
            Self::TooManyDigits => write!(f, "Ensure that there are no more than {MONEY_MAX_DIGITS} digits in total."),
        }
    }
}

/// Cart shipping rule: a flat fee per line item, waived once the subtotal
/// reaches the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreightPolicy {
    pub flat_fee: Money,
    pub free_threshold: Money,
}

impl FreightPolicy {
    /// Subtotal at or above which carts ship for free.
    pub const DEFAULT_FREE_THRESHOLD_CENTS: i64 = 25_000;

    pub fn new(flat_fee: Money) -> Self {
        Self { flat_fee, free_threshold: Money::from_cents(Self::DEFAULT_FREE_THRESHOLD_CENTS) }
    }

    pub fn freight(&self, item_count: usize, subtotal: Money) -> Money {
        if subtotal < self.free_threshold { self.flat_fee.multiply(item_count) } else { Money::ZERO }
    }
}

impl Default for FreightPolicy {
    fn default() -> Self { Self::new(Money::from_cents(1_000)) }
}
