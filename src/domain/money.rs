//! Integer-cent money arithmetic.
//!
//! Amounts cross the boundary as decimals with two fractional digits
//! (`"15.00"`, `numeric(10,2)`). Everything in between is an `i64` count of
//! cents so sums and products stay exact.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount {0} is out of range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);
    /// Largest magnitude a `numeric(10,2)` column holds: 99,999,999.99.
    pub const MAX_STORED: Cents = Cents(9_999_999_999);

    pub const fn new(cents: i64) -> Self {
        Cents(cents)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Scale by 100 and round half away from zero.
    pub fn from_decimal(value: &BigDecimal) -> Result<Self, MoneyError> {
        let hundred = BigDecimal::from(100);
        (value * &hundred)
            .with_scale_round(0, RoundingMode::HalfUp)
            .to_i64()
            .map(Cents)
            .ok_or_else(|| MoneyError::OutOfRange(value.to_string()))
    }

    /// Parse a user-supplied amount. Accepts `,` as the decimal separator and
    /// rejects anything a money column cannot store.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let normalized = input.trim().replace(',', ".");
        if normalized.is_empty() {
            return Err(MoneyError::Invalid(input.to_string()));
        }
        let value = BigDecimal::from_str(&normalized)
            .map_err(|_| MoneyError::Invalid(input.to_string()))?;
        Self::from_decimal(&value)?
            .storable()
            .ok_or_else(|| MoneyError::OutOfRange(input.trim().to_string()))
    }

    /// `Some(self)` when the amount fits a `numeric(10,2)` column.
    pub fn storable(self) -> Option<Cents> {
        (self.0.unsigned_abs() <= Self::MAX_STORED.0.unsigned_abs()).then_some(self)
    }

    pub fn to_decimal(self) -> BigDecimal {
        BigDecimal::new(self.0.into(), 2)
    }

    pub fn times(self, quantity: i32) -> Option<Cents> {
        self.0.checked_mul(i64::from(quantity)).map(Cents)
    }

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Mean of `count` amounts summing to `total`, rounded half away from
    /// zero. An empty group averages to zero.
    pub fn average(total: Cents, count: i64) -> Cents {
        if count <= 0 {
            return Cents::ZERO;
        }
        let quotient = total.0 / count;
        let remainder = total.0 % count;
        if remainder.unsigned_abs() * 2 >= count.unsigned_abs() {
            Cents(quotient + total.0.signum())
        } else {
            Cents(quotient)
        }
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Cents {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cents::parse(s)
    }
}
