use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// Parses statement amount text such as `"1,234.50"`.
    ///
    /// Surrounding whitespace and every `separator` character are removed
    /// before conversion. Returns `None` when the remainder is not a number.
    /// Precision is kept as written; only `Display` rounds to cents.
    pub fn parse_grouped(text: &str, separator: char) -> Option<Self> {
        let cleaned: String = text.trim().chars().filter(|c| *c != separator).collect();
        if cleaned.is_empty() {
            return None;
        }
        Decimal::from_str(&cleaned)
            .or_else(|_| Decimal::from_scientific(&cleaned))
            .ok()
            .map(Money)
    }

    /// `None` when the sum does not fit in a `Decimal`.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Fraction of `total` this amount represents, in the range used for
    /// proportional charts. Zero totals yield zero.
    pub fn share_of(self, total: Money) -> f64 {
        if total.is_zero() {
            return 0.0;
        }
        self.0
            .checked_div(total.0)
            .and_then(|share| share.to_f64())
            .unwrap_or(0.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}
