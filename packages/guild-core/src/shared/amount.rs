//! Exact ledger amounts
//!
//! Ledger balances carry exactly seven fractional digits. They are kept as
//! an integer count of the smallest unit so sums never drift.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use crate::errors::{CoreError, Result};

/// Number of fractional digits in a ledger amount
pub const AMOUNT_SCALE: u32 = 7;

const UNITS_PER_WHOLE: i64 = 10_i64.pow(AMOUNT_SCALE);

/// Non-negative fixed point amount (1 unit = 10^-7)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from a raw count of the smallest unit
    pub fn from_units(units: i64) -> Self {
        Amount(units.max(0))
    }

    /// Build from whole tokens
    pub fn from_whole(whole: i64) -> Self {
        Amount::from_units(whole.saturating_mul(UNITS_PER_WHOLE))
    }

    pub fn units(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Whole tokens, fractional part truncated
    pub fn whole_units(&self) -> i64 {
        self.0 / UNITS_PER_WHOLE
    }

    /// Parse a decimal string such as `"12.5"` or `"0.0000001"`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use guild_core::Amount;
    ///
    /// let amount = Amount::parse("12.5").unwrap();
    /// assert_eq!(amount.units(), 125_000_000);
    /// assert_eq!(amount.to_string(), "12.5000000");
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(CoreError::invalid_amount(value, "empty amount"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(CoreError::invalid_amount(value, "expected decimal digits"));
        }
        if fraction.len() > AMOUNT_SCALE as usize {
            return Err(CoreError::invalid_amount(
                value,
                format!("more than {} fractional digits", AMOUNT_SCALE),
            ));
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| CoreError::invalid_amount(value, "integer part out of range"))?
        };
        let mut fraction_units: i64 = if fraction.is_empty() {
            0
        } else {
            fraction
                .parse()
                .map_err(|_| CoreError::invalid_amount(value, "fraction out of range"))?
        };
        fraction_units *= 10_i64.pow(AMOUNT_SCALE - fraction.len() as u32);

        whole_units
            .checked_mul(UNITS_PER_WHOLE)
            .and_then(|w| w.checked_add(fraction_units))
            .map(Amount)
            .ok_or_else(|| CoreError::invalid_amount(value, "amount out of range"))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:07}",
            self.0 / UNITS_PER_WHOLE,
            self.0 % UNITS_PER_WHOLE
        )
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Amount::parse(s)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Amount::parse(&raw).map_err(serde::de::Error::custom)
    }
}
