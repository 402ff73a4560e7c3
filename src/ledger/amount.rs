// Amount - fixed-point currency value held and owed by the ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Base units per whole currency unit
pub const UNIT: u128 = 1_000_000_000_000_000_000;

const DECIMALS: usize = 18;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount literal: {0}")]
    InvalidLiteral(String),

    #[error("Too many decimal places: at most 18 allowed")]
    TooPrecise,

    #[error("Amount overflows the base unit range")]
    Overflow,
}

/// Currency value counted in base units (10^18 per unit)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Whole currency units
    pub const fn units(units: u128) -> Self {
        Self(units * UNIT)
    }

    /// Raw base units
    pub const fn from_base(base: u128) -> Self {
        Self(base)
    }

    pub fn base(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Scale by a basis-point factor (10_000 = 100%), rounding down
    pub fn checked_mul_bps(self, bps: u32) -> Option<Amount> {
        self.0
            .checked_mul(bps as u128)
            .map(|scaled| Amount(scaled / 10_000))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:0width$}", frac, width = DECIMALS);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse a decimal literal in whole units, e.g. `"1.5"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::InvalidLiteral(s.to_string()));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::InvalidLiteral(s.to_string()));
        }
        if frac.len() > DECIMALS {
            return Err(AmountError::TooPrecise);
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountError::Overflow)?
        };
        let frac_base: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS);
            padded.parse().map_err(|_| AmountError::Overflow)?
        };

        whole
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_base))
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }
}
