// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A scaled decimal number whose ordering and equality deliberately disagree.
//!
//! [`Decimal`] keeps the scale it was written with: `0`, `0.0` and `0.00` are three different
//! values under `==` and [`Hash`], yet [`Decimal::cmp_value`] orders them as equal.  Types holding
//! decimals therefore have to choose whether their equality is structural or numeric, and the
//! verifier can check that the choice is made consistently (see `Config::using_decimal_cmp`).

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Errors which can occur when parsing a [`Decimal`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecimalError {
    /// The input was empty or held only a sign.
    #[error("no digits in decimal literal")]
    Empty,
    /// The input held something other than digits, one sign and one decimal point.
    #[error("invalid character {0:?} in decimal literal")]
    InvalidCharacter(char),
    /// The digits do not fit in the unscaled representation.
    #[error("decimal literal {0} is out of range")]
    OutOfRange(String),
}

/// `unscaled * 10^-scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

impl Decimal {
    /// Create a decimal from its unscaled value and scale.
    #[must_use]
    pub const fn new(unscaled: i128, scale: u32) -> Decimal {
        Decimal { unscaled, scale }
    }

    /// An integer value with scale 0.
    #[must_use]
    pub fn from_int(value: i64) -> Decimal {
        Decimal::new(i128::from(value), 0)
    }

    /// The unscaled value.
    #[must_use]
    pub const fn unscaled(&self) -> i128 {
        self.unscaled
    }

    /// The number of digits after the decimal point.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    /// Parse a decimal literal such as `-12.50`.  The scale is the number of digits written after
    /// the point.
    ///
    /// # Errors
    ///
    /// Returns a [`DecimalError`] if the input is not a decimal literal or does not fit.
    pub fn parse(input: &str) -> Result<Decimal, DecimalError> {
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(DecimalError::Empty);
        }
        if let Some(bad) = whole.chars().chain(fraction.chars()).find(|c| !c.is_ascii_digit()) {
            return Err(DecimalError::InvalidCharacter(bad));
        }
        let out_of_range = || DecimalError::OutOfRange(input.to_string());
        let scale = u32::try_from(fraction.len()).map_err(|_| out_of_range())?;
        let mut unscaled: i128 = 0;
        for digit in whole.bytes().chain(fraction.bytes()) {
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(digit - b'0')))
                .ok_or_else(out_of_range)?;
        }
        Ok(Decimal::new(if negative { -unscaled } else { unscaled }, scale))
    }

    /// Numeric comparison, ignoring scale: `0.00` and `0` compare as [`Ordering::Equal`].
    #[must_use]
    pub fn cmp_value(&self, other: &Decimal) -> Ordering {
        let sign = self.unscaled.signum().cmp(&other.unscaled.signum());
        if sign != Ordering::Equal || self.unscaled == 0 {
            return sign;
        }
        match self.scale.cmp(&other.scale) {
            Ordering::Equal => self.unscaled.cmp(&other.unscaled),
            Ordering::Less => {
                Self::cmp_rescaled(self.unscaled, other.scale - self.scale, other.unscaled)
            }
            Ordering::Greater => {
                Self::cmp_rescaled(other.unscaled, self.scale - other.scale, self.unscaled)
                    .reverse()
            }
        }
    }

    /// Compare `lhs * 10^shift` with `rhs`, both of the same sign.
    fn cmp_rescaled(lhs: i128, shift: u32, rhs: i128) -> Ordering {
        match 10_i128
            .checked_pow(shift)
            .and_then(|factor| lhs.checked_mul(factor))
        {
            Some(scaled) => scaled.cmp(&rhs),
            // the rescaled side's magnitude exceeds anything representable
            None if lhs > 0 => Ordering::Greater,
            None => Ordering::Less,
        }
    }

    /// The same number with trailing fractional zeros removed (`1.500` becomes `1.5`).
    #[must_use]
    pub fn normalized(&self) -> Decimal {
        let mut normalized = *self;
        if normalized.unscaled == 0 {
            normalized.scale = 0;
            return normalized;
        }
        while normalized.scale > 0 && normalized.unscaled % 10 == 0 {
            normalized.unscaled /= 10;
            normalized.scale -= 1;
        }
        normalized
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::parse(s)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let scale = usize::try_from(self.scale).map_err(|_| fmt::Error)?;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{whole}.{fraction}")
    }
}
