//! Decimal amounts and conversion to integer base units

use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places of the stake token and of the native coin
pub const TOKEN_DECIMALS: u8 = 18;

/// Errors from parsing or converting amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount: {0:?}")]
    Invalid(String),

    #[error("amount is negative")]
    Negative,

    #[error("amount is out of range")]
    Overflow,

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("amount is too low")]
    TooLow,
}

/// A human-readable decimal amount.
///
/// Accepts plain (`12.5`) and scientific (`1.25e1`) notation. Values are
/// normalized, so `1.0 == 1` and zero is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Parse, treating anything non-numeric (or missing) as zero.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|e| {
            tracing::debug!(raw, error = %e, "unparseable amount, using zero");
            Self::zero()
        })
    }

    fn new(value: Decimal) -> Self {
        if value.is_zero() {
            Self::zero()
        } else {
            Self(value.normalize())
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Convert to integer base units (`amount × 10^decimals`), flooring extra fraction digits.
    pub fn to_base_units(&self, decimals: u8) -> Result<U256, AmountError> {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            return Err(AmountError::Negative);
        }
        let truncated = self
            .0
            .round_dp_with_strategy(u32::from(decimals), RoundingStrategy::ToZero);
        let mantissa = u128::try_from(truncated.mantissa()).map_err(|_| AmountError::Negative)?;
        let shift = u32::from(decimals).saturating_sub(truncated.scale());
        U256::from(10u8)
            .checked_pow(U256::from(shift))
            .and_then(|factor| U256::from(mantissa).checked_mul(factor))
            .ok_or(AmountError::Overflow)
    }

    /// Base units for a stake: positive, and nonzero after flooring
    pub fn to_stake_units(&self, decimals: u8) -> Result<U256, AmountError> {
        if !self.is_positive() {
            return Err(AmountError::NotPositive);
        }
        let units = self.to_base_units(decimals)?;
        if units.is_zero() {
            return Err(AmountError::TooLow);
        }
        Ok(units)
    }

    /// Convert integer base units back to a decimal amount
    pub fn from_base_units(units: U256, decimals: u8) -> Result<Self, AmountError> {
        let mantissa = i128::try_from(units).map_err(|_| AmountError::Overflow)?;
        Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals))
            .map(Self::new)
            .map_err(|_| AmountError::Overflow)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        // "7." and ".25" are common shorthand
        let body = body.strip_suffix('.').unwrap_or(body);
        if body.is_empty() || body.starts_with(['-', '+']) {
            return Err(AmountError::Invalid(raw.to_string()));
        }
        let body = match body.strip_prefix('.') {
            Some(fraction) => format!("0.{fraction}"),
            None => body.to_string(),
        };

        let value = Decimal::from_str(&body)
            .or_else(|_| Decimal::from_scientific(&body))
            .map_err(|e| match e {
                rust_decimal::Error::ExceedsMaximumPossibleValue
                | rust_decimal::Error::LessThanMinimumPossibleValue => AmountError::Overflow,
                _ => AmountError::Invalid(raw.to_string()),
            })?;
        Ok(Self::new(if negative { -value } else { value }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
