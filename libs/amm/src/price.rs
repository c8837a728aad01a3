//! Exact rational prices in raw token units
//!
//! A [`Price`] is `numerator / denominator` in smallest units of the quoted
//! and priced tokens. Nothing is pre-scaled by token decimals; the human view
//! is produced on demand by [`Price::to_human`].

use ethers_core::types::{U256, U512};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FixedPointError;
use crate::fixed_point::{pow10, ratio_to_decimal, RESOLUTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    numerator: U512,
    denominator: U512,
}

impl Price {
    pub fn new(numerator: U512, denominator: U512) -> Result<Self, FixedPointError> {
        if denominator.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// `quote_amount / base_amount`
    pub fn from_amounts(quote_amount: U256, base_amount: U256) -> Result<Self, FixedPointError> {
        Self::new(U512::from(quote_amount), U512::from(base_amount))
    }

    /// token1 per token0 from a Q64.96 sqrt price
    pub fn from_sqrt_price_x96(sqrt_price_x96: U256) -> Self {
        Self {
            numerator: sqrt_price_x96.full_mul(sqrt_price_x96),
            denominator: U512::one() << (2 * RESOLUTION),
        }
    }

    pub fn numerator(&self) -> U512 {
        self.numerator
    }

    pub fn denominator(&self) -> U512 {
        self.denominator
    }

    pub fn invert(&self) -> Result<Self, FixedPointError> {
        Self::new(self.denominator, self.numerator)
    }

    /// Display price: raw x 10^(base_decimals - quote_decimals)
    pub fn to_human(&self, base_decimals: u8, quote_decimals: u8) -> Result<Decimal, FixedPointError> {
        let numerator = self
            .numerator
            .checked_mul(pow10(u32::from(base_decimals))?)
            .ok_or(FixedPointError::Overflow)?;
        let denominator = self
            .denominator
            .checked_mul(pow10(u32::from(quote_decimals))?)
            .ok_or(FixedPointError::Overflow)?;
        ratio_to_decimal(numerator, denominator)
    }

    /// `|self / reference - 1| * 100`
    pub fn deviation_pct(&self, reference: &Price) -> Result<Decimal, FixedPointError> {
        if reference.numerator.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let lhs = self
            .numerator
            .checked_mul(reference.denominator)
            .ok_or(FixedPointError::Overflow)?;
        let rhs = reference
            .numerator
            .checked_mul(self.denominator)
            .ok_or(FixedPointError::Overflow)?;
        let difference = if lhs >= rhs { lhs - rhs } else { rhs - lhs };
        let scaled = difference
            .checked_mul(U512::from(100u8))
            .ok_or(FixedPointError::Overflow)?;
        ratio_to_decimal(scaled, rhs)
    }
}
