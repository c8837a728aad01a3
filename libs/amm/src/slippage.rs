//! Slippage tolerance and the worst-case bounds derived from it

use ethers_core::types::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SlippageError;
use crate::fixed_point::{decimal_parts, mul_div, mul_div_rounding_up, narrow, pow10};

/// Tolerance in percent, validated to `[0, 100)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Slippage {
    pct: Decimal,
}

impl Slippage {
    pub const ZERO: Self = Self { pct: Decimal::ZERO };

    pub fn from_pct(pct: Decimal) -> Result<Self, SlippageError> {
        if pct < Decimal::ZERO || pct >= dec!(100) {
            return Err(SlippageError::OutOfRange { pct });
        }
        Ok(Self { pct })
    }

    pub fn pct(&self) -> Decimal {
        self.pct
    }

    /// `floor(amount_out * (100 - pct) / 100)`
    pub fn min_amount_out(&self, amount_out: U256) -> Result<U256, SlippageError> {
        let (scale, bps) = self.scaled()?;
        Ok(mul_div(amount_out, scale - bps, scale)?)
    }

    /// `ceil(amount_in * (100 + pct) / 100)`
    pub fn max_amount_in(&self, amount_in: U256) -> Result<U256, SlippageError> {
        let (scale, bps) = self.scaled()?;
        Ok(mul_div_rounding_up(amount_in, scale + bps, scale)?)
    }

    /// `(100 * 10^s, mantissa)` such that pct = mantissa / 10^s
    fn scaled(&self) -> Result<(U256, U256), SlippageError> {
        let (mantissa, scale) = decimal_parts(self.pct)?;
        let hundred = narrow(pow10(scale)?)? * U256::from(100u8);
        Ok((hundred, narrow(mantissa)?))
    }
}

impl Default for Slippage {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Slippage {
    type Error = SlippageError;

    fn try_from(pct: Decimal) -> Result<Self, Self::Error> {
        Self::from_pct(pct)
    }
}

impl From<Slippage> for Decimal {
    fn from(slippage: Slippage) -> Self {
        slippage.pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_validation() {
        assert!(Slippage::from_pct(dec!(0)).is_ok());
        assert!(Slippage::from_pct(dec!(99.99)).is_ok());
        assert_eq!(
            Slippage::from_pct(dec!(100)),
            Err(SlippageError::OutOfRange { pct: dec!(100) })
        );
        assert!(Slippage::from_pct(dec!(-0.1)).is_err());
    }

    #[test]
    fn test_bounds() {
        let one_pct = Slippage::from_pct(dec!(1)).unwrap();
        assert_eq!(one_pct.min_amount_out(U256::from(19743u32)).unwrap(), U256::from(19545u32));
        assert_eq!(one_pct.max_amount_in(U256::from(1000u32)).unwrap(), U256::from(1010u32));
        // 1001 * 1.01 = 1011.01 rounds up
        assert_eq!(one_pct.max_amount_in(U256::from(1001u32)).unwrap(), U256::from(1012u32));

        let fractional = Slippage::from_pct(dec!(0.5)).unwrap();
        assert_eq!(fractional.min_amount_out(U256::from(1000u32)).unwrap(), U256::from(995u32));
    }

    #[test]
    fn test_zero_slippage_is_identity() {
        let amount = U256::from_dec_str("19743160687").unwrap();
        assert_eq!(Slippage::ZERO.min_amount_out(amount).unwrap(), amount);
        assert_eq!(Slippage::ZERO.max_amount_in(amount).unwrap(), amount);
    }
}
