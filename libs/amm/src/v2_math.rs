//! Constant-product (x*y=k) math on raw integer reserves
//!
//! Rounding always favours the pool: outputs round down, required inputs
//! round up, so applying a quote never shrinks `reserve_in * reserve_out`.

use ethers_core::types::U256;

use crate::error::{FixedPointError, QuoteError};
use crate::fixed_point::{checked_add, checked_mul, checked_sub, mul_div, narrow};

/// LP tokens permanently locked when a pool is first funded
pub const MINIMUM_LIQUIDITY: u64 = 1000;

/// Basis-point denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Constant-product AMM math functions with zero precision loss
pub struct V2Math;

impl V2Math {
    /// Exact output for an exact input using x*y=k
    ///
    /// `out = in * (10000 - fee) * reserve_out / (reserve_in * 10000 + in * (10000 - fee))`
    pub fn calculate_output_amount(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<U256, QuoteError> {
        if amount_in.is_zero() {
            return Err(QuoteError::ZeroAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(QuoteError::InsufficientLiquidity {
                requested: amount_in,
                available: U256::zero(),
            });
        }

        let amount_in_with_fee = checked_mul(amount_in, U256::from(BPS_DENOMINATOR - fee_bps))?;
        let denominator = checked_add(
            checked_mul(reserve_in, U256::from(BPS_DENOMINATOR))?,
            amount_in_with_fee,
        )?;

        Ok(mul_div(amount_in_with_fee, reserve_out, denominator)?)
    }

    /// Required input for a desired output (reverse calculation)
    ///
    /// `in = reserve_in * out * 10000 / ((reserve_out - out) * (10000 - fee)) + 1`
    pub fn calculate_input_amount(
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<U256, QuoteError> {
        if amount_out.is_zero() {
            return Err(QuoteError::ZeroAmount);
        }
        if amount_out >= reserve_out || reserve_in.is_zero() {
            return Err(QuoteError::InsufficientLiquidity {
                requested: amount_out,
                available: reserve_out,
            });
        }

        let numerator = checked_mul(reserve_in, U256::from(BPS_DENOMINATOR))?;
        let denominator = checked_mul(reserve_out - amount_out, U256::from(BPS_DENOMINATOR - fee_bps))?;
        let amount_in = mul_div(numerator, amount_out, denominator)?;

        // Add 1 to round up (ensures sufficient input)
        Ok(checked_add(amount_in, U256::one())?)
    }

    /// Amount of the other token matching `amount_a` at the reserve ratio, rounded down
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256, FixedPointError> {
        mul_div(amount_a, reserve_b, reserve_a)
    }

    /// LP tokens minted when seeding an empty pool: `isqrt(a0 * a1) - MINIMUM_LIQUIDITY`
    ///
    /// `None` when the deposit is too small to clear the locked minimum.
    pub fn initial_liquidity(amount0: U256, amount1: U256) -> Result<Option<U256>, FixedPointError> {
        let root = narrow(amount0.full_mul(amount1).integer_sqrt())?;
        Ok(root
            .checked_sub(U256::from(MINIMUM_LIQUIDITY))
            .filter(|liquidity| !liquidity.is_zero()))
    }

    /// LP tokens minted for a deposit into a funded pool
    pub fn liquidity_for_amounts(
        amount0: U256,
        amount1: U256,
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    ) -> Result<U256, FixedPointError> {
        let from0 = mul_div(amount0, total_supply, reserve0)?;
        let from1 = mul_div(amount1, total_supply, reserve1)?;
        Ok(from0.min(from1))
    }

    /// Reserves returned when burning `liquidity` LP tokens
    pub fn withdraw_amounts(
        liquidity: U256,
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    ) -> Result<(U256, U256), FixedPointError> {
        Ok((
            mul_div(liquidity, reserve0, total_supply)?,
            mul_div(liquidity, reserve1, total_supply)?,
        ))
    }

    /// Reserves after a swap, input side first
    pub fn reserves_after_swap(
        reserve_in: U256,
        reserve_out: U256,
        amount_in: U256,
        amount_out: U256,
    ) -> Result<(U256, U256), FixedPointError> {
        Ok((checked_add(reserve_in, amount_in)?, checked_sub(reserve_out, amount_out)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_v2_output_calculation() {
        // 10 base in against 1000:2_000_000 reserves, 0.3% fee
        let output = V2Math::calculate_output_amount(u(10), u(1000), u(2_000_000), 30).unwrap();
        assert_eq!(output, u(19743));

        // Same trade at native precision (18dp base, 6dp quote)
        let output = V2Math::calculate_output_amount(
            u(10 * 10u128.pow(18)),
            u(1000 * 10u128.pow(18)),
            u(2_000_000 * 10u128.pow(6)),
            30,
        )
        .unwrap();
        assert_eq!(output, u(19_743_160_687));
    }

    #[test]
    fn test_v2_input_calculation() {
        let input = V2Math::calculate_input_amount(u(19743), u(1000), u(2_000_000), 30).unwrap();
        // Must be enough to produce the requested output
        let output = V2Math::calculate_output_amount(input, u(1000), u(2_000_000), 30).unwrap();
        assert!(output >= u(19743));
    }

    #[test]
    fn test_output_exceeding_reserve_fails() {
        let err = V2Math::calculate_input_amount(u(2_000_000), u(1000), u(2_000_000), 30).unwrap_err();
        assert_eq!(
            err,
            QuoteError::InsufficientLiquidity {
                requested: u(2_000_000),
                available: u(2_000_000)
            }
        );
    }

    #[test]
    fn test_invariant_never_decreases() {
        let (r_in, r_out) = (u(1_000_000), u(3_000_000));
        let amount_in = u(12_345);
        let out = V2Math::calculate_output_amount(amount_in, r_in, r_out, 30).unwrap();
        let (new_in, new_out) = V2Math::reserves_after_swap(r_in, r_out, amount_in, out).unwrap();
        assert!(new_in.full_mul(new_out) >= r_in.full_mul(r_out));
    }

    #[test]
    fn test_initial_liquidity() {
        assert_eq!(V2Math::initial_liquidity(u(4_000_000), u(1_000_000)).unwrap(), Some(u(1_999_000)));
        assert_eq!(V2Math::initial_liquidity(u(1000), u(1000)).unwrap(), None);
    }

    #[test]
    fn test_liquidity_and_withdraw() {
        let minted = V2Math::liquidity_for_amounts(u(100), u(250), u(1000), u(2000), u(500)).unwrap();
        assert_eq!(minted, u(50));
        let (a0, a1) = V2Math::withdraw_amounts(u(50), u(1000), u(2000), u(500)).unwrap();
        assert_eq!((a0, a1), (u(100), u(200)));
    }
}
