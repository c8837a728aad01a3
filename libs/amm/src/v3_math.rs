//! Concentrated-liquidity math for exact Q64.96 calculations
//!
//! Token deltas, next-sqrt-price and liquidity-from-amount formulas over a
//! single range of constant liquidity. Every rounding choice favours the
//! pool: amounts owed to the pool round up, amounts paid out round down.

use ethers_core::types::{U256, U512};

use crate::error::{FixedPointError, QuoteError};
use crate::fixed_point::{
    checked_add, checked_sub, div_rounding_up, mul_div, mul_div_rounding_up, narrow, Q96, RESOLUTION,
};
use crate::v2_math::BPS_DENOMINATOR;

/// Result of one constant-liquidity swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    /// Input consumed by the curve, excluding the fee
    pub amount_in: U256,
    pub amount_out: U256,
    /// Fee charged on top of `amount_in`
    pub fee_amount: U256,
    pub sqrt_price_next: U256,
}

impl SwapStep {
    /// Total paid by the trader
    pub fn gross_amount_in(&self) -> Result<U256, FixedPointError> {
        checked_add(self.amount_in, self.fee_amount)
    }
}

/// V3 AMM math with tick-based calculations
pub struct V3Math;

impl V3Math {
    /// token0 between two sqrt prices: `L * 2^96 * (sb - sa) / sb / sa`
    pub fn amount0_delta(
        sqrt_a: U256,
        sqrt_b: U256,
        liquidity: u128,
        round_up: bool,
    ) -> Result<U256, FixedPointError> {
        let (lower, upper) = ordered(sqrt_a, sqrt_b);
        if lower.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let numerator1 = U256::from(liquidity) << RESOLUTION;
        let numerator2 = upper - lower;

        if round_up {
            div_rounding_up(mul_div_rounding_up(numerator1, numerator2, upper)?, lower)
        } else {
            Ok(mul_div(numerator1, numerator2, upper)? / lower)
        }
    }

    /// token1 between two sqrt prices: `L * (sb - sa) / 2^96`
    pub fn amount1_delta(
        sqrt_a: U256,
        sqrt_b: U256,
        liquidity: u128,
        round_up: bool,
    ) -> Result<U256, FixedPointError> {
        let (lower, upper) = ordered(sqrt_a, sqrt_b);
        if round_up {
            mul_div_rounding_up(U256::from(liquidity), upper - lower, Q96)
        } else {
            mul_div(U256::from(liquidity), upper - lower, Q96)
        }
    }

    /// Price after adding (or removing) `amount` of token0, rounded up
    ///
    /// `L * 2^96 * sp / (L * 2^96 ± amount * sp)`, evaluated in 512 bits.
    pub fn next_sqrt_price_from_amount0(
        sqrt_price: U256,
        liquidity: u128,
        amount: U256,
        add: bool,
    ) -> Result<U256, QuoteError> {
        if amount.is_zero() {
            return Ok(sqrt_price);
        }
        let numerator1 = U512::from(liquidity) << RESOLUTION;
        let product = amount.full_mul(sqrt_price);

        let denominator = if add {
            numerator1 + product
        } else {
            if product >= numerator1 {
                return Err(QuoteError::InsufficientLiquidity {
                    requested: amount,
                    available: (U256::from(liquidity) << RESOLUTION) / sqrt_price,
                });
            }
            numerator1 - product
        };

        let full = numerator1 * U512::from(sqrt_price);
        let quotient = full / denominator;
        let rounded = if (full % denominator).is_zero() {
            quotient
        } else {
            quotient + U512::one()
        };
        Ok(narrow(rounded)?)
    }

    /// Price after adding (or removing) `amount` of token1, rounded down
    ///
    /// `sp ± amount * 2^96 / L`
    pub fn next_sqrt_price_from_amount1(
        sqrt_price: U256,
        liquidity: u128,
        amount: U256,
        add: bool,
    ) -> Result<U256, QuoteError> {
        if liquidity == 0 {
            return Err(QuoteError::InsufficientLiquidity {
                requested: amount,
                available: U256::zero(),
            });
        }
        let liquidity = U256::from(liquidity);

        if add {
            let quotient = mul_div(amount, Q96, liquidity)?;
            Ok(checked_add(sqrt_price, quotient)?)
        } else {
            let quotient = mul_div_rounding_up(amount, Q96, liquidity)?;
            if quotient >= sqrt_price {
                return Err(QuoteError::InsufficientLiquidity {
                    requested: amount,
                    available: mul_div(sqrt_price, liquidity, Q96)?,
                });
            }
            Ok(sqrt_price - quotient)
        }
    }

    /// Next price given an input amount (net of fee)
    pub fn next_sqrt_price_from_input(
        sqrt_price: U256,
        liquidity: u128,
        amount_in: U256,
        zero_for_one: bool,
    ) -> Result<U256, QuoteError> {
        if zero_for_one {
            Self::next_sqrt_price_from_amount0(sqrt_price, liquidity, amount_in, true)
        } else {
            Self::next_sqrt_price_from_amount1(sqrt_price, liquidity, amount_in, true)
        }
    }

    /// Next price given a desired output amount
    pub fn next_sqrt_price_from_output(
        sqrt_price: U256,
        liquidity: u128,
        amount_out: U256,
        zero_for_one: bool,
    ) -> Result<U256, QuoteError> {
        if zero_for_one {
            Self::next_sqrt_price_from_amount1(sqrt_price, liquidity, amount_out, false)
        } else {
            Self::next_sqrt_price_from_amount0(sqrt_price, liquidity, amount_out, false)
        }
    }

    /// Liquidity supported by `amount0` across `[sqrt_a, sqrt_b]`
    pub fn liquidity_for_amount0(sqrt_a: U256, sqrt_b: U256, amount0: U256) -> Result<U256, FixedPointError> {
        let (lower, upper) = ordered(sqrt_a, sqrt_b);
        let intermediate = mul_div(lower, upper, Q96)?;
        mul_div(amount0, intermediate, upper - lower)
    }

    /// Liquidity supported by `amount1` across `[sqrt_a, sqrt_b]`
    pub fn liquidity_for_amount1(sqrt_a: U256, sqrt_b: U256, amount1: U256) -> Result<U256, FixedPointError> {
        let (lower, upper) = ordered(sqrt_a, sqrt_b);
        mul_div(amount1, Q96, upper - lower)
    }

    /// Token amounts represented by `liquidity` in `[sqrt_a, sqrt_b]` at `sqrt_price`, rounded down
    pub fn amounts_for_liquidity(
        sqrt_price: U256,
        sqrt_a: U256,
        sqrt_b: U256,
        liquidity: u128,
    ) -> Result<(U256, U256), FixedPointError> {
        let (lower, upper) = ordered(sqrt_a, sqrt_b);

        if sqrt_price <= lower {
            Ok((Self::amount0_delta(lower, upper, liquidity, false)?, U256::zero()))
        } else if sqrt_price < upper {
            Ok((
                Self::amount0_delta(sqrt_price, upper, liquidity, false)?,
                Self::amount1_delta(lower, sqrt_price, liquidity, false)?,
            ))
        } else {
            Ok((U256::zero(), Self::amount1_delta(lower, upper, liquidity, false)?))
        }
    }

    /// Swap an exact input without moving past `sqrt_price_limit`
    ///
    /// Fails with `PriceLimitExceeded` (reported with zeroed ticks; callers
    /// fill in the interval) when the net input would carry the price
    /// beyond the limit. Landing exactly on the limit is allowed.
    pub fn swap_exact_in(
        sqrt_price: U256,
        sqrt_price_limit: U256,
        liquidity: u128,
        amount_in: U256,
        fee_bps: u32,
    ) -> Result<SwapStep, QuoteError> {
        if amount_in.is_zero() {
            return Err(QuoteError::ZeroAmount);
        }
        if liquidity == 0 {
            return Err(QuoteError::InsufficientLiquidity {
                requested: amount_in,
                available: U256::zero(),
            });
        }
        let zero_for_one = sqrt_price_limit < sqrt_price;

        let amount_less_fee = mul_div(
            amount_in,
            U256::from(BPS_DENOMINATOR - fee_bps),
            U256::from(BPS_DENOMINATOR),
        )?;
        let max_in = Self::input_to_reach(sqrt_price, sqrt_price_limit, liquidity, zero_for_one)?;
        if amount_less_fee > max_in {
            return Err(limit_exceeded());
        }

        // Landing exactly on the limit snaps to it; the formula could round past
        let sqrt_price_next = if amount_less_fee == max_in {
            sqrt_price_limit
        } else {
            Self::next_sqrt_price_from_input(sqrt_price, liquidity, amount_less_fee, zero_for_one)?
        };
        let (consumed, amount_out) = if zero_for_one {
            (
                Self::amount0_delta(sqrt_price_next, sqrt_price, liquidity, true)?,
                Self::amount1_delta(sqrt_price_next, sqrt_price, liquidity, false)?,
            )
        } else {
            (
                Self::amount1_delta(sqrt_price, sqrt_price_next, liquidity, true)?,
                Self::amount0_delta(sqrt_price, sqrt_price_next, liquidity, false)?,
            )
        };

        Ok(SwapStep {
            amount_in: consumed,
            amount_out,
            // Whatever the curve did not consume stays with the pool as fee
            fee_amount: checked_sub(amount_in, consumed)?,
            sqrt_price_next,
        })
    }

    /// Swap for an exact output without moving past `sqrt_price_limit`
    pub fn swap_exact_out(
        sqrt_price: U256,
        sqrt_price_limit: U256,
        liquidity: u128,
        amount_out: U256,
        fee_bps: u32,
    ) -> Result<SwapStep, QuoteError> {
        if amount_out.is_zero() {
            return Err(QuoteError::ZeroAmount);
        }
        if liquidity == 0 {
            return Err(QuoteError::InsufficientLiquidity {
                requested: amount_out,
                available: U256::zero(),
            });
        }
        let zero_for_one = sqrt_price_limit < sqrt_price;

        let max_out = if zero_for_one {
            Self::amount1_delta(sqrt_price_limit, sqrt_price, liquidity, false)?
        } else {
            Self::amount0_delta(sqrt_price, sqrt_price_limit, liquidity, false)?
        };
        if amount_out > max_out {
            return Err(limit_exceeded());
        }

        let sqrt_price_next = if amount_out == max_out {
            sqrt_price_limit
        } else {
            Self::next_sqrt_price_from_output(sqrt_price, liquidity, amount_out, zero_for_one)?
        };
        let amount_in = if zero_for_one {
            Self::amount0_delta(sqrt_price_next, sqrt_price, liquidity, true)?
        } else {
            Self::amount1_delta(sqrt_price, sqrt_price_next, liquidity, true)?
        };
        let fee_amount = mul_div_rounding_up(
            amount_in,
            U256::from(fee_bps),
            U256::from(BPS_DENOMINATOR - fee_bps),
        )?;

        Ok(SwapStep {
            amount_in,
            amount_out,
            fee_amount,
            sqrt_price_next,
        })
    }

    /// Net input needed to move the price from `sqrt_price` to `target`
    fn input_to_reach(
        sqrt_price: U256,
        target: U256,
        liquidity: u128,
        zero_for_one: bool,
    ) -> Result<U256, FixedPointError> {
        if zero_for_one {
            Self::amount0_delta(target, sqrt_price, liquidity, true)
        } else {
            Self::amount1_delta(sqrt_price, target, liquidity, true)
        }
    }
}

fn ordered(a: U256, b: U256) -> (U256, U256) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn limit_exceeded() -> QuoteError {
    QuoteError::PriceLimitExceeded {
        tick_lower: 0,
        tick_upper: 0,
    }
}
