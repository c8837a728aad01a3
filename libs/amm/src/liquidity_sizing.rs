//! Position sizing for liquidity deposits
//!
//! Given the amounts a depositor is willing to put in, work out how much
//! liquidity they buy and how much of each token is actually consumed. A
//! concentrated range only accepts the two tokens in one ratio, fixed by
//! where the current price sits inside it; a constant-product pool only
//! accepts its reserve ratio. The side that runs out first is reported as
//! `limiting` and is consumed in full; the other side is trimmed.

use ethers_core::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FixedPointError, SizingError, TickMathError};
use crate::fixed_point::u256_dec;
use crate::pool::{ConcentratedLiquidityPool, ConstantProductPool, PoolModel};
use crate::slippage::Slippage;
use crate::tick_math::{
    nearest_usable_tick, price_to_tick_with_decimals, tick_to_price_with_decimals, tick_to_sqrt_price, MAX_TICK,
    MIN_TICK,
};
use crate::token::{Token, TokenSide};
use crate::v2_math::V2Math;
use crate::v3_math::V3Math;

/// Sized deposit in token0/token1 terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Full tick domain for constant-product pools
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// Range liquidity `L` for concentrated pools, LP tokens for constant product
    #[serde(with = "u256_dec")]
    pub liquidity: U256,
    #[serde(with = "u256_dec")]
    pub amount0: U256,
    #[serde(with = "u256_dec")]
    pub amount1: U256,
    /// Side consumed in full; `None` when both pass through unchanged (first deposit)
    pub limiting: Option<TokenSide>,
}

/// Size a deposit of up to `amount0`/`amount1` into `pool`
///
/// `range` is required for concentrated-liquidity pools and ignored for
/// constant-product pools. Zero amounts count as not supplied.
pub fn size_position(
    pool: &PoolModel,
    range: Option<(i32, i32)>,
    amount0: Option<U256>,
    amount1: Option<U256>,
) -> Result<Position, SizingError> {
    size_position_preferring(pool, range, amount0, amount1, TokenSide::Token0)
}

/// `preferred` takes the limiting role when both sides would mint exactly
/// the same liquidity
fn size_position_preferring(
    pool: &PoolModel,
    range: Option<(i32, i32)>,
    amount0: Option<U256>,
    amount1: Option<U256>,
    preferred: TokenSide,
) -> Result<Position, SizingError> {
    let amount0 = amount0.filter(|amount| !amount.is_zero());
    let amount1 = amount1.filter(|amount| !amount.is_zero());
    if amount0.is_none() && amount1.is_none() {
        return Err(nothing_supplied());
    }

    match pool {
        PoolModel::ConstantProduct(pool) => {
            if range.is_some() {
                warn!("tick range ignored for constant-product pool");
            }
            size_constant_product(pool, amount0, amount1, preferred)
        }
        PoolModel::ConcentratedLiquidity(pool) => {
            let (tick_lower, tick_upper) = range.ok_or(SizingError::MissingRange)?;
            size_concentrated(pool, tick_lower, tick_upper, amount0, amount1, preferred)
        }
    }
}

fn size_concentrated(
    pool: &ConcentratedLiquidityPool,
    tick_lower: i32,
    tick_upper: i32,
    amount0: Option<U256>,
    amount1: Option<U256>,
    preferred: TokenSide,
) -> Result<Position, SizingError> {
    validate_range(tick_lower, tick_upper, pool.tick_spacing())?;

    let sqrt_a = tick_to_sqrt_price(tick_lower)?;
    let sqrt_b = tick_to_sqrt_price(tick_upper)?;
    let sqrt_price = pool.sqrt_price_x96();

    let (liquidity, limiting) = if sqrt_price <= sqrt_a {
        // Below the range (or on its lower edge): only token0 is accepted
        let amount0 = amount0.ok_or(SizingError::InsufficientInput {
            reason: "range is above the current price and only accepts token0",
        })?;
        (V3Math::liquidity_for_amount0(sqrt_a, sqrt_b, amount0)?, TokenSide::Token0)
    } else if sqrt_price >= sqrt_b {
        let amount1 = amount1.ok_or(SizingError::InsufficientInput {
            reason: "range is below the current price and only accepts token1",
        })?;
        (V3Math::liquidity_for_amount1(sqrt_a, sqrt_b, amount1)?, TokenSide::Token1)
    } else {
        let from0 = amount0
            .map(|amount| V3Math::liquidity_for_amount0(sqrt_price, sqrt_b, amount))
            .transpose()?;
        let from1 = amount1
            .map(|amount| V3Math::liquidity_for_amount1(sqrt_a, sqrt_price, amount))
            .transpose()?;
        match (from0, from1) {
            (Some(l0), Some(l1)) if l1 < l0 || (l1 == l0 && preferred == TokenSide::Token1) => {
                (l1, TokenSide::Token1)
            }
            (Some(l0), _) => (l0, TokenSide::Token0),
            (None, Some(l1)) => (l1, TokenSide::Token1),
            (None, None) => return Err(nothing_supplied()),
        }
    };

    if liquidity > U256::from(u128::MAX) {
        return Err(FixedPointError::Overflow.into());
    }
    if liquidity.is_zero() {
        return Err(SizingError::InsufficientInput {
            reason: "amount too small to mint any liquidity",
        });
    }

    let (amount0, amount1) = V3Math::amounts_for_liquidity(sqrt_price, sqrt_a, sqrt_b, liquidity.as_u128())?;
    debug!(tick_lower, tick_upper, %liquidity, %amount0, %amount1, ?limiting, "sized concentrated position");

    Ok(Position {
        tick_lower,
        tick_upper,
        liquidity,
        amount0,
        amount1,
        limiting: Some(limiting),
    })
}

fn nothing_supplied() -> SizingError {
    SizingError::InsufficientInput {
        reason: "no token amount supplied",
    }
}

fn validate_range(tick_lower: i32, tick_upper: i32, spacing: i32) -> Result<(), SizingError> {
    if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(SizingError::InvalidRange {
            lower: tick_lower,
            upper: tick_upper,
        });
    }
    for tick in [tick_lower, tick_upper] {
        if tick % spacing != 0 {
            return Err(SizingError::UnalignedTick { tick, spacing });
        }
    }
    Ok(())
}

fn size_constant_product(
    pool: &ConstantProductPool,
    amount0: Option<U256>,
    amount1: Option<U256>,
    preferred: TokenSide,
) -> Result<Position, SizingError> {
    if pool.is_empty() {
        let (amount0, amount1) = match (amount0, amount1) {
            (Some(amount0), Some(amount1)) => (amount0, amount1),
            _ => return Err(SizingError::AmbiguousInitialRatio),
        };
        let liquidity = V2Math::initial_liquidity(amount0, amount1)?.ok_or(SizingError::InsufficientInput {
            reason: "initial deposit does not clear the minimum liquidity",
        })?;
        debug!(%liquidity, "sized first deposit");
        return Ok(Position {
            tick_lower: MIN_TICK,
            tick_upper: MAX_TICK,
            liquidity,
            amount0,
            amount1,
            limiting: None,
        });
    }

    let (reserve0, reserve1) = (pool.reserve0(), pool.reserve1());
    let (amount0, amount1, limiting) = match (amount0, amount1) {
        // The preferred side is tried first, so an exact ratio match keeps it limiting
        (Some(desired0), Some(desired1)) => match preferred {
            TokenSide::Token0 => {
                let optimal1 = V2Math::quote(desired0, reserve0, reserve1)?;
                if optimal1 <= desired1 {
                    (desired0, optimal1, TokenSide::Token0)
                } else {
                    (V2Math::quote(desired1, reserve1, reserve0)?, desired1, TokenSide::Token1)
                }
            }
            TokenSide::Token1 => {
                let optimal0 = V2Math::quote(desired1, reserve1, reserve0)?;
                if optimal0 <= desired0 {
                    (optimal0, desired1, TokenSide::Token1)
                } else {
                    (desired0, V2Math::quote(desired0, reserve0, reserve1)?, TokenSide::Token0)
                }
            }
        },
        (Some(desired0), None) => (desired0, V2Math::quote(desired0, reserve0, reserve1)?, TokenSide::Token0),
        (None, Some(desired1)) => (V2Math::quote(desired1, reserve1, reserve0)?, desired1, TokenSide::Token1),
        (None, None) => return Err(nothing_supplied()),
    };

    let liquidity = V2Math::liquidity_for_amounts(amount0, amount1, reserve0, reserve1, pool.total_supply())?;
    if liquidity.is_zero() {
        return Err(SizingError::InsufficientInput {
            reason: "amount too small to mint any LP tokens",
        });
    }
    debug!(%liquidity, %amount0, %amount1, ?limiting, "sized constant-product deposit");

    Ok(Position {
        tick_lower: MIN_TICK,
        tick_upper: MAX_TICK,
        liquidity,
        amount0,
        amount1,
        limiting: Some(limiting),
    })
}

/// Sized deposit in base/quote terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityQuote {
    pub base: Token,
    pub quote: Token,
    pub position: Position,
    #[serde(with = "u256_dec")]
    pub base_amount: U256,
    #[serde(with = "u256_dec")]
    pub quote_amount: U256,
    /// `base_amount` raised by the slippage tolerance, rounded up
    #[serde(with = "u256_dec")]
    pub base_amount_max: U256,
    #[serde(with = "u256_dec")]
    pub quote_amount_max: U256,
    /// The base amount is consumed in full and sets the liquidity
    pub base_limited: bool,
    /// Range edges after tick rounding, quote per base in display units
    pub price_lower: Option<Decimal>,
    pub price_upper: Option<Decimal>,
}

/// Size a deposit expressed in base/quote terms with a human price range
///
/// `price_range` is `(lower, upper)` in quote per base display units and is
/// snapped to the pool's usable ticks. It is ignored for constant-product
/// pools.
pub fn quote_liquidity(
    pool: &PoolModel,
    base_address: &str,
    price_range: Option<(Decimal, Decimal)>,
    base_amount: Option<U256>,
    quote_amount: Option<U256>,
    slippage_pct: Decimal,
) -> Result<LiquidityQuote, SizingError> {
    let slippage = Slippage::from_pct(slippage_pct)?;
    let base_side = pool.side_of(base_address)?;
    let base = pool.token(base_side).clone();
    let quote = pool.token(base_side.opposite()).clone();

    let range = match (pool, price_range) {
        (PoolModel::ConcentratedLiquidity(clmm), Some((price_lower, price_upper))) => {
            Some(price_range_to_ticks(clmm, base_side, price_lower, price_upper)?)
        }
        _ => None,
    };

    let (amount0, amount1) = match base_side {
        TokenSide::Token0 => (base_amount, quote_amount),
        TokenSide::Token1 => (quote_amount, base_amount),
    };
    let position = size_position_preferring(pool, range, amount0, amount1, base_side)?;

    let (base_amount, quote_amount) = match base_side {
        TokenSide::Token0 => (position.amount0, position.amount1),
        TokenSide::Token1 => (position.amount1, position.amount0),
    };

    let (price_lower, price_upper) = match (pool, range) {
        (PoolModel::ConcentratedLiquidity(_), Some((tick_lower, tick_upper))) => {
            let lower = tick_price(tick_lower, base_side, &base, &quote)?;
            let upper = tick_price(tick_upper, base_side, &base, &quote)?;
            // Inverting the price swaps which tick is the low end
            match base_side {
                TokenSide::Token0 => (Some(lower), Some(upper)),
                TokenSide::Token1 => (Some(upper), Some(lower)),
            }
        }
        _ => (None, None),
    };

    Ok(LiquidityQuote {
        base_limited: position.limiting == Some(base_side),
        base_amount_max: slippage.max_amount_in(base_amount)?,
        quote_amount_max: slippage.max_amount_in(quote_amount)?,
        base_amount,
        quote_amount,
        price_lower,
        price_upper,
        position,
        base,
        quote,
    })
}

/// Human quote-per-base range to usable `(tick_lower, tick_upper)`
fn price_range_to_ticks(
    pool: &ConcentratedLiquidityPool,
    base_side: TokenSide,
    price_lower: Decimal,
    price_upper: Decimal,
) -> Result<(i32, i32), SizingError> {
    let (decimals0, decimals1) = (pool.token0().decimals, pool.token1().decimals);
    let spacing = pool.tick_spacing();

    let (tick_lower, tick_upper) = match base_side {
        TokenSide::Token0 => (
            price_to_tick_with_decimals(price_lower, decimals0, decimals1)?,
            price_to_tick_with_decimals(price_upper, decimals0, decimals1)?,
        ),
        TokenSide::Token1 => (
            price_to_tick_with_decimals(invert_price(price_upper)?, decimals0, decimals1)?,
            price_to_tick_with_decimals(invert_price(price_lower)?, decimals0, decimals1)?,
        ),
    };

    let tick_lower = nearest_usable_tick(tick_lower, spacing)?;
    let tick_upper = nearest_usable_tick(tick_upper, spacing)?;
    debug!(%price_lower, %price_upper, tick_lower, tick_upper, "price range snapped to ticks");
    Ok((tick_lower, tick_upper))
}

fn invert_price(price: Decimal) -> Result<Decimal, TickMathError> {
    if price <= Decimal::ZERO {
        return Err(TickMathError::InvalidPrice {
            price,
            reason: "price must be positive",
        });
    }
    Decimal::ONE.checked_div(price).ok_or(TickMathError::InvalidPrice {
        price,
        reason: "price cannot be inverted",
    })
}

/// Display price of a tick as quote per base
fn tick_price(tick: i32, base_side: TokenSide, base: &Token, quote: &Token) -> Result<Decimal, TickMathError> {
    match base_side {
        TokenSide::Token0 => tick_to_price_with_decimals(tick, base.decimals, quote.decimals),
        TokenSide::Token1 => {
            let token1_per_token0 = tick_to_price_with_decimals(tick, quote.decimals, base.decimals)?;
            invert_price(token1_per_token0)
        }
    }
}
