//! Swap quoting against a single pool snapshot
//!
//! A quote is always phrased in base/quote terms. `side` says what the
//! trader does with the base token, `exact` says which leg of the trade is
//! fixed:
//!
//! | side | exact | `amount` is    | computed  |
//! |------|-------|----------------|-----------|
//! | Sell | In    | base paid in   | quote out |
//! | Sell | Out   | quote received | base in   |
//! | Buy  | Out   | base received  | quote in  |
//! | Buy  | In    | quote paid in  | base out  |

use ethers_core::types::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FixedPointError, QuoteError};
use crate::fixed_point::u256_dec;
use crate::pool::{PoolModel, PoolType};
use crate::pool_traits::AmmPool;
use crate::price::Price;
use crate::slippage::Slippage;
use crate::token::{Token, TokenSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exact {
    In,
    Out,
}

/// Priced swap with worst-case bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub side: Side,
    pub exact: Exact,
    pub base: Token,
    pub quote: Token,
    pub token_in: Token,
    pub token_out: Token,
    /// Total paid in, fee included
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    #[serde(with = "u256_dec")]
    pub fee: U256,
    /// Raw quote per raw base actually paid or received
    pub execution_price: Price,
    pub price_impact_pct: Decimal,
    pub slippage_pct: Decimal,
    /// Equals `amount_out` for exact-output quotes
    #[serde(with = "u256_dec")]
    pub min_amount_out: U256,
    /// Equals `amount_in` for exact-input quotes
    #[serde(with = "u256_dec")]
    pub max_amount_in: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqrt_price_after: Option<U256>,
}

impl Quote {
    /// Execution price in display units, quote per base
    pub fn execution_price_human(&self) -> Result<Decimal, FixedPointError> {
        self.execution_price.to_human(self.base.decimals, self.quote.decimals)
    }
}

/// Quote a swap with token0 as the base token
pub fn quote_swap(
    pool: &PoolModel,
    amount: U256,
    side: Side,
    exact: Exact,
    slippage_pct: Decimal,
) -> Result<Quote, QuoteError> {
    quote_swap_on_side(pool, TokenSide::Token0, amount, side, exact, slippage_pct)
}

/// Quote a swap with the pool token at `base_address` as the base token
pub fn quote_swap_for_base(
    pool: &PoolModel,
    base_address: &str,
    amount: U256,
    side: Side,
    exact: Exact,
    slippage_pct: Decimal,
) -> Result<Quote, QuoteError> {
    let base_side = pool.side_of(base_address)?;
    quote_swap_on_side(pool, base_side, amount, side, exact, slippage_pct)
}

fn quote_swap_on_side(
    pool: &PoolModel,
    base_side: TokenSide,
    amount: U256,
    side: Side,
    exact: Exact,
    slippage_pct: Decimal,
) -> Result<Quote, QuoteError> {
    let slippage = Slippage::from_pct(slippage_pct)?;

    let side_in = match side {
        Side::Sell => base_side,
        Side::Buy => base_side.opposite(),
    };
    let zero_for_one = side_in == TokenSide::Token0;

    let outcome = match exact {
        Exact::In => pool.swap_exact_in(zero_for_one, amount)?,
        Exact::Out => pool.swap_exact_out(zero_for_one, amount)?,
    };
    if outcome.amount_out.is_zero() {
        return Err(QuoteError::ZeroOutput {
            amount_in: outcome.amount_in,
        });
    }

    let (min_amount_out, max_amount_in) = match exact {
        Exact::In => (slippage.min_amount_out(outcome.amount_out)?, outcome.amount_in),
        Exact::Out => (outcome.amount_out, slippage.max_amount_in(outcome.amount_in)?),
    };

    let (base_amount, quote_amount) = if side_in == base_side {
        (outcome.amount_in, outcome.amount_out)
    } else {
        (outcome.amount_out, outcome.amount_in)
    };
    let execution_price = Price::from_amounts(quote_amount, base_amount)?;
    let price_impact_pct = price_impact_pct(pool, zero_for_one, outcome.amount_in, outcome.amount_out)?;

    debug!(
        pool_type = ?pool.pool_type(),
        ?side,
        ?exact,
        amount_in = %outcome.amount_in,
        amount_out = %outcome.amount_out,
        %price_impact_pct,
        "swap quoted"
    );

    Ok(Quote {
        side,
        exact,
        base: pool.token(base_side).clone(),
        quote: pool.token(base_side.opposite()).clone(),
        token_in: pool.token(side_in).clone(),
        token_out: pool.token(side_in.opposite()).clone(),
        amount_in: outcome.amount_in,
        amount_out: outcome.amount_out,
        fee: outcome.fee,
        execution_price,
        price_impact_pct,
        slippage_pct: slippage.pct(),
        min_amount_out,
        max_amount_in,
        sqrt_price_after: outcome.sqrt_price_after,
    })
}

/// `|fill / spot - 1| * 100` with both prices as output per input
fn price_impact_pct(
    pool: &PoolModel,
    zero_for_one: bool,
    amount_in: U256,
    amount_out: U256,
) -> Result<Decimal, QuoteError> {
    let spot = pool.spot_price().ok_or(QuoteError::InsufficientLiquidity {
        requested: amount_in,
        available: U256::zero(),
    })?;
    let spot = if zero_for_one { spot } else { spot.invert()? };
    let fill = Price::from_amounts(amount_out, amount_in)?;
    Ok(fill.deviation_pct(&spot)?)
}

/// Default tolerances applied when a request carries none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoterSettings {
    pub constant_product_slippage_pct: Decimal,
    pub concentrated_liquidity_slippage_pct: Decimal,
}

impl Default for QuoterSettings {
    fn default() -> Self {
        Self {
            constant_product_slippage_pct: dec!(1),
            concentrated_liquidity_slippage_pct: dec!(1),
        }
    }
}

impl QuoterSettings {
    pub fn default_slippage_pct(&self, pool_type: PoolType) -> Decimal {
        match pool_type {
            PoolType::ConstantProduct => self.constant_product_slippage_pct,
            PoolType::ConcentratedLiquidity => self.concentrated_liquidity_slippage_pct,
        }
    }

    /// `requested`, or the configured default for the pool's type
    pub fn resolve_slippage_pct(&self, pool: &PoolModel, requested: Option<Decimal>) -> Decimal {
        requested.unwrap_or_else(|| self.default_slippage_pct(pool.pool_type()))
    }
}

/// [`quote_swap_for_base`] falling back to the configured tolerance
///
/// `base_address` of `None` means token0.
pub fn quote_swap_with_settings(
    settings: &QuoterSettings,
    pool: &PoolModel,
    base_address: Option<&str>,
    amount: U256,
    side: Side,
    exact: Exact,
    slippage_pct: Option<Decimal>,
) -> Result<Quote, QuoteError> {
    let slippage_pct = settings.resolve_slippage_pct(pool, slippage_pct);
    let base_side = match base_address {
        Some(address) => pool.side_of(address)?,
        None => TokenSide::Token0,
    };
    quote_swap_on_side(pool, base_side, amount, side, exact, slippage_pct)
}
