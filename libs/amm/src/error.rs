//! Error types for tick math, pool snapshots, liquidity sizing and quoting
//!
//! Every failure the core can hit for a well-formed call is a variant here;
//! none of them are retryable since the inputs fully determine the outcome.

use ethers_core::types::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the 256/512-bit fixed-point helpers
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FixedPointError {
    /// Result does not fit in 256 bits
    #[error("fixed-point overflow")]
    Overflow,

    /// Subtraction went below zero
    #[error("fixed-point underflow")]
    Underflow,

    #[error("division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Negative input where only non-negative values are meaningful
    #[error("negative value in unsigned fixed-point arithmetic")]
    Negative,
}

/// Errors from tick <-> sqrt price <-> price conversion
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TickMathError {
    #[error("tick {tick} outside [{min}, {max}]", min = crate::tick_math::MIN_TICK, max = crate::tick_math::MAX_TICK)]
    TickOutOfBounds { tick: i32 },

    #[error("sqrt price {sqrt_price_x96} outside the representable tick range")]
    SqrtPriceOutOfBounds { sqrt_price_x96: U256 },

    #[error("invalid price {price}: {reason}")]
    InvalidPrice { price: Decimal, reason: &'static str },

    #[error("tick spacing must be positive, got {spacing}")]
    InvalidTickSpacing { spacing: i32 },

    #[error("overflow in tick math: {0}")]
    Overflow(#[from] FixedPointError),
}

/// Errors raised while building or reading a pool snapshot
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("pool tokens must be distinct, got {address} twice")]
    IdenticalTokens { address: String },

    #[error("token {address} is not part of this pool")]
    UnknownToken { address: String },

    /// One reserve is empty while the other is not, or reserves exist without LP supply
    #[error("inconsistent reserves: reserve0={reserve0}, reserve1={reserve1}, total_supply={total_supply}")]
    InconsistentReserves {
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    },

    #[error("fee of {fee_bps} bps is not below 100%")]
    InvalidFee { fee_bps: u32 },

    #[error("current tick {current_tick} does not match sqrt price (expected {expected})")]
    CurrentTickMismatch { current_tick: i32, expected: i32 },

    /// Burning more LP tokens than exist
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: U256, available: U256 },

    #[error("overflow reading pool state: {0}")]
    Overflow(#[from] FixedPointError),

    #[error(transparent)]
    TickMath(#[from] TickMathError),
}

/// Slippage tolerance outside `[0, 100)`
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SlippageError {
    #[error("slippage {pct}% outside [0, 100)")]
    OutOfRange { pct: Decimal },

    #[error("overflow applying slippage: {0}")]
    Overflow(#[from] FixedPointError),
}

/// Errors from position sizing
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SizingError {
    /// Lower tick not strictly below the upper tick, or a bound outside the tick domain
    #[error("invalid tick range [{lower}, {upper})")]
    InvalidRange { lower: i32, upper: i32 },

    #[error("concentrated-liquidity sizing needs a tick range")]
    MissingRange,

    #[error("tick {tick} is not a multiple of tick spacing {spacing}")]
    UnalignedTick { tick: i32, spacing: i32 },

    /// A fresh pool has no ratio to derive the second amount from
    #[error("pool has no reserves: both token amounts are required to set the initial ratio")]
    AmbiguousInitialRatio,

    #[error("insufficient input: {reason}")]
    InsufficientInput { reason: &'static str },

    #[error(transparent)]
    InvalidSlippage(#[from] SlippageError),

    #[error("overflow while sizing position: {0}")]
    Overflow(#[from] FixedPointError),

    #[error(transparent)]
    TickMath(#[from] TickMathError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors from swap quoting
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuoteError {
    #[error("swap amount must be greater than zero")]
    ZeroAmount,

    /// Input too small to buy a single unit of the output token
    #[error("input of {amount_in} rounds to zero output")]
    ZeroOutput { amount_in: U256 },

    /// Requested output is at or above what the pool can pay out
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: U256, available: U256 },

    /// The trade would push the price out of the current tick interval
    #[error("trade would cross the current tick interval [{tick_lower}, {tick_upper})")]
    PriceLimitExceeded { tick_lower: i32, tick_upper: i32 },

    #[error(transparent)]
    InvalidSlippage(#[from] SlippageError),

    #[error("overflow while quoting: {0}")]
    Overflow(#[from] FixedPointError),

    #[error(transparent)]
    TickMath(#[from] TickMathError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
