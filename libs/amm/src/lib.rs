//! # Gateway AMM Library - DEX Pricing and Liquidity Sizing Core
//!
//! ## Purpose
//!
//! Exact, deterministic math behind swap quotes and liquidity deposits for
//! constant-product (x*y=k) and concentrated-liquidity pools. Converts between
//! human prices, ticks and Q64.96 sqrt prices, sizes positions against a pool
//! snapshot, and prices swaps with slippage-bounded guarantees. No floating
//! point enters the tick/price/liquidity path.
//!
//! ## Integration Points
//!
//! - **Input Sources**: [`PoolModel`] snapshots built by a [`PoolStateReader`],
//!   token metadata from a [`TokenResolver`], request parameters from callers
//! - **Output Destinations**: route handlers, CLI, transaction builders
//! - **Protocol Support**: constant-product pools (fixed 0.3% fee) and
//!   concentrated-liquidity pools (any fee tier, any tick spacing)
//! - **Precision**: amounts in native token units (18 decimals WETH, 6 USDC),
//!   256-bit integers with 512-bit intermediates
//!
//! ## Architecture Role
//!
//! ```text
//! PoolStateReader ──▶ PoolModel ──┬──▶ size_position / quote_liquidity ──▶ Position
//!                                 │                                       LiquidityQuote
//!                                 └──▶ quote_swap                       ──▶ Quote
//!                       tick_math ◀─── fixed_point
//! ```
//!
//! Every function is pure and synchronous: a call owns its snapshot and
//! identical inputs always produce identical outputs, so the same quote can be
//! recomputed on any thread for cross-checking. Fetching and caching pool
//! state is the reader's job, never this crate's.

pub mod error;
pub mod fixed_point;
pub mod liquidity_sizing;
pub mod pool;
pub mod pool_traits;
pub mod price;
pub mod quote;
pub mod slippage;
pub mod tick_math;
pub mod token;
pub mod v2_math;
pub mod v3_math;

pub use error::{FixedPointError, PoolError, QuoteError, SizingError, SlippageError, TickMathError};
pub use liquidity_sizing::{quote_liquidity, size_position, LiquidityQuote, Position};
pub use pool::{ConcentratedLiquidityPool, ConstantProductPool, PoolInfo, PoolModel, PoolType};
pub use pool_traits::{AmmPool, PoolStateReader, SwapOutcome, TokenResolver};
pub use price::Price;
pub use quote::{quote_swap, quote_swap_for_base, quote_swap_with_settings, Exact, Quote, QuoterSettings, Side};
pub use slippage::Slippage;
pub use tick_math::{
    nearest_usable_tick, price_to_tick_with_decimals, sqrt_price_to_tick, tick_to_price_with_decimals,
    tick_to_sqrt_price, MAX_TICK, MIN_TICK,
};
pub use token::{Token, TokenAmount, TokenSide};
pub use v2_math::V2Math;
pub use v3_math::{SwapStep, V3Math};

/// Common types for AMM calculations
pub use ethers_core::types::U256;
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
