//! Pool trait definitions for unified AMM interface

use ethers_core::types::U256;
use tracing::trace;

use crate::error::QuoteError;
use crate::fixed_point::{checked_sub, mul_div};
use crate::pool::{ConcentratedLiquidityPool, ConstantProductPool, PoolModel};
use crate::price::Price;
use crate::token::{Token, TokenSide};
use crate::v2_math::{V2Math, BPS_DENOMINATOR};
use crate::v3_math::V3Math;

/// Raw result of one swap against one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    /// Total paid in, fee included
    pub amount_in: U256,
    pub amount_out: U256,
    /// Portion of `amount_in` kept by the pool as fee
    pub fee: U256,
    /// Sqrt price after the swap (concentrated liquidity only)
    pub sqrt_price_after: Option<U256>,
}

/// Unified pool interface for swap calculations
///
/// `zero_for_one` is true when token0 is paid in and token1 comes out.
pub trait AmmPool {
    fn tokens(&self) -> (&Token, &Token);

    fn fee_bps(&self) -> u32;

    /// Marginal price in raw token1 per raw token0
    fn spot_price(&self) -> Option<Price>;

    /// Output for an exact input
    fn swap_exact_in(&self, zero_for_one: bool, amount_in: U256) -> Result<SwapOutcome, QuoteError>;

    /// Required input for an exact output
    fn swap_exact_out(&self, zero_for_one: bool, amount_out: U256) -> Result<SwapOutcome, QuoteError>;
}

impl AmmPool for ConstantProductPool {
    fn tokens(&self) -> (&Token, &Token) {
        (self.token0(), self.token1())
    }

    fn fee_bps(&self) -> u32 {
        ConstantProductPool::fee_bps(self)
    }

    fn spot_price(&self) -> Option<Price> {
        ConstantProductPool::spot_price(self)
    }

    fn swap_exact_in(&self, zero_for_one: bool, amount_in: U256) -> Result<SwapOutcome, QuoteError> {
        let (reserve_in, reserve_out) = self.directed_reserves(zero_for_one);
        let amount_out = V2Math::calculate_output_amount(amount_in, reserve_in, reserve_out, self.fee_bps())?;
        Ok(SwapOutcome {
            amount_in,
            amount_out,
            fee: fee_portion(amount_in, self.fee_bps())?,
            sqrt_price_after: None,
        })
    }

    fn swap_exact_out(&self, zero_for_one: bool, amount_out: U256) -> Result<SwapOutcome, QuoteError> {
        let (reserve_in, reserve_out) = self.directed_reserves(zero_for_one);
        let amount_in = V2Math::calculate_input_amount(amount_out, reserve_in, reserve_out, self.fee_bps())?;
        Ok(SwapOutcome {
            amount_in,
            amount_out,
            fee: fee_portion(amount_in, self.fee_bps())?,
            sqrt_price_after: None,
        })
    }
}

impl ConstantProductPool {
    fn directed_reserves(&self, zero_for_one: bool) -> (U256, U256) {
        let side_in = if zero_for_one {
            TokenSide::Token0
        } else {
            TokenSide::Token1
        };
        (self.reserve(side_in), self.reserve(side_in.opposite()))
    }
}

impl AmmPool for ConcentratedLiquidityPool {
    fn tokens(&self) -> (&Token, &Token) {
        (self.token0(), self.token1())
    }

    fn fee_bps(&self) -> u32 {
        ConcentratedLiquidityPool::fee_bps(self)
    }

    fn spot_price(&self) -> Option<Price> {
        Some(ConcentratedLiquidityPool::spot_price(self))
    }

    fn swap_exact_in(&self, zero_for_one: bool, amount_in: U256) -> Result<SwapOutcome, QuoteError> {
        let limit = self.sqrt_price_limit(zero_for_one)?;
        let step = V3Math::swap_exact_in(self.sqrt_price_x96(), limit, self.liquidity(), amount_in, self.fee_bps())
            .map_err(|err| self.with_interval(err))?;
        trace!(
            %amount_in,
            amount_out = %step.amount_out,
            sqrt_price_next = %step.sqrt_price_next,
            "clmm exact-in step"
        );

        Ok(SwapOutcome {
            amount_in,
            amount_out: step.amount_out,
            fee: step.fee_amount,
            sqrt_price_after: Some(step.sqrt_price_next),
        })
    }

    fn swap_exact_out(&self, zero_for_one: bool, amount_out: U256) -> Result<SwapOutcome, QuoteError> {
        let limit = self.sqrt_price_limit(zero_for_one)?;
        let step = V3Math::swap_exact_out(self.sqrt_price_x96(), limit, self.liquidity(), amount_out, self.fee_bps())
            .map_err(|err| self.with_interval(err))?;
        trace!(
            %amount_out,
            amount_in = %step.amount_in,
            sqrt_price_next = %step.sqrt_price_next,
            "clmm exact-out step"
        );

        Ok(SwapOutcome {
            amount_in: step.gross_amount_in()?,
            amount_out,
            fee: step.fee_amount,
            sqrt_price_after: Some(step.sqrt_price_next),
        })
    }
}

impl ConcentratedLiquidityPool {
    /// Edge of the current interval in the direction of the trade
    fn sqrt_price_limit(&self, zero_for_one: bool) -> Result<U256, QuoteError> {
        let (lower, upper) = self.current_interval_sqrt_prices()?;
        Ok(if zero_for_one { lower } else { upper })
    }

    fn with_interval(&self, err: QuoteError) -> QuoteError {
        match err {
            QuoteError::PriceLimitExceeded { .. } => {
                let (tick_lower, tick_upper) = self.current_interval();
                QuoteError::PriceLimitExceeded {
                    tick_lower,
                    tick_upper,
                }
            }
            other => other,
        }
    }
}

impl AmmPool for PoolModel {
    fn tokens(&self) -> (&Token, &Token) {
        (self.token0(), self.token1())
    }

    fn fee_bps(&self) -> u32 {
        PoolModel::fee_bps(self)
    }

    fn spot_price(&self) -> Option<Price> {
        PoolModel::spot_price(self)
    }

    fn swap_exact_in(&self, zero_for_one: bool, amount_in: U256) -> Result<SwapOutcome, QuoteError> {
        match self {
            PoolModel::ConstantProduct(pool) => pool.swap_exact_in(zero_for_one, amount_in),
            PoolModel::ConcentratedLiquidity(pool) => pool.swap_exact_in(zero_for_one, amount_in),
        }
    }

    fn swap_exact_out(&self, zero_for_one: bool, amount_out: U256) -> Result<SwapOutcome, QuoteError> {
        match self {
            PoolModel::ConstantProduct(pool) => pool.swap_exact_out(zero_for_one, amount_out),
            PoolModel::ConcentratedLiquidity(pool) => pool.swap_exact_out(zero_for_one, amount_out),
        }
    }
}

/// Source of pool snapshots (RPC client, indexer, fixture files)
pub trait PoolStateReader {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read_pool(&self, address: &str) -> Result<PoolModel, Self::Error>;
}

/// Token metadata lookup by symbol or address
pub trait TokenResolver {
    fn resolve(&self, symbol_or_address: &str) -> Option<Token>;
}

impl TokenResolver for [Token] {
    fn resolve(&self, symbol_or_address: &str) -> Option<Token> {
        self.iter()
            .find(|token| {
                token.has_address(symbol_or_address) || token.symbol.eq_ignore_ascii_case(symbol_or_address)
            })
            .cloned()
    }
}

impl TokenResolver for PoolModel {
    fn resolve(&self, symbol_or_address: &str) -> Option<Token> {
        [self.token0().clone(), self.token1().clone()].resolve(symbol_or_address)
    }
}

/// `amount - floor(amount * (10000 - fee) / 10000)`
fn fee_portion(amount: U256, fee_bps: u32) -> Result<U256, QuoteError> {
    let net = mul_div(
        amount,
        U256::from(BPS_DENOMINATOR - fee_bps),
        U256::from(BPS_DENOMINATOR),
    )?;
    Ok(checked_sub(amount, net)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick_math::tick_to_sqrt_price;
    use std::collections::HashMap;

    fn weth() -> Token {
        Token::new("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18)
    }

    fn usdc() -> Token {
        Token::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6)
    }

    fn clmm() -> PoolModel {
        ConcentratedLiquidityPool::from_sqrt_price(
            weth(),
            usdc(),
            5,
            10,
            2_000_000_000_000_000_000,
            tick_to_sqrt_price(-197547).unwrap(),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_constant_product_swap() {
        let pool: PoolModel = ConstantProductPool::new(
            weth(),
            usdc(),
            U256::exp10(21),
            U256::from(2_000_000_000_000u64),
            U256::exp10(15),
        )
        .unwrap()
        .into();

        let outcome = pool.swap_exact_in(true, U256::exp10(19)).unwrap();
        assert_eq!(outcome.amount_out, U256::from(19_743_160_687u64));
        assert_eq!(outcome.fee, U256::from(30_000_000_000_000_000u64));
        assert_eq!(outcome.sqrt_price_after, None);

        // Reverse direction pays WETH out for USDC in
        let outcome = pool.swap_exact_out(false, U256::exp10(18)).unwrap();
        assert!(outcome.amount_in > U256::from(2_000_000_000u64));
    }

    #[test]
    fn test_clmm_step_through_model() {
        let pool = clmm();
        let outcome = pool.swap_exact_in(true, U256::exp10(16)).unwrap();
        assert_eq!(outcome.amount_out, U256::from(26_354_478u64));
        assert_eq!(outcome.fee, U256::from(5_000_000_000_000u64));
    }

    #[test]
    fn test_clmm_limit_reports_interval() {
        let err = clmm().swap_exact_in(true, U256::exp10(21)).unwrap_err();
        assert_eq!(
            err,
            QuoteError::PriceLimitExceeded {
                tick_lower: -197550,
                tick_upper: -197540
            }
        );
    }

    #[test]
    fn test_token_resolver() {
        let pool = clmm();
        assert_eq!(pool.resolve("weth"), Some(weth()));
        assert_eq!(pool.resolve("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"), Some(usdc()));
        assert_eq!(pool.resolve("DAI"), None);
    }

    struct FixtureReader(HashMap<String, PoolModel>);

    #[derive(Debug, thiserror::Error)]
    #[error("no pool at {0}")]
    struct MissingPool(String);

    impl PoolStateReader for FixtureReader {
        type Error = MissingPool;

        fn read_pool(&self, address: &str) -> Result<PoolModel, Self::Error> {
            self.0.get(address).cloned().ok_or_else(|| MissingPool(address.to_string()))
        }
    }

    #[test]
    fn test_pool_state_reader_seam() {
        let reader = FixtureReader(HashMap::from([("0xpool".to_string(), clmm())]));
        assert_eq!(reader.read_pool("0xpool").unwrap(), clmm());
        assert!(reader.read_pool("0xother").is_err());
    }
}
