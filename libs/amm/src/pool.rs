//! Immutable pool snapshots
//!
//! A [`PoolModel`] is built fresh for every request from state the caller
//! fetched elsewhere. Constructors validate the snapshot once; after that
//! the fields are read-only, so every sizing or quoting call sees exactly the
//! state it was given.

use ethers_core::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FixedPointError, PoolError, TickMathError};
use crate::fixed_point::u256_dec;
use crate::price::Price;
use crate::tick_math::{sqrt_price_to_tick, tick_to_sqrt_price, MAX_TICK, MIN_TICK};
use crate::token::{Token, TokenAmount, TokenSide};
use crate::v2_math::{V2Math, BPS_DENOMINATOR};

/// Fee charged by every constant-product pool (0.3%)
pub const CONSTANT_PRODUCT_FEE_BPS: u32 = 30;

/// Pool type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    ConstantProduct,
    ConcentratedLiquidity,
}

/// Snapshot of one pool, closed over the two supported curve families
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolModel {
    ConstantProduct(ConstantProductPool),
    ConcentratedLiquidity(ConcentratedLiquidityPool),
}

impl PoolModel {
    pub fn pool_type(&self) -> PoolType {
        match self {
            PoolModel::ConstantProduct(_) => PoolType::ConstantProduct,
            PoolModel::ConcentratedLiquidity(_) => PoolType::ConcentratedLiquidity,
        }
    }

    pub fn token0(&self) -> &Token {
        match self {
            PoolModel::ConstantProduct(pool) => &pool.token0,
            PoolModel::ConcentratedLiquidity(pool) => &pool.token0,
        }
    }

    pub fn token1(&self) -> &Token {
        match self {
            PoolModel::ConstantProduct(pool) => &pool.token1,
            PoolModel::ConcentratedLiquidity(pool) => &pool.token1,
        }
    }

    pub fn token(&self, side: TokenSide) -> &Token {
        match side {
            TokenSide::Token0 => self.token0(),
            TokenSide::Token1 => self.token1(),
        }
    }

    pub fn fee_bps(&self) -> u32 {
        match self {
            PoolModel::ConstantProduct(pool) => pool.fee_bps(),
            PoolModel::ConcentratedLiquidity(pool) => pool.fee_bps,
        }
    }

    /// Which side of the pool `address` is
    pub fn side_of(&self, address: &str) -> Result<TokenSide, PoolError> {
        if self.token0().has_address(address) {
            Ok(TokenSide::Token0)
        } else if self.token1().has_address(address) {
            Ok(TokenSide::Token1)
        } else {
            Err(PoolError::UnknownToken {
                address: address.to_string(),
            })
        }
    }

    /// Marginal price in raw token1 per raw token0, `None` for an unfunded pool
    pub fn spot_price(&self) -> Option<Price> {
        match self {
            PoolModel::ConstantProduct(pool) => pool.spot_price(),
            PoolModel::ConcentratedLiquidity(pool) => Some(pool.spot_price()),
        }
    }

    /// Display summary of the snapshot
    pub fn info(&self) -> Result<PoolInfo, PoolError> {
        let token0 = self.token0().clone();
        let token1 = self.token1().clone();
        let price = self
            .spot_price()
            .map(|price| price.to_human(token0.decimals, token1.decimals))
            .transpose()?;
        let fee_pct = Decimal::from(self.fee_bps()) / Decimal::from(100u32);

        let mut info = PoolInfo {
            pool_type: self.pool_type(),
            price,
            fee_pct,
            reserve0: None,
            reserve1: None,
            liquidity: None,
            current_tick: None,
            tick_spacing: None,
            token0,
            token1,
        };

        match self {
            PoolModel::ConstantProduct(pool) => {
                info.reserve0 = Some(TokenAmount::new(pool.reserve0, pool.token0.decimals).to_decimal()?);
                info.reserve1 = Some(TokenAmount::new(pool.reserve1, pool.token1.decimals).to_decimal()?);
            }
            PoolModel::ConcentratedLiquidity(pool) => {
                info.liquidity = Some(pool.liquidity.to_string());
                info.current_tick = Some(pool.current_tick);
                info.tick_spacing = Some(pool.tick_spacing);
            }
        }

        Ok(info)
    }
}

impl From<ConstantProductPool> for PoolModel {
    fn from(pool: ConstantProductPool) -> Self {
        PoolModel::ConstantProduct(pool)
    }
}

impl From<ConcentratedLiquidityPool> for PoolModel {
    fn from(pool: ConcentratedLiquidityPool) -> Self {
        PoolModel::ConcentratedLiquidity(pool)
    }
}

/// Human-readable pool summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_type: PoolType,
    pub token0: Token,
    pub token1: Token,
    /// token1 per token0 in display units
    pub price: Option<Decimal>,
    pub fee_pct: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve0: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve1: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tick: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_spacing: Option<i32>,
}

/// x*y=k pool with a fixed 0.3% fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConstantProductSnapshot", into = "ConstantProductSnapshot")]
pub struct ConstantProductPool {
    token0: Token,
    token1: Token,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
}

impl ConstantProductPool {
    /// Reserves must be both empty (a pool awaiting its first deposit) or
    /// both funded with a non-zero LP supply.
    pub fn new(
        token0: Token,
        token1: Token,
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    ) -> Result<Self, PoolError> {
        check_distinct(&token0, &token1)?;

        let funded = !reserve0.is_zero() && !reserve1.is_zero() && !total_supply.is_zero();
        let empty = reserve0.is_zero() && reserve1.is_zero() && total_supply.is_zero();
        if !funded && !empty {
            return Err(PoolError::InconsistentReserves {
                reserve0,
                reserve1,
                total_supply,
            });
        }

        Ok(Self {
            token0,
            token1,
            reserve0,
            reserve1,
            total_supply,
        })
    }

    pub fn token0(&self) -> &Token {
        &self.token0
    }

    pub fn token1(&self) -> &Token {
        &self.token1
    }

    pub fn reserve0(&self) -> U256 {
        self.reserve0
    }

    pub fn reserve1(&self) -> U256 {
        self.reserve1
    }

    pub fn reserve(&self, side: TokenSide) -> U256 {
        match side {
            TokenSide::Token0 => self.reserve0,
            TokenSide::Token1 => self.reserve1,
        }
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn fee_bps(&self) -> u32 {
        CONSTANT_PRODUCT_FEE_BPS
    }

    /// No deposit has set a ratio yet
    pub fn is_empty(&self) -> bool {
        self.reserve0.is_zero()
    }

    pub fn spot_price(&self) -> Option<Price> {
        Price::from_amounts(self.reserve1, self.reserve0).ok()
    }

    /// Token amounts returned for burning `lp_amount` LP tokens
    pub fn withdraw_amounts(&self, lp_amount: U256) -> Result<(U256, U256), PoolError> {
        if lp_amount > self.total_supply {
            return Err(PoolError::InsufficientLiquidity {
                requested: lp_amount,
                available: self.total_supply,
            });
        }
        if lp_amount.is_zero() {
            return Ok((U256::zero(), U256::zero()));
        }
        Ok(V2Math::withdraw_amounts(
            lp_amount,
            self.reserve0,
            self.reserve1,
            self.total_supply,
        )?)
    }
}

/// Serialized form of [`ConstantProductPool`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantProductSnapshot {
    pub token0: Token,
    pub token1: Token,
    #[serde(with = "u256_dec")]
    pub reserve0: U256,
    #[serde(with = "u256_dec")]
    pub reserve1: U256,
    #[serde(with = "u256_dec")]
    pub total_supply: U256,
}

impl TryFrom<ConstantProductSnapshot> for ConstantProductPool {
    type Error = PoolError;

    fn try_from(snapshot: ConstantProductSnapshot) -> Result<Self, Self::Error> {
        Self::new(
            snapshot.token0,
            snapshot.token1,
            snapshot.reserve0,
            snapshot.reserve1,
            snapshot.total_supply,
        )
    }
}

impl From<ConstantProductPool> for ConstantProductSnapshot {
    fn from(pool: ConstantProductPool) -> Self {
        Self {
            token0: pool.token0,
            token1: pool.token1,
            reserve0: pool.reserve0,
            reserve1: pool.reserve1,
            total_supply: pool.total_supply,
        }
    }
}

/// Concentrated-liquidity pool at its current tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConcentratedLiquiditySnapshot", into = "ConcentratedLiquiditySnapshot")]
pub struct ConcentratedLiquidityPool {
    token0: Token,
    token1: Token,
    fee_bps: u32,
    tick_spacing: i32,
    liquidity: u128,
    sqrt_price_x96: U256,
    current_tick: i32,
}

impl ConcentratedLiquidityPool {
    /// `current_tick` must be the tick of `sqrt_price_x96`, or one below it
    /// when the price sits exactly on a tick boundary after a downward swap.
    pub fn new(
        token0: Token,
        token1: Token,
        fee_bps: u32,
        tick_spacing: i32,
        liquidity: u128,
        sqrt_price_x96: U256,
        current_tick: i32,
    ) -> Result<Self, PoolError> {
        check_distinct(&token0, &token1)?;
        if fee_bps >= BPS_DENOMINATOR {
            return Err(PoolError::InvalidFee { fee_bps });
        }
        if tick_spacing <= 0 {
            return Err(TickMathError::InvalidTickSpacing { spacing: tick_spacing }.into());
        }

        let expected = sqrt_price_to_tick(sqrt_price_x96)?;
        if current_tick != expected && current_tick != expected - 1 {
            return Err(PoolError::CurrentTickMismatch {
                current_tick,
                expected,
            });
        }

        Ok(Self {
            token0,
            token1,
            fee_bps,
            tick_spacing,
            liquidity,
            sqrt_price_x96,
            current_tick,
        })
    }

    /// Build a snapshot deriving the current tick from the sqrt price
    pub fn from_sqrt_price(
        token0: Token,
        token1: Token,
        fee_bps: u32,
        tick_spacing: i32,
        liquidity: u128,
        sqrt_price_x96: U256,
    ) -> Result<Self, PoolError> {
        let current_tick = sqrt_price_to_tick(sqrt_price_x96)?;
        Self::new(
            token0,
            token1,
            fee_bps,
            tick_spacing,
            liquidity,
            sqrt_price_x96,
            current_tick,
        )
    }

    pub fn token0(&self) -> &Token {
        &self.token0
    }

    pub fn token1(&self) -> &Token {
        &self.token1
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn sqrt_price_x96(&self) -> U256 {
        self.sqrt_price_x96
    }

    pub fn current_tick(&self) -> i32 {
        self.current_tick
    }

    pub fn spot_price(&self) -> Price {
        Price::from_sqrt_price_x96(self.sqrt_price_x96)
    }

    /// Spacing-aligned `[lower, upper)` interval holding the current tick
    pub fn current_interval(&self) -> (i32, i32) {
        let lower = self.current_tick.div_euclid(self.tick_spacing) * self.tick_spacing;
        let upper = lower.saturating_add(self.tick_spacing);
        (lower.max(MIN_TICK), upper.min(MAX_TICK))
    }

    /// Sqrt prices at the edges of [`current_interval`](Self::current_interval)
    pub fn current_interval_sqrt_prices(&self) -> Result<(U256, U256), TickMathError> {
        let (lower, upper) = self.current_interval();
        Ok((tick_to_sqrt_price(lower)?, tick_to_sqrt_price(upper)?))
    }
}

/// Serialized form of [`ConcentratedLiquidityPool`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentratedLiquiditySnapshot {
    pub token0: Token,
    pub token1: Token,
    pub fee_bps: u32,
    pub tick_spacing: i32,
    #[serde(with = "u256_dec")]
    pub liquidity: U256,
    #[serde(with = "u256_dec")]
    pub sqrt_price_x96: U256,
    /// Derived from `sqrt_price_x96` when absent
    #[serde(default)]
    pub current_tick: Option<i32>,
}

impl TryFrom<ConcentratedLiquiditySnapshot> for ConcentratedLiquidityPool {
    type Error = PoolError;

    fn try_from(snapshot: ConcentratedLiquiditySnapshot) -> Result<Self, Self::Error> {
        if snapshot.liquidity > U256::from(u128::MAX) {
            return Err(FixedPointError::Overflow.into());
        }
        let liquidity = snapshot.liquidity.as_u128();

        match snapshot.current_tick {
            Some(current_tick) => Self::new(
                snapshot.token0,
                snapshot.token1,
                snapshot.fee_bps,
                snapshot.tick_spacing,
                liquidity,
                snapshot.sqrt_price_x96,
                current_tick,
            ),
            None => Self::from_sqrt_price(
                snapshot.token0,
                snapshot.token1,
                snapshot.fee_bps,
                snapshot.tick_spacing,
                liquidity,
                snapshot.sqrt_price_x96,
            ),
        }
    }
}

impl From<ConcentratedLiquidityPool> for ConcentratedLiquiditySnapshot {
    fn from(pool: ConcentratedLiquidityPool) -> Self {
        Self {
            token0: pool.token0,
            token1: pool.token1,
            fee_bps: pool.fee_bps,
            tick_spacing: pool.tick_spacing,
            liquidity: U256::from(pool.liquidity),
            sqrt_price_x96: pool.sqrt_price_x96,
            current_tick: Some(pool.current_tick),
        }
    }
}

fn check_distinct(token0: &Token, token1: &Token) -> Result<(), PoolError> {
    if token0.has_address(&token1.address) {
        return Err(PoolError::IdenticalTokens {
            address: token0.address.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn weth() -> Token {
        Token::new("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18)
    }

    fn usdc() -> Token {
        Token::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6)
    }

    fn cp_pool() -> ConstantProductPool {
        ConstantProductPool::new(
            weth(),
            usdc(),
            U256::exp10(21),
            U256::from(2_000_000_000_000u64),
            U256::exp10(15),
        )
        .unwrap()
    }

    #[test]
    fn test_constant_product_validation() {
        let err = ConstantProductPool::new(weth(), usdc(), U256::one(), U256::zero(), U256::one()).unwrap_err();
        assert!(matches!(err, PoolError::InconsistentReserves { .. }));

        let err = ConstantProductPool::new(weth(), weth(), U256::one(), U256::one(), U256::one()).unwrap_err();
        assert!(matches!(err, PoolError::IdenticalTokens { .. }));

        let empty = ConstantProductPool::new(weth(), usdc(), U256::zero(), U256::zero(), U256::zero()).unwrap();
        assert!(empty.is_empty());
        assert!(empty.spot_price().is_none());
    }

    #[test]
    fn test_side_of_is_case_insensitive() {
        let pool = PoolModel::from(cp_pool());
        assert_eq!(pool.side_of("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap(), TokenSide::Token0);
        assert_eq!(pool.side_of(&usdc().address).unwrap(), TokenSide::Token1);
        assert!(matches!(pool.side_of("0xdead"), Err(PoolError::UnknownToken { .. })));
    }

    #[test]
    fn test_withdraw_amounts() {
        let pool = cp_pool();
        let (a0, a1) = pool.withdraw_amounts(U256::exp10(14)).unwrap();
        assert_eq!(a0, U256::exp10(20));
        assert_eq!(a1, U256::from(200_000_000_000u64));

        let err = pool.withdraw_amounts(U256::exp10(16)).unwrap_err();
        assert!(matches!(err, PoolError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn test_constant_product_info() {
        let info = PoolModel::from(cp_pool()).info().unwrap();
        assert_eq!(info.pool_type, PoolType::ConstantProduct);
        assert_eq!(info.price, Some(dec!(2000)));
        assert_eq!(info.fee_pct, dec!(0.3));
        assert_eq!(info.reserve0, Some(dec!(1000)));
        assert_eq!(info.reserve1, Some(dec!(2000000)));
    }

    #[test]
    fn test_current_tick_tolerance() {
        let sqrt_price = tick_to_sqrt_price(-197540).unwrap();
        assert!(ConcentratedLiquidityPool::new(weth(), usdc(), 5, 10, 1, sqrt_price, -197540).is_ok());
        assert!(ConcentratedLiquidityPool::new(weth(), usdc(), 5, 10, 1, sqrt_price, -197541).is_ok());
        let err = ConcentratedLiquidityPool::new(weth(), usdc(), 5, 10, 1, sqrt_price, -197500).unwrap_err();
        assert_eq!(
            err,
            PoolError::CurrentTickMismatch {
                current_tick: -197500,
                expected: -197540
            }
        );
    }

    #[test]
    fn test_clmm_validation() {
        let sqrt_price = tick_to_sqrt_price(0).unwrap();
        assert_eq!(
            ConcentratedLiquidityPool::new(weth(), usdc(), 10_000, 10, 1, sqrt_price, 0).unwrap_err(),
            PoolError::InvalidFee { fee_bps: 10_000 }
        );
        assert!(matches!(
            ConcentratedLiquidityPool::new(weth(), usdc(), 30, 0, 1, sqrt_price, 0).unwrap_err(),
            PoolError::TickMath(TickMathError::InvalidTickSpacing { spacing: 0 })
        ));
        assert!(matches!(
            ConcentratedLiquidityPool::from_sqrt_price(weth(), usdc(), 30, 60, 1, U256::one()).unwrap_err(),
            PoolError::TickMath(TickMathError::SqrtPriceOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_current_interval_floors_toward_negative() {
        let pool = ConcentratedLiquidityPool::from_sqrt_price(
            weth(),
            usdc(),
            5,
            10,
            1,
            tick_to_sqrt_price(-197547).unwrap(),
        )
        .unwrap();
        assert_eq!(pool.current_interval(), (-197550, -197540));

        let pool =
            ConcentratedLiquidityPool::from_sqrt_price(weth(), usdc(), 30, 60, 1, tick_to_sqrt_price(59).unwrap())
                .unwrap();
        assert_eq!(pool.current_interval(), (0, 60));
    }

    #[test]
    fn test_snapshot_json() {
        let json = r#"{
            "type": "concentrated_liquidity",
            "token0": {"address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "symbol": "WETH", "decimals": 18},
            "token1": {"address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "symbol": "USDC", "decimals": 6},
            "fee_bps": 5,
            "tick_spacing": 10,
            "liquidity": "2000000000000000000",
            "sqrt_price_x96": "4068323249163151333176512"
        }"#;
        let pool: PoolModel = serde_json::from_str(json).unwrap();
        assert_eq!(pool.pool_type(), PoolType::ConcentratedLiquidity);
        match &pool {
            PoolModel::ConcentratedLiquidity(clmm) => assert_eq!(clmm.current_tick(), -197547),
            PoolModel::ConstantProduct(_) => panic!("wrong variant"),
        }

        let round_trip: PoolModel = serde_json::from_str(&serde_json::to_string(&pool).unwrap()).unwrap();
        assert_eq!(round_trip, pool);

        let bad = json.replace("\"fee_bps\": 5", "\"fee_bps\": 20000");
        assert!(serde_json::from_str::<PoolModel>(&bad).is_err());
    }
}
