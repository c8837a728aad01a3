//! End-to-end pricing and sizing scenarios on realistic WETH/USDC pools

use gateway_amm::{
    nearest_usable_tick, price_to_tick_with_decimals, quote_liquidity, quote_swap, size_position, tick_to_sqrt_price,
    ConcentratedLiquidityPool, ConstantProductPool, Exact, PoolModel, QuoteError, Side, SizingError, Token,
    TokenAmount, TokenSide, U256,
};
use rust_decimal_macros::dec;

const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

fn weth() -> Token {
    Token::new(WETH, "WETH", 18)
}

fn usdc() -> Token {
    Token::new(USDC, "USDC", 6)
}

fn weth_usdc_cp() -> PoolModel {
    ConstantProductPool::new(
        weth(),
        usdc(),
        TokenAmount::from_human(dec!(1000), 18).unwrap().raw,
        TokenAmount::from_human(dec!(2000000), 6).unwrap().raw,
        U256::exp10(15),
    )
    .unwrap()
    .into()
}

fn weth_usdc_clmm() -> PoolModel {
    ConcentratedLiquidityPool::new(
        weth(),
        usdc(),
        30,
        60,
        2_000_000_000_000_000_000,
        tick_to_sqrt_price(-197547).unwrap(),
        -197547,
    )
    .unwrap()
    .into()
}

#[test]
fn constant_product_sell_ten_base() {
    let pool = weth_usdc_cp();
    let amount = TokenAmount::from_human(dec!(10), 18).unwrap().raw;

    let quote = quote_swap(&pool, amount, Side::Sell, Exact::In, dec!(1)).unwrap();

    // 10 * 0.997 * 2_000_000 / (1000 + 10 * 0.997)
    assert_eq!(TokenAmount::new(quote.amount_out, 6).to_decimal().unwrap(), dec!(19743.160687));
    assert_eq!(TokenAmount::new(quote.min_amount_out, 6).to_decimal().unwrap(), dec!(19545.72908));
    assert!(quote.min_amount_out <= quote.amount_out);
}

#[test]
fn constant_product_invariant_after_quote() {
    let pool = weth_usdc_cp();
    let PoolModel::ConstantProduct(cp) = &pool else {
        panic!("expected constant-product pool");
    };

    let quote = quote_swap(&pool, U256::exp10(19), Side::Sell, Exact::In, dec!(0)).unwrap();
    let before = cp.reserve0().full_mul(cp.reserve1());
    let after = (cp.reserve0() + quote.amount_in).full_mul(cp.reserve1() - quote.amount_out);
    assert!(after >= before);
}

#[test]
fn concentrated_range_sizing_is_base_limited() {
    let pool = weth_usdc_clmm();
    let half_weth = TokenAmount::from_human(dec!(0.5), 18).unwrap().raw;

    let quote = quote_liquidity(
        &pool,
        WETH,
        Some((dec!(1500), dec!(4000))),
        Some(half_weth),
        None,
        dec!(1),
    )
    .unwrap();

    assert_eq!(quote.position.tick_lower, -203160);
    assert_eq!(quote.position.tick_upper, -193380);
    assert!(quote.base_limited);
    assert_eq!(quote.position.limiting, Some(TokenSide::Token0));
    assert!(!quote.position.amount0.is_zero());
    assert!(!quote.position.amount1.is_zero());

    assert_eq!(quote.base_amount, U256::from(499_999_999_999_999_958u64));
    assert_eq!(quote.quote_amount, U256::from(1_715_352_475u64));
    assert_eq!(quote.base_amount_max, U256::from(504_999_999_999_999_958u64));
    assert_eq!(quote.quote_amount_max, U256::from(1_732_506_000u64));
}

#[test]
fn range_above_price_rejects_quote_only_deposit() {
    let pool = weth_usdc_clmm();
    let err = quote_liquidity(
        &pool,
        WETH,
        Some((dec!(3000), dec!(4000))),
        None,
        Some(TokenAmount::from_human(dec!(1000), 6).unwrap().raw),
        dec!(1),
    )
    .unwrap_err();
    assert!(matches!(err, SizingError::InsufficientInput { .. }));
}

#[test]
fn nearest_usable_tick_scenarios() {
    assert_eq!(nearest_usable_tick(-197547, 60).unwrap(), -197520);
    assert_eq!(nearest_usable_tick(-197551, 60).unwrap(), -197580);
    // -197550 sits exactly between -197580 and -197520; ties go toward zero
    assert_eq!(nearest_usable_tick(-197550, 60).unwrap(), -197520);
    assert_eq!(nearest_usable_tick(30, 60).unwrap(), 0);
    assert_eq!(nearest_usable_tick(-30, 60).unwrap(), 0);
}

#[test]
fn current_price_tick_matches_human_price() {
    assert_eq!(price_to_tick_with_decimals(dec!(2637), 18, 6).unwrap(), -197547);
}

#[test]
fn clmm_sizing_tick_range_directly() {
    let pool = weth_usdc_clmm();
    let position = size_position(&pool, Some((-203160, -193380)), Some(U256::exp10(18)), Some(U256::from(1_000_000u64)))
        .unwrap();
    // One USDC buys far less liquidity than one WETH
    assert_eq!(position.limiting, Some(TokenSide::Token1));
    assert!(position.amount1 <= U256::from(1_000_000u64));
}

#[test]
fn clmm_large_trade_hits_price_limit() {
    let pool = weth_usdc_clmm();
    let err = quote_swap(&pool, U256::exp10(21), Side::Sell, Exact::In, dec!(1)).unwrap_err();
    assert_eq!(
        err,
        QuoteError::PriceLimitExceeded {
            tick_lower: -197580,
            tick_upper: -197520
        }
    );
}
