//! Tick <-> sqrt price conversion without floating point
//!
//! `tick_to_sqrt_price` walks the usual ladder of precomputed
//! `1 / sqrt(1.0001)^(2^i)` constants in Q128.128. `sqrt_price_to_tick`
//! inverts it exactly: the bit length of the input bounds the answer to a
//! window of roughly 14k ticks, and a binary search over the ladder finds the
//! greatest tick whose sqrt price does not exceed the input. Both directions
//! agree at every tick boundary by construction.

use ethers_core::types::{U256, U512};
use rust_decimal::Decimal;
use tracing::trace;

use crate::error::{FixedPointError, TickMathError};
use crate::fixed_point::{decimal_parts, pow10, ratio_to_decimal, sqrt_u512, RESOLUTION};

/// Lowest tick whose price is representable, log_1.0001(2^-128)
pub const MIN_TICK: i32 = -887272;
/// Highest tick whose price is representable, log_1.0001(2^128)
pub const MAX_TICK: i32 = -MIN_TICK;

/// `tick_to_sqrt_price(MIN_TICK)`
pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]);
/// `tick_to_sqrt_price(MAX_TICK)`, 1461446703485210103287273052203988822378723970342
pub const MAX_SQRT_RATIO: U256 = U256([0x5d951d5263988d26, 0xefd1fc6a50648849, 0xfffd8963, 0]);

/// sqrt(1.0001)^-(2^i) in Q128.128, i = 0..=19
const SQRT_RATIO_LADDER: [u128; 20] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x09aa508b5b7a84e1c677de54f3e99bc9,
    0x005d6af8dedb81196699c329225ee604,
    0x00002216e584f5fa1ea926041bedfe98,
    0x00000000048a170391f7dc42444e8fa2,
];

/// Ticks per doubling of the sqrt price lie in (13863, 13864): 1 / log2(sqrt(1.0001))
const TICKS_PER_BIT_LOW: i64 = 13863;
const TICKS_PER_BIT_HIGH: i64 = 13864;

/// sqrt(1.0001^tick) * 2^96, rounded up
pub fn tick_to_sqrt_price(tick: i32) -> Result<U256, TickMathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(TickMathError::TickOutOfBounds { tick });
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = if abs_tick & 1 != 0 {
        U256::from(SQRT_RATIO_LADDER[0])
    } else {
        U256::one() << 128
    };

    for (bit, constant) in SQRT_RATIO_LADDER.iter().enumerate().skip(1) {
        if abs_tick & (1 << bit) != 0 {
            // Both factors are below 2^128 so the product fits 256 bits
            ratio = (ratio * U256::from(*constant)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the result is never below the true value
    let remainder = ratio & U256::from(u32::MAX);
    let sqrt_price = (ratio >> 32) + if remainder.is_zero() { U256::zero() } else { U256::one() };
    Ok(sqrt_price)
}

/// Greatest tick `t` with `tick_to_sqrt_price(t) <= sqrt_price_x96`
pub fn sqrt_price_to_tick(sqrt_price_x96: U256) -> Result<i32, TickMathError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 > MAX_SQRT_RATIO {
        return Err(TickMathError::SqrtPriceOutOfBounds { sqrt_price_x96 });
    }

    // 2^msb <= x < 2^(msb+1), so log2(x / 2^96) lies in [msb - 96, msb - 95)
    let msb = sqrt_price_x96.bits() as i64 - 1;
    let log2_floor = msb - RESOLUTION as i64;
    let mut low = window_bound(log2_floor, i64::min) - 1;
    let mut high = window_bound(log2_floor + 1, i64::max) + 1;
    low = low.max(MIN_TICK as i64);
    high = high.min(MAX_TICK as i64);
    trace!(%sqrt_price_x96, low, high, "searching tick window");

    // Invariant: tick_to_sqrt_price(low) <= x and the answer lies in [low, high]
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if tick_to_sqrt_price(mid as i32)? <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    Ok(low as i32)
}

fn window_bound(log2: i64, pick: fn(i64, i64) -> i64) -> i64 {
    pick(log2 * TICKS_PER_BIT_LOW, log2 * TICKS_PER_BIT_HIGH)
}

/// Round `tick` to the nearest multiple of `spacing`
///
/// Exact halfway ticks round toward zero. The result is pulled back inside
/// `[MIN_TICK, MAX_TICK]` onto the nearest in-range multiple.
pub fn nearest_usable_tick(tick: i32, spacing: i32) -> Result<i32, TickMathError> {
    if spacing <= 0 {
        return Err(TickMathError::InvalidTickSpacing { spacing });
    }

    let tick = i64::from(tick);
    let spacing = i64::from(spacing);
    let quotient = tick.div_euclid(spacing);
    let remainder = tick.rem_euclid(spacing);

    let down = quotient * spacing;
    let up = down + spacing;
    let rounded = match (2 * remainder).cmp(&spacing) {
        std::cmp::Ordering::Less => down,
        std::cmp::Ordering::Greater => up,
        // tie: toward zero
        std::cmp::Ordering::Equal => {
            if tick < 0 {
                up
            } else {
                down
            }
        }
    };

    let min_usable = (i64::from(MIN_TICK) / spacing) * spacing;
    let max_usable = (i64::from(MAX_TICK) / spacing) * spacing;
    Ok(rounded.clamp(min_usable, max_usable) as i32)
}

/// Tick of a human price (quote per token0, display units)
///
/// The raw price is `human_price * 10^(decimals1 - decimals0)`; its Q64.96
/// square root is taken on exact integers before looking up the tick.
pub fn price_to_tick_with_decimals(
    human_price: Decimal,
    decimals0: u8,
    decimals1: u8,
) -> Result<i32, TickMathError> {
    let sqrt_price = price_to_sqrt_price_with_decimals(human_price, decimals0, decimals1)?;
    sqrt_price_to_tick(sqrt_price)
}

/// Q64.96 sqrt price of a human price (quote per token0, display units), rounded down
pub fn price_to_sqrt_price_with_decimals(
    human_price: Decimal,
    decimals0: u8,
    decimals1: u8,
) -> Result<U256, TickMathError> {
    if human_price <= Decimal::ZERO {
        return Err(TickMathError::InvalidPrice {
            price: human_price,
            reason: "price must be positive",
        });
    }

    let (mantissa, scale) = decimal_parts(human_price)?;
    let shift = i32::from(decimals1) - i32::from(decimals0);

    // raw = mantissa * 10^shift / 10^scale; take sqrt(raw * 2^192)
    let mut numerator = mantissa;
    let mut denominator = pow10(scale)?;
    if shift >= 0 {
        numerator = numerator
            .checked_mul(pow10(shift as u32)?)
            .ok_or(FixedPointError::Overflow)?;
    } else {
        denominator = denominator
            .checked_mul(pow10(shift.unsigned_abs())?)
            .ok_or(FixedPointError::Overflow)?;
    }
    let scaled = numerator
        .checked_mul(U512::one() << (2 * RESOLUTION))
        .ok_or(FixedPointError::Overflow)?;

    let sqrt_price = sqrt_u512(scaled / denominator)?;
    if sqrt_price < MIN_SQRT_RATIO || sqrt_price > MAX_SQRT_RATIO {
        return Err(TickMathError::InvalidPrice {
            price: human_price,
            reason: "price outside the representable tick range",
        });
    }
    Ok(sqrt_price)
}

/// Human price (token1 per token0, display units) of a Q64.96 sqrt price
pub fn sqrt_price_to_price_with_decimals(
    sqrt_price_x96: U256,
    decimals0: u8,
    decimals1: u8,
) -> Result<Decimal, TickMathError> {
    let squared = sqrt_price_x96.full_mul(sqrt_price_x96);
    let shift = i32::from(decimals0) - i32::from(decimals1);

    let mut numerator = squared;
    let mut denominator = U512::one() << (2 * RESOLUTION);
    if shift >= 0 {
        numerator = numerator
            .checked_mul(pow10(shift as u32)?)
            .ok_or(FixedPointError::Overflow)?;
    } else {
        denominator = denominator
            .checked_mul(pow10(shift.unsigned_abs())?)
            .ok_or(FixedPointError::Overflow)?;
    }

    Ok(ratio_to_decimal(numerator, denominator)?)
}

/// Human price (token1 per token0, display units) at a tick
pub fn tick_to_price_with_decimals(tick: i32, decimals0: u8, decimals1: u8) -> Result<Decimal, TickMathError> {
    sqrt_price_to_price_with_decimals(tick_to_sqrt_price(tick)?, decimals0, decimals1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn u256(s: &str) -> U256 {
        U256::from_dec_str(s).unwrap()
    }

    #[test]
    fn test_known_sqrt_prices() {
        assert_eq!(tick_to_sqrt_price(0).unwrap(), crate::fixed_point::Q96);
        assert_eq!(tick_to_sqrt_price(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(tick_to_sqrt_price(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
        assert_eq!(MAX_SQRT_RATIO, u256("1461446703485210103287273052203988822378723970342"));
        assert_eq!(tick_to_sqrt_price(1).unwrap(), u256("79232123823359799118286999568"));
        assert_eq!(tick_to_sqrt_price(-1).unwrap(), u256("79224201403219477170569942574"));
        assert_eq!(tick_to_sqrt_price(-197547).unwrap(), u256("4068323249163151333176512"));
    }

    #[test]
    fn test_tick_out_of_bounds() {
        assert_eq!(
            tick_to_sqrt_price(MAX_TICK + 1),
            Err(TickMathError::TickOutOfBounds { tick: MAX_TICK + 1 })
        );
        assert!(tick_to_sqrt_price(MIN_TICK - 1).is_err());
        assert!(sqrt_price_to_tick(MIN_SQRT_RATIO - 1).is_err());
        assert!(sqrt_price_to_tick(MAX_SQRT_RATIO + 1).is_err());
    }

    #[test]
    fn test_sqrt_price_to_tick_boundaries() {
        for tick in [MIN_TICK, -197547, -60, -1, 0, 1, 60, 197547, MAX_TICK] {
            let sqrt_price = tick_to_sqrt_price(tick).unwrap();
            assert_eq!(sqrt_price_to_tick(sqrt_price).unwrap(), tick);
            if tick > MIN_TICK {
                assert_eq!(sqrt_price_to_tick(sqrt_price - 1).unwrap(), tick - 1);
            }
        }
    }

    #[test]
    fn test_nearest_usable_tick() {
        assert_eq!(nearest_usable_tick(-197547, 60).unwrap(), -197520);
        assert_eq!(nearest_usable_tick(-197551, 60).unwrap(), -197580);
        assert_eq!(nearest_usable_tick(89, 60).unwrap(), 60);
        assert_eq!(nearest_usable_tick(91, 60).unwrap(), 120);
        assert_eq!(nearest_usable_tick(0, 10).unwrap(), 0);
        assert_eq!(nearest_usable_tick(MAX_TICK, 60).unwrap(), 887220);
        assert_eq!(nearest_usable_tick(MIN_TICK, 60).unwrap(), -887220);
    }

    #[test]
    fn test_nearest_usable_tick_ties_round_toward_zero() {
        assert_eq!(nearest_usable_tick(30, 60).unwrap(), 0);
        assert_eq!(nearest_usable_tick(-30, 60).unwrap(), 0);
        assert_eq!(nearest_usable_tick(-197550, 60).unwrap(), -197520);
        assert_eq!(nearest_usable_tick(5, 10).unwrap(), 0);
        assert_eq!(nearest_usable_tick(15, 10).unwrap(), 10);
    }

    #[test]
    fn test_nearest_usable_tick_rejects_bad_spacing() {
        assert_eq!(
            nearest_usable_tick(100, 0),
            Err(TickMathError::InvalidTickSpacing { spacing: 0 })
        );
        assert!(nearest_usable_tick(100, -10).is_err());
    }

    #[test]
    fn test_price_to_tick_with_decimals() {
        // WETH (18) / USDC (6)
        assert_eq!(price_to_tick_with_decimals(dec!(2637), 18, 6).unwrap(), -197547);
        assert_eq!(price_to_tick_with_decimals(dec!(1500), 18, 6).unwrap(), -203189);
        assert_eq!(price_to_tick_with_decimals(dec!(4000), 18, 6).unwrap(), -193380);
        assert_eq!(price_to_tick_with_decimals(dec!(1), 6, 6).unwrap(), 0);
    }

    #[test]
    fn test_price_to_tick_rejects_non_positive() {
        assert!(matches!(
            price_to_tick_with_decimals(dec!(0), 18, 6),
            Err(TickMathError::InvalidPrice { .. })
        ));
        assert!(matches!(
            price_to_tick_with_decimals(dec!(-5), 18, 6),
            Err(TickMathError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_tick_to_price_with_decimals() {
        let price = tick_to_price_with_decimals(-197547, 18, 6).unwrap();
        assert!(price > dec!(2636.5) && price < dec!(2637.5), "price was {price}");
        assert_eq!(tick_to_price_with_decimals(0, 6, 6).unwrap(), dec!(1));
    }
}
