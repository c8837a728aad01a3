//! Q64.96 fixed-point helpers on 256/512-bit integers
//!
//! Every multiply-then-divide in the crate goes through [`mul_div`] or
//! [`mul_div_rounding_up`]: the product is taken in 512 bits so intermediate
//! values never wrap, and the final narrowing back to 256 bits is checked.

use ethers_core::types::{U256, U512};
use rust_decimal::Decimal;

use crate::error::FixedPointError;

/// 2^96 as a raw `U256` (limb 1, bit 32)
pub const Q96: U256 = U256([0, 1 << 32, 0, 0]);

/// Number of fractional bits in a sqrt price
pub const RESOLUTION: usize = 96;

/// Largest mantissa a `rust_decimal::Decimal` can hold (2^96 - 1)
const DECIMAL_MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Highest scale a `Decimal` supports
const DECIMAL_MAX_SCALE: u32 = 28;

/// `floor(a * b / denominator)` with a 512-bit intermediate
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = a.full_mul(b);
    narrow(product / U512::from(denominator))
}

/// `ceil(a * b / denominator)` with a 512-bit intermediate
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let denominator = U512::from(denominator);
    let quotient = product / denominator;
    if (product % denominator).is_zero() {
        narrow(quotient)
    } else {
        narrow(quotient + U512::one())
    }
}

/// `ceil(a / b)`
pub fn div_rounding_up(a: U256, b: U256) -> Result<U256, FixedPointError> {
    if b.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let quotient = a / b;
    if (a % b).is_zero() {
        Ok(quotient)
    } else {
        quotient.checked_add(U256::one()).ok_or(FixedPointError::Overflow)
    }
}

pub fn checked_add(a: U256, b: U256) -> Result<U256, FixedPointError> {
    a.checked_add(b).ok_or(FixedPointError::Overflow)
}

pub fn checked_sub(a: U256, b: U256) -> Result<U256, FixedPointError> {
    a.checked_sub(b).ok_or(FixedPointError::Underflow)
}

pub fn checked_mul(a: U256, b: U256) -> Result<U256, FixedPointError> {
    a.checked_mul(b).ok_or(FixedPointError::Overflow)
}

/// Narrow a 512-bit intermediate back into 256 bits
pub fn narrow(value: U512) -> Result<U256, FixedPointError> {
    U256::try_from(value).map_err(|_| FixedPointError::Overflow)
}

/// 10^exponent in 512 bits, checked
pub fn pow10(exponent: u32) -> Result<U512, FixedPointError> {
    let ten = U512::from(10u8);
    let mut result = U512::one();
    for _ in 0..exponent {
        result = result.checked_mul(ten).ok_or(FixedPointError::Overflow)?;
    }
    Ok(result)
}

/// Floor square root of a 512-bit value, narrowed to 256 bits
pub fn sqrt_u512(value: U512) -> Result<U256, FixedPointError> {
    narrow(value.integer_sqrt())
}

/// Split a non-negative `Decimal` into its integer mantissa and power-of-ten scale
pub fn decimal_parts(value: Decimal) -> Result<(U512, u32), FixedPointError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FixedPointError::Negative);
    }
    let mantissa = u128::try_from(value.mantissa()).map_err(|_| FixedPointError::Negative)?;
    Ok((U512::from(mantissa), value.scale()))
}

/// Convert the ratio `numerator / denominator` into a `Decimal`
///
/// Picks the highest scale (at most 28) whose mantissa still fits the
/// 96 bits a `Decimal` can carry, then normalizes trailing zeros away.
/// Only used at the display boundary.
pub fn ratio_to_decimal(numerator: U512, denominator: U512) -> Result<Decimal, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let max_mantissa = U512::from(DECIMAL_MAX_MANTISSA);
    if numerator / denominator > max_mantissa {
        return Err(FixedPointError::Overflow);
    }

    for scale in (0..=DECIMAL_MAX_SCALE).rev() {
        let scaled = match numerator.checked_mul(pow10(scale)?) {
            Some(scaled) => scaled,
            None => continue,
        };
        let mantissa = scaled / denominator;
        if mantissa <= max_mantissa {
            let mantissa = i128::try_from(mantissa.low_u128()).map_err(|_| FixedPointError::Overflow)?;
            return Decimal::try_from_i128_with_scale(mantissa, scale)
                .map(|d| d.normalize())
                .map_err(|_| FixedPointError::Overflow);
        }
    }

    Err(FixedPointError::Overflow)
}

/// Serde helpers writing `U256` as a decimal string
///
/// Reads decimal strings, `0x` hex strings or plain JSON integers.
pub mod u256_dec {
    use ethers_core::types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(U256::from(n)),
            Repr::Text(text) => match text.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16).map_err(de::Error::custom),
                None => U256::from_dec_str(&text).map_err(de::Error::custom),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_q96_constant() {
        assert_eq!(Q96, U256::one() << RESOLUTION);
        assert_eq!(Q96.to_string(), "79228162514264337593543950336");
    }

    #[test]
    fn test_mul_div_handles_256_bit_products() {
        // (2^200 * 2^100) / 2^150 overflows a 256-bit product but not the result
        let a = U256::one() << 200;
        let b = U256::one() << 100;
        let d = U256::one() << 150;
        assert_eq!(mul_div(a, b, d).unwrap(), U256::one() << 150);
    }

    #[test]
    fn test_mul_div_rounding() {
        let seven = U256::from(7u8);
        let two = U256::from(2u8);
        assert_eq!(mul_div(seven, U256::one(), two).unwrap(), U256::from(3u8));
        assert_eq!(mul_div_rounding_up(seven, U256::one(), two).unwrap(), U256::from(4u8));
        assert_eq!(mul_div_rounding_up(U256::from(8u8), U256::one(), two).unwrap(), U256::from(4u8));
        assert_eq!(div_rounding_up(seven, two).unwrap(), U256::from(4u8));
    }

    #[test]
    fn test_mul_div_overflow_is_reported() {
        let result = mul_div(U256::MAX, U256::MAX, U256::one());
        assert_eq!(result, Err(FixedPointError::Overflow));
        assert_eq!(mul_div(U256::one(), U256::one(), U256::zero()), Err(FixedPointError::DivisionByZero));
    }

    #[test]
    fn test_ratio_to_decimal() {
        let value = ratio_to_decimal(U512::from(1u8), U512::from(3u8)).unwrap();
        assert_eq!(value, dec!(0.3333333333333333333333333333));

        let value = ratio_to_decimal(U512::from(2637u32), U512::one()).unwrap();
        assert_eq!(value, dec!(2637));

        let huge = U512::from(U256::MAX);
        assert!(ratio_to_decimal(huge, U512::one()).is_err());
    }

    #[test]
    fn test_u256_dec_serde() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "u256_dec")]
            value: U256,
        }

        let json = serde_json::to_string(&Wrapper { value: Q96 }).unwrap();
        assert_eq!(json, r#"{"value":"79228162514264337593543950336"}"#);
        let hex: Wrapper = serde_json::from_str(r#"{"value":"0x1000000000000000000000000"}"#).unwrap();
        assert_eq!(hex.value, Q96);
        let number: Wrapper = serde_json::from_str(r#"{"value":42}"#).unwrap();
        assert_eq!(number.value, U256::from(42u8));
    }

    #[test]
    fn test_decimal_parts() {
        let (mantissa, scale) = decimal_parts(dec!(2637.25)).unwrap();
        assert_eq!(mantissa, U512::from(263725u32));
        assert_eq!(scale, 2);
        assert_eq!(decimal_parts(dec!(-1)), Err(FixedPointError::Negative));
    }
}
