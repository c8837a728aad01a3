//! Token metadata and native-precision amounts
//!
//! Amounts always travel in the token's smallest unit. Conversion to and from
//! display units happens only at the edges (CLI input, JSON output).

use std::fmt;

use ethers_core::types::{U256, U512};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FixedPointError;
use crate::fixed_point::{decimal_parts, narrow, pow10, ratio_to_decimal};

/// Token metadata as supplied by the token resolver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Case-insensitive address match (EVM addresses may arrive checksummed or lowercase)
    pub fn has_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Which of the pool's two tokens an amount refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSide {
    Token0,
    Token1,
}

impl TokenSide {
    pub fn opposite(self) -> Self {
        match self {
            TokenSide::Token0 => TokenSide::Token1,
            TokenSide::Token1 => TokenSide::Token0,
        }
    }
}

/// Raw amount paired with the decimals needed to display it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    #[serde(with = "crate::fixed_point::u256_dec")]
    pub raw: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Parse a display amount, truncating digits finer than the token's precision
    pub fn from_human(amount: Decimal, decimals: u8) -> Result<Self, FixedPointError> {
        let (mantissa, scale) = decimal_parts(amount)?;
        let decimals_u32 = u32::from(decimals);
        let raw = if scale <= decimals_u32 {
            mantissa
                .checked_mul(pow10(decimals_u32 - scale)?)
                .ok_or(FixedPointError::Overflow)?
        } else {
            mantissa / pow10(scale - decimals_u32)?
        };
        Ok(Self {
            raw: narrow(raw)?,
            decimals,
        })
    }

    pub fn to_decimal(&self) -> Result<Decimal, FixedPointError> {
        ratio_to_decimal(U512::from(self.raw), pow10(u32::from(self.decimals))?)
    }
}
