//! Default configuration values
//!
//! Used when neither the config files nor the environment set a value.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Base config file, relative to the working directory
pub const CONFIG_PATH: &str = "config/gateway.toml";

/// Directory (next to the base file) holding per-environment overrides
pub const ENVIRONMENTS_DIR: &str = "environments";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "GATEWAY";

/// Separator between nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Log filter directive when `RUST_LOG` is unset
pub const LOG_LEVEL: &str = "info";

/// Slippage tolerance in percent for constant-product pools
pub const AMM_SLIPPAGE_PCT: Decimal = dec!(1);

/// Slippage tolerance in percent for concentrated-liquidity pools
pub const CLMM_SLIPPAGE_PCT: Decimal = dec!(1);
