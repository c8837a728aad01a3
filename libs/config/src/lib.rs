//! # Gateway Configuration
//!
//! Loads the settings the quoter needs: log level, default slippage
//! tolerances per pool family, and the snapshot file for each named pool.
//!
//! ## Sources, lowest precedence first
//!
//! - **Base file**: `config/gateway.toml` unless another path is given
//! - **Environment file**: `environments/<env>.toml` next to the base file
//! - **Environment variables**: `GATEWAY_<SECTION>__<KEY>`, e.g.
//!   `GATEWAY_AMM__SLIPPAGE_PCT=0.5`
//!
//! Every field has a default, so a missing base file yields a usable config.
//!
//! ## Usage
//!
//! ```no_run
//! use gateway_config::GatewayConfig;
//!
//! let config = GatewayConfig::load(None, Some("mainnet")).unwrap();
//! println!("default AMM slippage: {}%", config.amm.slippage_pct);
//! ```

pub mod defaults;
pub mod gateway_config;

pub use gateway_config::{GatewayConfig, LoggingConfig, SlippageConfig};
