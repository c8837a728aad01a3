//! AMM Quoter
//!
//! Command-line front end for the pricing core. Reads pool snapshots from
//! JSON files (directly or by name through the `[pools]` config table),
//! prices ticks, swaps and liquidity deposits, and prints pretty JSON.
//!
//! Architecture:
//! snapshot file → SnapshotReader → PoolModel → gateway-amm → JSON on stdout
//!
//! Logs go to stderr so stdout stays machine-readable.

mod commands;
mod snapshot;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use gateway_amm::QuoterSettings;
use gateway_config::GatewayConfig;

use commands::Command;
use snapshot::SnapshotReader;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "amm_quoter")]
#[command(about = "Tick conversion, swap quotes and liquidity sizing for AMM pools")]
struct Cli {
    /// Configuration file path, config/gateway.toml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Environment override file (mainnet, testnet, ...)
    #[arg(short, long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn settings_from_config(config: &GatewayConfig) -> QuoterSettings {
    QuoterSettings {
        constant_product_slippage_pct: config.amm.slippage_pct,
        concentrated_liquidity_slippage_pct: config.clmm.slippage_pct,
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level {:?}", level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::load(cli.config.as_deref(), cli.environment.as_deref())
        .context("Failed to load configuration")?;
    config.expand_paths()?;

    init_tracing(&config.logging.level)?;
    info!("Environment: {}", cli.environment.as_deref().unwrap_or("default"));
    debug!("Effective configuration:\n{}", config.to_toml()?);

    let settings = settings_from_config(&config);
    let reader = SnapshotReader::new(config);

    let output = commands::run(cli.command, &reader, &settings)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_quote_command() {
        let cli = Cli::try_parse_from([
            "amm_quoter",
            "quote",
            "--pool",
            "weth_usdc_v3",
            "--side",
            "sell",
            "--amount",
            "0.01",
            "--environment",
            "testnet",
        ])
        .unwrap();

        assert_eq!(cli.environment.as_deref(), Some("testnet"));
        match cli.command {
            Command::Quote(args) => {
                assert_eq!(args.amount, dec!(0.01));
                assert_eq!(args.slippage, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_range_edges_come_in_pairs() {
        let result = Cli::try_parse_from(["amm_quoter", "size", "--pool", "p.json", "--lower", "1500"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_follow_config_sections() {
        let mut config = GatewayConfig::default();
        config.amm.slippage_pct = dec!(0.5);
        config.clmm.slippage_pct = dec!(2);

        let settings = settings_from_config(&config);
        assert_eq!(settings.constant_product_slippage_pct, dec!(0.5));
        assert_eq!(settings.concentrated_liquidity_slippage_pct, dec!(2));
    }
}
