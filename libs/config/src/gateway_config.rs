//! Gateway Configuration Module
//!
//! Layered loading of the quoter settings from TOML files and
//! `GATEWAY_`-prefixed environment variables.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main gateway configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Logging settings
    pub logging: LoggingConfig,

    /// Slippage defaults for constant-product pools
    pub amm: SlippageConfig,

    /// Slippage defaults for concentrated-liquidity pools
    pub clmm: SlippageConfig,

    /// Named pool snapshot files, e.g. `weth_usdc = "pools/weth_usdc.json"`
    pub pools: HashMap<String, PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber` filter directive, overridden by `RUST_LOG`
    pub level: String,
}

/// Default slippage tolerance for one pool family
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SlippageConfig {
    /// Percent in `[0, 100)`
    pub slippage_pct: Decimal,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
        }
    }
}

impl SlippageConfig {
    fn amm() -> Self {
        Self {
            slippage_pct: defaults::AMM_SLIPPAGE_PCT,
        }
    }

    fn clmm() -> Self {
        Self {
            slippage_pct: defaults::CLMM_SLIPPAGE_PCT,
        }
    }
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self::amm()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            amm: SlippageConfig::amm(),
            clmm: SlippageConfig::clmm(),
            pools: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from files with environment overrides
    ///
    /// An explicit `base_path` must exist. The default path is optional so a
    /// bare checkout still runs on built-in defaults.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let (base, required) = match base_path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(defaults::CONFIG_PATH), false),
        };

        let mut builder = Config::builder().add_source(File::from(base.as_path()).required(required));

        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(defaults::ENVIRONMENTS_DIR)
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // GATEWAY_AMM__SLIPPAGE_PCT=0.5 -> amm.slippage_pct
        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator("_")
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: GatewayConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(pools = config.pools.len(), "Configuration loaded from {:?}", base);
        Ok(config)
    }

    /// Reject slippage tolerances outside `[0, 100)`
    pub fn validate(&self) -> Result<()> {
        for (section, slippage) in [("amm", &self.amm), ("clmm", &self.clmm)] {
            let pct = slippage.slippage_pct;
            if pct.is_sign_negative() || pct >= Decimal::ONE_HUNDRED {
                bail!("{}.slippage_pct must be in [0, 100), got {}", section, pct);
            }
        }
        Ok(())
    }

    /// Snapshot path for a named pool
    pub fn pool_path(&self, name: &str) -> Option<&Path> {
        self.pools.get(name).map(PathBuf::as_path)
    }

    /// Expand `~` and environment variables in pool snapshot paths
    pub fn expand_paths(&mut self) -> Result<()> {
        for (name, path) in &mut self.pools {
            let text = path.to_string_lossy().into_owned();
            let expanded = shellexpand::full(&text)
                .with_context(|| format!("Failed to expand snapshot path for pool {}", name))?;
            *path = PathBuf::from(expanded.as_ref());
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
