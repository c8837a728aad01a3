//! Pool snapshots read from JSON files

use std::fs;
use std::path::{Path, PathBuf};

use gateway_amm::{PoolModel, PoolStateReader};
use gateway_config::GatewayConfig;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read pool snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pool snapshot {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolves a pool reference to a snapshot file and parses it
///
/// A reference is either a name from the `[pools]` config table or a path.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    config: GatewayConfig,
}

impl SnapshotReader {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn path_for(&self, reference: &str) -> PathBuf {
        self.config
            .pool_path(reference)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(reference))
    }
}

impl PoolStateReader for SnapshotReader {
    type Error = SnapshotError;

    fn read_pool(&self, reference: &str) -> Result<PoolModel, Self::Error> {
        let path = self.path_for(reference);
        let pool = parse_snapshot(&path)?;
        debug!(pool_type = ?pool.pool_type(), "Loaded pool snapshot {:?}", path);
        Ok(pool)
    }
}

fn parse_snapshot(path: &Path) -> Result<PoolModel, SnapshotError> {
    let text = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
