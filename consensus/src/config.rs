//! Configuration for the consensus node

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Consensus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger channel to order for
    pub chain_id: String,

    /// Cut a block on every tick, even when nothing was delivered
    pub cut_empty_blocks: bool,

    /// Batch-cut interval override (ms); the ledger's interval when unset
    pub batch_timeout_ms: Option<u64>,

    /// Ledger configuration
    pub ledger: LedgerConfig,

    /// Engine connection
    pub engine: EngineConfig,
}

/// Where the engine handlers run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ABCI server to drive instead of the in-process handlers
    /// (`host:port`, optionally `tcp://`-prefixed)
    pub remote_addr: Option<String>,

    /// Serve this node's handlers to an external engine on this address
    pub listen_addr: Option<String>,
}

/// Ledger configuration used by the node binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Data directory
    pub data_dir: PathBuf,

    /// Batch-cut interval stored with the ledger (ms)
    pub batch_timeout_ms: u64,

    /// Hex-encoded 32-byte Ed25519 seed for block signing
    pub signing_seed_hex: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: "testchainid".to_string(),
            cut_empty_blocks: true,
            batch_timeout_ms: None,
            ledger: LedgerConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            batch_timeout_ms: 2000,
            signing_seed_hex: None,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply `CONSENSUS_*`, `ABCI_*` and `LEDGER_DATA_DIR` overrides
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(chain_id) = std::env::var("CONSENSUS_CHAIN_ID") {
            self.chain_id = chain_id;
        }

        if let Ok(value) = std::env::var("CONSENSUS_CUT_EMPTY_BLOCKS") {
            self.cut_empty_blocks = value.parse().map_err(|_| {
                crate::Error::Config(format!("CONSENSUS_CUT_EMPTY_BLOCKS: invalid bool {:?}", value))
            })?;
        }

        if let Ok(value) = std::env::var("CONSENSUS_BATCH_TIMEOUT_MS") {
            let ms = value.parse().map_err(|_| {
                crate::Error::Config(format!("CONSENSUS_BATCH_TIMEOUT_MS: invalid number {:?}", value))
            })?;
            self.batch_timeout_ms = Some(ms);
        }

        if let Ok(addr) = std::env::var("ABCI_REMOTE_ADDR") {
            self.engine.remote_addr = Some(addr);
        }

        if let Ok(addr) = std::env::var("ABCI_LISTEN_ADDR") {
            self.engine.listen_addr = Some(addr);
        }

        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            self.ledger.data_dir = PathBuf::from(data_dir);
        }

        Ok(self)
    }

    /// Batch-cut interval override
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }

    /// Ledger configuration in `ledger_core` form
    pub fn ledger_core_config(&self) -> ledger_core::Config {
        ledger_core::Config {
            data_dir: self.ledger.data_dir.clone(),
            batch_timeout_ms: self.ledger.batch_timeout_ms,
            ..ledger_core::Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chain_id, "testchainid");
        assert!(config.cut_empty_blocks);
        assert!(config.batch_timeout().is_none());
        assert!(config.engine.remote_addr.is_none());
        assert!(config.engine.listen_addr.is_none());
    }

    #[test]
    fn test_engine_section() {
        let config: Config = toml::from_str(
            "[engine]\nremote_addr = \"tcp://127.0.0.1:26658\"\n",
        )
        .unwrap();
        assert_eq!(
            config.engine.remote_addr.as_deref(),
            Some("tcp://127.0.0.1:26658")
        );
        assert!(config.engine.listen_addr.is_none());
        assert_eq!(config.chain_id, "testchainid");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("consensus.toml");
        std::fs::write(
            &path,
            "chain_id = \"mychannel\"\nbatch_timeout_ms = 500\n\n[ledger]\ndata_dir = \"/var/ledger\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.chain_id, "mychannel");
        assert!(config.cut_empty_blocks);
        assert_eq!(config.batch_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.ledger.data_dir, PathBuf::from("/var/ledger"));
        assert_eq!(config.ledger.batch_timeout_ms, 2000);

        let ledger = config.ledger_core_config();
        assert_eq!(ledger.data_dir, PathBuf::from("/var/ledger"));
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("consensus.toml");
        std::fs::write(&path, "cut_empty_blocks = \"maybe\"").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(crate::Error::Config(_))
        ));
    }
}
