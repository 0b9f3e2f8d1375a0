//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nyx_wallet_core::WalletConfig;

use crate::{LogFormat, NodeError};

/// Configuration for the wallet service.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Wallet tuning lives under `[wallet]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Milliseconds between background sync cycles.
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub wallet: WalletConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./nyx_wallet")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_scan_interval_ms() -> u64 {
    1000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        if self.scan_interval_ms == 0 {
            return Err(NodeError::Config("scan_interval_ms must be positive".into()));
        }
        if self.wallet.max_blocks_per_scan == 0 {
            return Err(NodeError::Config(
                "wallet.max_blocks_per_scan must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            scan_interval_ms: default_scan_interval_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            wallet: WalletConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.map_size, config.map_size);
        assert_eq!(parsed.scan_interval_ms, config.scan_interval_ms);
        assert_eq!(parsed.wallet, config.wallet);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.scan_interval_ms, 1000);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.wallet.confirmations, 2);
        assert_eq!(config.wallet.rebroadcast_after, 10);
    }

    #[test]
    fn wallet_section_overrides() {
        let toml = r#"
            scan_interval_ms = 250
            log_format = "json"

            [wallet]
            confirmations = 6
            max_blocks_per_scan = 50
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.scan_interval(), Duration::from_millis(250));
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
        assert_eq!(config.wallet.confirmations, 6);
        assert_eq!(config.wallet.max_blocks_per_scan, 50);
        assert_eq!(config.wallet.cleanup_batch_size, 1000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            NodeConfig::from_toml_str(r#"log_format = "xml""#),
            Err(NodeError::Config(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml_str("scan_interval_ms = 0"),
            Err(NodeError::Config(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml_str("[wallet]\nmax_blocks_per_scan = 0"),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn from_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NodeConfig::from_toml_file(dir.path().join("absent.toml")),
            Err(NodeError::Config(_))
        ));
    }
}
