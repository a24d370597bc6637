//! # Node Configuration
//!
//! Unified configuration for a worker node and the rendezvous service.
//!
//! ## Precedence
//!
//! ```text
//! defaults  <  TOML file (--config / DC_CONFIG)  <  DC_* environment  <  CLI flags
//! ```
//!
//! Every section has working defaults, so a file is optional. The values
//! that must agree across a run (transactions per block, difficulty) have
//! no safety net: nodes with different values reject each other's blocks.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use dc_04_mempool::MempoolConfig;
use dc_05_reconciliation::ChainParams;
use serde::Deserialize;
use shared_types::Tag;

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "DC_CONFIG";
pub const ENV_BOOTSTRAP_ADDR: &str = "DC_BOOTSTRAP_ADDR";
pub const ENV_SYNC_MODE: &str = "DC_SYNC_MODE";
pub const ENV_IDENTITY_SEED: &str = "DC_IDENTITY_SEED";

/// Seed hashed into the node identity when nothing else is configured.
pub const DEFAULT_IDENTITY_SEED: &str = "jfv47";

/// Complete node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub chain: ChainConfig,
    pub workers: WorkerConfig,
    pub sync: SyncConfig,
    pub ledger: LedgerConfig,
    /// Hashed with SHA-256 into the miner address and registration identity.
    pub identity_seed: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            chain: ChainConfig::default(),
            workers: WorkerConfig::default(),
            sync: SyncConfig::default(),
            ledger: LedgerConfig::default(),
            identity_seed: DEFAULT_IDENTITY_SEED.to_string(),
        }
    }
}

impl NodeConfig {
    /// Defaults, overlaid with the TOML file at `path` if one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
                    path: path.to_path_buf(),
                    error,
                })?;
                Self::from_toml_str(&content)
            }
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `DC_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BOOTSTRAP_ADDR) {
            self.network.bootstrap_addr = parse_value(ENV_BOOTSTRAP_ADDR, &value)?;
        }
        if let Some(value) = lookup(ENV_SYNC_MODE) {
            self.sync.mode = parse_value(ENV_SYNC_MODE, &value)?;
        }
        if let Some(value) = lookup(ENV_IDENTITY_SEED) {
            self.identity_seed = value;
        }
        Ok(())
    }

    /// Reject values no node can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.transactions_per_block == 0 {
            return Err(invalid("chain.transactions_per_block", "0"));
        }
        if self.chain.difficulty > 64 {
            return Err(invalid("chain.difficulty", self.chain.difficulty));
        }
        if self.workers.cores == 0 {
            return Err(invalid("workers.cores", "0"));
        }
        if self.sync.round_timeout_ms == 0 {
            return Err(invalid("sync.round_timeout_ms", "0"));
        }
        Ok(())
    }

    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            txs_per_block: self.chain.transactions_per_block,
            difficulty: self.chain.difficulty,
        }
    }

    pub fn mempool_config(&self) -> MempoolConfig {
        MempoolConfig {
            transactions_per_block: self.chain.transactions_per_block,
        }
    }

    pub fn initial_balance(&self) -> Tag {
        Tag::from_u64(self.ledger.initial_balance)
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Rendezvous service address.
    pub bootstrap_addr: SocketAddr,
    /// Host the node listens on and dials peers at.
    pub peer_host: IpAddr,
    /// Listen backlog for every listening socket.
    pub listen_backlog: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bootstrap_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8888),
            peer_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_backlog: 100,
        }
    }
}

impl NetworkConfig {
    pub fn peer_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.peer_host, port)
    }
}

/// Run-wide block parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    pub transactions_per_block: usize,
    /// Trailing zero hex digits a block hash needs.
    pub difficulty: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            transactions_per_block: 50_000,
            difficulty: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Worker tasks draining the readable-connection queue.
    pub cores: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { cores: 1 }
    }
}

/// How an ancestor search is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Each reply is handled by whichever job next reads the connection.
    #[default]
    EventDriven,
    /// The job that received the block runs the whole search inline.
    Blocking,
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "event-driven" | "event" => Ok(Self::EventDriven),
            "blocking" => Ok(Self::Blocking),
            other => Err(format!("unknown sync mode '{other}'")),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventDriven => write!(f, "event-driven"),
            Self::Blocking => write!(f, "blocking"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub mode: SyncMode,
    /// Blocking mode: wait per GET_HASH / GET_BLOCK round.
    pub round_timeout_ms: u64,
    /// Event-driven mode: a session idle this long is abandoned.
    pub session_timeout_ms: u64,
    /// A connection stuck mid-frame this long is closed.
    pub read_stall_ms: u64,
    /// How often sessions and partial reads are swept.
    pub sweep_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            round_timeout_ms: 5_000,
            session_timeout_ms: 30_000,
            read_stall_ms: 5_000,
            sweep_interval_ms: 1_000,
        }
    }
}

impl SyncConfig {
    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn read_stall(&self) -> Duration {
        Duration::from_millis(self.read_stall_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Demo accounts every node opens at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub demo_accounts: u64,
    pub initial_balance: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            demo_accounts: dc_03_ledger::DEFAULT_DEMO_ACCOUNTS,
            initial_balance: dc_03_ledger::DEFAULT_DEMO_BALANCE,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, error: std::io::Error },
    Parse(String),
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(f, "Failed to read config {}: {}", path.display(), error)
            }
            ConfigError::Parse(msg) => write!(f, "Invalid config file: {}", msg),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{}' for {}", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(key: &str, value: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.network.bootstrap_addr, "127.0.0.1:8888".parse().unwrap());
        assert_eq!(config.network.listen_backlog, 100);
        assert_eq!(config.chain.transactions_per_block, 50_000);
        assert_eq!(config.chain.difficulty, 1);
        assert_eq!(config.sync.mode, SyncMode::EventDriven);
        assert_eq!(config.sync.round_timeout(), Duration::from_secs(5));
        assert_eq!(config.ledger.demo_accounts, 101);
        assert_eq!(config.identity_seed, "jfv47");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            identity_seed = "node-b"

            [chain]
            transactions_per_block = 4

            [sync]
            mode = "blocking"
            round_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.chain.transactions_per_block, 4);
        assert_eq!(config.chain.difficulty, 1);
        assert_eq!(config.sync.mode, SyncMode::Blocking);
        assert_eq!(config.sync.round_timeout(), Duration::from_millis(250));
        assert_eq!(config.sync.session_timeout_ms, 30_000);
        assert_eq!(config.identity_seed, "node-b");
        assert_eq!(config.chain_params().txs_per_block, 4);
        assert_eq!(config.mempool_config().transactions_per_block, 4);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = NodeConfig::from_toml_str("[chain]\nblock_size = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        config
            .apply_env_overrides(env(&[
                (ENV_BOOTSTRAP_ADDR, "127.0.0.1:9000"),
                (ENV_SYNC_MODE, "Blocking"),
                (ENV_IDENTITY_SEED, "other"),
            ]))
            .unwrap();
        assert_eq!(config.network.bootstrap_addr.port(), 9000);
        assert_eq!(config.sync.mode, SyncMode::Blocking);
        assert_eq!(config.identity_seed, "other");
    }

    #[test]
    fn test_bad_env_value_names_the_variable() {
        let mut config = NodeConfig::default();
        let err = config
            .apply_env_overrides(env(&[(ENV_BOOTSTRAP_ADDR, "nowhere")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_BOOTSTRAP_ADDR));
    }

    #[test]
    fn test_validate_rejects_zero_block_size() {
        let mut config = NodeConfig::default();
        config.chain.transactions_per_block = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = NodeConfig::load(Some(Path::new("/nonexistent/dc.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
