use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use cosmos_rpc_client::{BroadcastMode, Decimal, SubmissionConfig};
use icq_types::RegisteredQuery;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RelayError;

/// Environment variable holding the hex encoded secp256k1 key that signs submissions.
pub const SIGNER_KEY_ENV: &str = "RELAYER_SIGNER_KEY";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The chain whose state and transactions are proven.
    pub target_chain: TargetChainConfig,

    /// The chain the query results are submitted to.
    pub submission_chain: SubmissionChainConfig,

    /// Height store location, defaults to `data/heights.db` under the service home.
    pub storage_path: Option<PathBuf>,

    /// Capacity of the task queue between the query source and the relayer.
    pub queue_capacity: usize,

    /// Seconds between two deliveries of the configured queries.
    pub poll_interval_secs: u64,

    /// Registered queries to relay.
    pub queries: Vec<RegisteredQuery>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetChainConfig {
    pub rpc_address: String,
    pub chain_prefix: String,
    pub timeout_secs: u64,
    pub tx_search_page_size: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionChainConfig {
    pub rpc_address: String,
    pub chain_id: String,
    pub chain_prefix: String,
    /// Gas price with denom, e.g. `0.0025untrn`.
    pub gas_prices: String,
    pub gas_adjustment: f64,
    pub broadcast_mode: BroadcastMode,
    pub memo: String,
    pub timeout_secs: u64,
}

impl Default for TargetChainConfig {
    fn default() -> Self {
        Self {
            rpc_address: "http://localhost:26657".into(),
            chain_prefix: "cosmos".into(),
            timeout_secs: 10,
            tx_search_page_size: 100,
        }
    }
}

impl Default for SubmissionChainConfig {
    fn default() -> Self {
        Self {
            rpc_address: "http://localhost:26667".into(),
            chain_id: "neutron-1".into(),
            chain_prefix: "neutron".into(),
            gas_prices: "0.0025untrn".into(),
            gas_adjustment: 1.5,
            broadcast_mode: BroadcastMode::Sync,
            memo: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_chain: TargetChainConfig::default(),
            submission_chain: SubmissionChainConfig::default(),
            storage_path: None,
            queue_capacity: 256,
            poll_interval_secs: 6,
            queries: Vec::new(),
        }
    }
}

impl TargetChainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SubmissionChainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn submission_config(&self) -> Result<SubmissionConfig, RelayError> {
        let gas_price = self
            .gas_prices
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid gas_prices: {e}")))?;

        let gas_adjustment = Decimal::from_f64(self.gas_adjustment)
            .ok()
            .filter(|adjustment| !adjustment.is_zero())
            .ok_or_else(|| {
                RelayError::Config(format!(
                    "gas_adjustment must be positive, got {}",
                    self.gas_adjustment
                ))
            })?;

        Ok(SubmissionConfig {
            chain_id: self.chain_id.clone(),
            chain_prefix: self.chain_prefix.clone(),
            gas_price,
            gas_adjustment,
            broadcast_mode: self.broadcast_mode,
            memo: self.memo.clone(),
        })
    }
}

impl Config {
    /// The default service home directory.
    pub const APP_HOME: &str = ".icq-relayer";
    /// The default configuration directory.
    pub const CONFIG_DIR: &str = "config";
    /// The default configuration file in YAML format.
    pub const CONFIG_FILE: &str = "config.yaml";
    /// The default data directory.
    pub const DATA_DIR: &str = "data";

    fn home_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow!("cannot find home directory"))?
            .join(Self::APP_HOME))
    }

    /// Initializes the local configuration directory and writes the default config if missing.
    pub fn init() -> Result<()> {
        let config_dir = Self::home_dir()?.join(Self::CONFIG_DIR);
        fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join(Self::CONFIG_FILE);
        if !config_path.exists() {
            info!("creating default config at {config_path:?}");
            let yaml = serde_yaml::to_string(&Config::default())?;
            fs::write(&config_path, yaml)?;
        } else {
            info!("config file already exists at {config_path:?}");
        }

        Ok(())
    }

    /// Returns the default application config path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(Self::CONFIG_DIR).join(Self::CONFIG_FILE))
    }

    /// Returns the height store path, falling back to the service home.
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join(Self::DATA_DIR).join("heights.db")),
        }
    }

    /// Loads the application config from the service home directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(anyhow!("config file not found at {}", config_path.display()));
        }

        info!("reading config file at {}", config_path.display());
        let config_yaml = fs::read_to_string(config_path).context("Failed to read config file from path")?;
        let config: Config = serde_yaml::from_str(&config_yaml).context("Failed to parse config file")?;

        // Surface a malformed gas price at startup, not on the first submission.
        config.submission_chain.submission_config()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use icq_types::{ModuleKeySpec, QueryType};
    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join(Config::CONFIG_FILE);
        fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_default_config_roundtrips_through_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, &serde_yaml::to_string(&Config::default()).unwrap());

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.target_chain.tx_search_page_size, 100);
        assert_eq!(config.submission_chain.gas_adjustment, 1.5);
        assert_eq!(config.submission_chain.broadcast_mode, BroadcastMode::Sync);
    }

    #[test]
    fn test_queries_and_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
submission_chain:
  broadcast_mode: commit
  gas_prices: 0.5stake
queries:
  - id: 1
    query_type: kv
    keys:
      - kind: balance
        address: cosmos1xyz
        denom: uatom
  - id: 2
    query_type: tx
    transactions_filter: '[{"field":"message.action","op":"eq","value":"transfer"}]'
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.submission_chain.broadcast_mode, BroadcastMode::Commit);
        assert_eq!(config.submission_chain.chain_prefix, "neutron");
        assert_eq!(config.poll_interval_secs, 6);
        assert_eq!(config.queries.len(), 2);
        assert_eq!(
            config.queries[0].keys,
            vec![ModuleKeySpec::Balance {
                address: "cosmos1xyz".into(),
                denom: "uatom".into()
            }]
        );
        assert_eq!(config.queries[1].query_type, QueryType::Tx);

        let submission = config.submission_chain.submission_config().unwrap();
        assert_eq!(submission.gas_price.denom, "stake");
    }

    #[test]
    fn test_unknown_broadcast_mode_fails_loading() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "submission_chain:\n  broadcast_mode: block\n");

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_malformed_gas_price_fails_loading() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "submission_chain:\n  gas_prices: cheap\n");

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_gas_adjustment_is_kept_as_written() {
        let config = SubmissionChainConfig {
            gas_adjustment: 1.1,
            ..Default::default()
        };
        let submission = config.submission_config().unwrap();
        assert_eq!(submission.gas_adjustment.to_string(), "1.1");
        assert_eq!(cosmos_rpc_client::simulate::adjusted_gas(100_000, &submission.gas_adjustment), 110_000);

        let zero = SubmissionChainConfig {
            gas_adjustment: 0.0,
            ..Default::default()
        };
        assert!(matches!(zero.submission_config(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_explicit_storage_path() {
        let config = Config {
            storage_path: Some(PathBuf::from("/var/lib/icq/heights.db")),
            ..Default::default()
        };
        assert_eq!(config.storage_path().unwrap(), PathBuf::from("/var/lib/icq/heights.db"));
    }
}
