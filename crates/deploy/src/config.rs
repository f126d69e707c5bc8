//! Project configuration: networks, accounts and filesystem paths.
//!
//! The configuration is layered with figment: built-in defaults, then the
//! `Propshare.toml` file, then `PROPSHARE_`-prefixed environment variables
//! (nested keys separated by `__`, e.g. `PROPSHARE_NETWORKS__GANACHE__URL`).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{DeployError, DeployResult};

/// The default name for the project configuration file.
pub const CONFIG_FILENAME: &str = "Propshare.toml";

/// Prefix of the environment variables merged on top of the configuration file.
pub const ENV_PREFIX: &str = "PROPSHARE_";

/// Network used when neither the CLI nor the file selects one.
pub const DEFAULT_NETWORK: &str = "localhost";

/// Default BIP-32 derivation path prefix (account index is appended).
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0";

/// Default number of accounts derived from a mnemonic.
pub const DEFAULT_ACCOUNT_COUNT: u32 = 20;

/// Default bound on how long a creation transaction may stay unconfirmed.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Top-level project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Network used when none is selected explicitly.
    pub default_network: String,
    /// Compiler settings of the external build step. Recorded, not acted upon.
    pub compiler: CompilerConfig,
    /// Filesystem layout of the project.
    pub paths: PathsConfig,
    /// Named networks.
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Directory the relative paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

/// Solidity compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub version: String,
    pub optimizer: OptimizerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub runs: u32,
}

/// Project directories, relative to the configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub sources: PathBuf,
    pub artifacts: PathBuf,
    pub cache: PathBuf,
    pub tests: PathBuf,
    /// Where deployment records are written.
    pub deployments: PathBuf,
}

/// A network the contracts can be deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub url: Url,
    /// Expected chain ID. When set, the node must report the same value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Where the deploying accounts come from.
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Maximum time to wait for a creation transaction to be included.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Interval between receipt polls while waiting for confirmation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Account source for a network.
///
/// In TOML this is either the string `"remote"`, a table with a `mnemonic` key, or a
/// table with a `private_keys` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountsConfig {
    /// Accounts unlocked on the node, listed with `eth_accounts`.
    Remote(RemoteAccounts),
    /// Accounts derived locally from a BIP-39 mnemonic (checksum verified).
    Mnemonic(MnemonicAccounts),
    /// Raw hex-encoded private keys.
    PrivateKeys(PrivateKeyAccounts),
}

impl Default for AccountsConfig {
    fn default() -> Self {
        AccountsConfig::Remote(RemoteAccounts::Remote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteAccounts {
    Remote,
}

/// Accounts derived from a mnemonic along `<path>/<index>`.
///
/// Unlike Hardhat, the phrase must pass BIP-39 checksum validation; a phrase with a
/// bad checksum word makes every deployment fail with `NoSignerAvailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicAccounts {
    pub mnemonic: String,
    #[serde(default = "default_derivation_path")]
    pub path: String,
    #[serde(default)]
    pub initial_index: u32,
    #[serde(default = "default_account_count")]
    pub count: u32,
}

fn default_derivation_path() -> String {
    DEFAULT_DERIVATION_PATH.to_string()
}

fn default_account_count() -> u32 {
    DEFAULT_ACCOUNT_COUNT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyAccounts {
    pub private_keys: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_network: DEFAULT_NETWORK.to_string(),
            compiler: CompilerConfig::default(),
            paths: PathsConfig::default(),
            networks: default_networks(),
            root: PathBuf::from("."),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            version: "0.8.28".to_string(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 200,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sources: PathBuf::from("./contracts"),
            artifacts: PathBuf::from("./artifacts"),
            cache: PathBuf::from("./cache"),
            tests: PathBuf::from("./test"),
            deployments: PathBuf::from("./deployments"),
        }
    }
}

impl NetworkConfig {
    /// A network with remote accounts and default timeouts.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            chain_id: None,
            accounts: AccountsConfig::default(),
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Networks available out of the box: a local dev node and Ganache.
fn default_networks() -> BTreeMap<String, NetworkConfig> {
    let mut networks = BTreeMap::new();

    if let Ok(url) = Url::parse("http://127.0.0.1:8545") {
        networks.insert("localhost".to_string(), NetworkConfig::new(url));
    }

    if let Ok(url) = Url::parse("http://127.0.0.1:7545") {
        networks.insert(
            "ganache".to_string(),
            NetworkConfig {
                chain_id: Some(1337),
                ..NetworkConfig::new(url)
            },
        );
    }

    networks
}

impl ProjectConfig {
    /// Load the configuration.
    ///
    /// `path` may point at a file or at a directory containing [`CONFIG_FILENAME`].
    /// When `path` is `None`, `./Propshare.toml` is used if it exists; otherwise only
    /// the defaults and the environment apply.
    pub fn load(path: Option<&Path>) -> DeployResult<Self> {
        let (config_path, root) = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(DeployError::Config(anyhow::anyhow!(
                        "Configuration file or directory not found: {}",
                        path.display()
                    )));
                }
                let config_path = if path.is_dir() {
                    path.join(CONFIG_FILENAME)
                } else {
                    path.to_path_buf()
                };
                let root = config_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (config_path, root)
            }
            None => (PathBuf::from(CONFIG_FILENAME), PathBuf::from(".")),
        };

        let mut config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))
            .map_err(DeployError::Config)?;

        config.root = root;

        tracing::debug!(
            path = %config_path.display(),
            default_network = %config.default_network,
            networks = config.networks.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Parse a configuration from a TOML string, on top of the defaults.
    pub fn from_toml_str(content: &str) -> DeployResult<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(content))
            .extract()
            .context("Failed to parse configuration as TOML")
            .map_err(DeployError::Config)
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml_string(&self) -> DeployResult<String> {
        toml::to_string_pretty(self)
            .context("Failed to serialize configuration to TOML")
            .map_err(DeployError::Config)
    }

    /// Look up a network by name.
    pub fn network(&self, name: &str) -> DeployResult<&NetworkConfig> {
        self.networks.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.networks.keys().map(String::as_str).collect();
            DeployError::Config(anyhow::anyhow!(
                "Unknown network `{}` (configured: {})",
                name,
                known.join(", ")
            ))
        })
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(&self.paths.artifacts)
    }

    pub fn deployments_dir(&self) -> PathBuf {
        self.root.join(&self.paths.deployments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_project_layout() {
        let config = ProjectConfig::default();
        assert_eq!(config.default_network, "localhost");
        assert_eq!(config.compiler.version, "0.8.28");
        assert!(config.compiler.optimizer.enabled);
        assert_eq!(config.compiler.optimizer.runs, 200);
        assert_eq!(config.paths.artifacts, PathBuf::from("./artifacts"));

        let ganache = config.network("ganache").unwrap();
        assert_eq!(ganache.url.as_str(), "http://127.0.0.1:7545/");
        assert_eq!(ganache.chain_id, Some(1337));
        assert_eq!(ganache.accounts, AccountsConfig::default());
    }

    #[test]
    fn test_parse_mnemonic_network() {
        let config = ProjectConfig::from_toml_str(
            r#"
            default_network = "ganache"

            [networks.ganache]
            url = "http://127.0.0.1:7545"
            chain_id = 1337
            accounts = { mnemonic = "test test test test test test test test test test test junk" }
            "#,
        )
        .unwrap();

        assert_eq!(config.default_network, "ganache");
        let network = config.network("ganache").unwrap();
        match &network.accounts {
            AccountsConfig::Mnemonic(accounts) => {
                assert_eq!(accounts.path, DEFAULT_DERIVATION_PATH);
                assert_eq!(accounts.initial_index, 0);
                assert_eq!(accounts.count, DEFAULT_ACCOUNT_COUNT);
            }
            other => panic!("expected mnemonic accounts, got {other:?}"),
        }
        assert_eq!(network.confirmation_timeout(), Duration::from_secs(300));

        // Built-in networks are still available next to the configured ones.
        assert!(config.network("localhost").is_ok());
    }

    #[test]
    fn test_parse_remote_and_private_keys() {
        let config = ProjectConfig::from_toml_str(
            r#"
            [networks.dev]
            url = "http://127.0.0.1:9545"
            accounts = "remote"
            poll_interval_ms = 50

            [networks.keys]
            url = "http://127.0.0.1:9546"
            accounts = { private_keys = ["0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"] }
            "#,
        )
        .unwrap();

        let dev = config.network("dev").unwrap();
        assert!(matches!(dev.accounts, AccountsConfig::Remote(_)));
        assert_eq!(dev.poll_interval(), Duration::from_millis(50));

        let keys = config.network("keys").unwrap();
        assert!(matches!(&keys.accounts, AccountsConfig::PrivateKeys(k) if k.private_keys.len() == 1));
    }

    #[test]
    fn test_unknown_network_is_config_error() {
        let config = ProjectConfig::default();
        let err = config.network("mainnet").unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip_keeps_networks() {
        let config = ProjectConfig::default();
        let content = config.to_toml_string().unwrap();
        let parsed = ProjectConfig::from_toml_str(&content).unwrap();
        assert_eq!(parsed.networks, config.networks);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = ProjectConfig::load(Some(Path::new("/nonexistent/Propshare.toml"))).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }
}
