//! Application configuration
//!
//! The demo only needs to know:
//! - Which WalletConnect bridge to pair through
//! - How to describe itself to the wallet
//! - Any networks beyond the built-in table
//! - Where to store local data

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::networks::NetworkDescriptor;

pub const DEFAULT_BRIDGE: &str = "https://bridge.walletconnect.org";

/// Metadata shown by the wallet when it is asked to approve the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

impl Default for ClientMeta {
    fn default() -> Self {
        Self {
            name: "Moonbeam WalletConnect Demo App".to_string(),
            description: "Connect a mobile wallet to Moonbeam".to_string(),
            url: "https://moonbeam.network".to_string(),
            icons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WalletConnect v1 bridge server.
    #[serde(default = "default_bridge")]
    pub bridge: String,

    #[serde(default)]
    pub client_meta: ClientMeta,

    /// Extra networks treated as supported, e.g. a local dev chain.
    #[serde(default)]
    pub networks: Vec<NetworkDescriptor>,

    /// Local data directory (session database)
    #[serde(skip)]
    pub data_dir: Option<PathBuf>,
}

fn default_bridge() -> String {
    DEFAULT_BRIDGE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge: default_bridge(),
            client_meta: ClientMeta::default(),
            networks: Vec::new(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from disk
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            log::info!("📁 Loading config from: {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)?;
            config.validate()?;
            config.data_dir = Some(Self::data_dir()?);
            log::info!(
                "✅ Config loaded: bridge={}, {} extra networks",
                config.bridge,
                config.networks.len()
            );
            Ok(config)
        } else {
            log::info!("📝 Creating default config");
            let config = Config {
                data_dir: Some(Self::data_dir()?),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;
        log::info!("💾 Config saved to: {}", config_path.display());
        Ok(())
    }

    /// Path of the sled database holding the persisted pairing session.
    pub fn session_db_path(&self) -> PathBuf {
        let mut path = self
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().unwrap_or_else(|_| PathBuf::from(".")));
        path.push("session_db");
        path
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = Self::data_dir()?;
        path.push("config.toml");
        Ok(path)
    }

    /// Get base data directory
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        path.push(".moonbeam-wc-demo");
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.bridge) {
            return Err(ConfigError::InvalidBridge(self.bridge.clone()));
        }

        for network in &self.networks {
            if network.name.is_empty() || network.native_currency_symbol.is_empty() {
                return Err(ConfigError::InvalidNetwork(format!(
                    "chain {} needs a name and a currency symbol",
                    network.chain_id
                )));
            }
            if !is_http_url(&network.rpc_url) {
                return Err(ConfigError::InvalidNetwork(format!(
                    "chain {} rpc_url must start with http:// or https://",
                    network.chain_id
                )));
            }
        }

        Ok(())
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Invalid bridge URL: {0} (must start with http:// or https://)")]
    InvalidBridge(String),

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
}
