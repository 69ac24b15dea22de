use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Gas coin shown on the faucet page.
pub const DEFAULT_GAS_COIN_TYPE: &str = "0x3::gas_coin::RGas";

/// Message the wallet signs when claiming through an invitation.
pub const DEFAULT_CLAIM_MESSAGE: &str = "Welcome to use Rooch! Hold BTC Claim your Rgas.";

// ---------------------------------------------------------------------------
// NetworkVariables
// ---------------------------------------------------------------------------

/// Per-network contract locations and service endpoints.
///
/// Every field is optional so a chain descriptor can override a subset and
/// fall back to the config for the rest (see [`NetworkVariables::merged_with`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faucet_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faucet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faucet_object: Option<String>,
    /// Address publishing the invitation module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inviter_ca: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inviter_module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dex_address: Option<String>,
}

impl NetworkVariables {
    /// Fill every unset field of `self` from `fallback`.
    pub fn merged_with(&self, fallback: &NetworkVariables) -> NetworkVariables {
        NetworkVariables {
            faucet_url: self.faucet_url.clone().or_else(|| fallback.faucet_url.clone()),
            faucet_address: self
                .faucet_address
                .clone()
                .or_else(|| fallback.faucet_address.clone()),
            faucet_object: self
                .faucet_object
                .clone()
                .or_else(|| fallback.faucet_object.clone()),
            inviter_ca: self.inviter_ca.clone().or_else(|| fallback.inviter_ca.clone()),
            inviter_module: self
                .inviter_module
                .clone()
                .or_else(|| fallback.inviter_module.clone()),
            dex_address: self.dex_address.clone().or_else(|| fallback.dex_address.clone()),
        }
    }

    /// Fully qualified type of the invitation config object, if both halves
    /// are known.
    pub fn invitation_conf_type(&self) -> Option<String> {
        match (&self.inviter_ca, &self.inviter_module) {
            (Some(ca), Some(module)) => Some(format!("{ca}::{module}::InvitationConf")),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PortalConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.rooch-portal/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub log_level: String,

    // Faucet
    pub balance_poll_secs: u64,
    pub gas_coin_type: String,
    /// Decimals of the value returned by the faucet eligibility check.
    pub faucet_decimals: u8,
    pub claim_message: String,
    pub utxo_page_limit: u64,

    // Transport
    pub request_timeout_secs: u64,

    /// Network variables keyed by chain id (`"0x4"`, `"0x3"`, ...).
    pub networks: BTreeMap<String, NetworkVariables>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            balance_poll_secs: 5,
            gas_coin_type: DEFAULT_GAS_COIN_TYPE.into(),
            faucet_decimals: 8,
            claim_message: DEFAULT_CLAIM_MESSAGE.into(),
            utxo_page_limit: 50,
            request_timeout_secs: 30,
            networks: BTreeMap::new(),
        }
    }
}

impl PortalConfig {
    /// Returns the base directory: `~/.rooch-portal/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".rooch-portal"))
    }

    /// Returns the config file path: `~/.rooch-portal/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.rooch-portal/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Returns the key-value storage file: `~/.rooch-portal/storage.json`
    pub fn storage_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("storage.json"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path, writing defaults if absent.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Saves config to `~/.rooch-portal/config.json`.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Network variables configured for `chain_id`. Returns an empty set when
    /// the chain has no entry.
    pub fn network(&self, chain_id: &str) -> NetworkVariables {
        match self.networks.get(chain_id) {
            Some(vars) => vars.clone(),
            None => {
                warn!(chain_id, "no network variables configured");
                NetworkVariables::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
