use std::collections::BTreeMap;
use std::fmt;

use portal_core::{NetworkVariables, PortalConfig};
use serde::{Deserialize, Serialize};

/// Extra per-chain settings carried alongside the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainOptions {
    /// Overrides for the configured network variables of this chain.
    #[serde(default)]
    pub network: NetworkVariables,
    /// Unrecognised keys, preserved across load/save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One network endpoint the portal can talk to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub id: u64,
    pub name: String,
    /// `0x`-prefixed hex form of `id`, used as the active-chain pointer.
    pub chain_id: String,
    pub url: String,
    #[serde(default)]
    pub options: ChainOptions,
}

pub const LOCAL_CHAIN_ID: u64 = 4;
pub const DEV_CHAIN_ID: u64 = 3;
pub const TEST_CHAIN_ID: u64 = 2;
pub const MAIN_CHAIN_ID: u64 = 1;

impl ChainDescriptor {
    pub fn new(id: u64, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            chain_id: chain_id_hex(id),
            url: url.into(),
            options: ChainOptions::default(),
        }
    }

    pub fn with_network(mut self, network: NetworkVariables) -> Self {
        self.options.network = network;
        self
    }

    /// Two descriptors name the same endpoint when both `id` and `url` match.
    pub fn same_endpoint(&self, other: &ChainDescriptor) -> bool {
        self.id == other.id && self.url == other.url
    }

    /// Network variables for this chain: descriptor overrides first, then the
    /// config entry for `chain_id`.
    pub fn network_variables(&self, config: &PortalConfig) -> NetworkVariables {
        self.options.network.merged_with(&config.network(&self.chain_id))
    }

    pub fn local() -> Self {
        Self::new(LOCAL_CHAIN_ID, "localnet", "http://127.0.0.1:6767")
    }

    pub fn dev() -> Self {
        Self::new(DEV_CHAIN_ID, "devnet", "https://dev-seed.rooch.network:443")
    }

    pub fn test() -> Self {
        Self::new(TEST_CHAIN_ID, "testnet", "https://test-seed.rooch.network:443")
    }

    pub fn main() -> Self {
        Self::new(MAIN_CHAIN_ID, "mainnet", "https://main-seed.rooch.network:443")
    }
}

impl fmt::Display for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.name, self.chain_id, self.url)
    }
}

/// Hex chain id string for a numeric id (`3` → `"0x3"`).
pub fn chain_id_hex(id: u64) -> String {
    format!("0x{id:x}")
}

/// Chains shipped with the portal, in display order.
pub fn builtin_chains() -> Vec<ChainDescriptor> {
    vec![
        ChainDescriptor::local(),
        ChainDescriptor::dev(),
        ChainDescriptor::test(),
        ChainDescriptor::main(),
    ]
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
