use portal_chain::{ProviderError, RpcError};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("Malformed type string: {0}")]
    MalformedType(String),

    #[error("Object {id} has no decoded field {field}")]
    MissingField { id: String, field: &'static str },

    #[error("Network variable dex_address is not configured for this chain")]
    MissingDexAddress,

    #[error("Chain client is not ready")]
    NotReady,

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A Move coin type and its short display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenType {
    pub type_tag: String,
    pub name: String,
}

impl TokenType {
    /// Display name is the third `:`-separated segment of the path, so
    /// `0x1::a::X` is named `a`.
    pub fn parse(type_tag: &str) -> Result<Self, TradeError> {
        let type_tag = type_tag.trim();
        let name = type_tag
            .split(':')
            .nth(2)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TradeError::MalformedType(type_tag.to_string()))?;
        Ok(Self {
            type_tag: type_tag.to_string(),
            name: name.to_string(),
        })
    }
}

/// One liquidity pool position for an ordered token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpToken {
    pub id: String,
    pub x: TokenType,
    pub y: TokenType,
    pub balance: u128,
    pub decimals: u8,
}

impl LpToken {
    /// Ordered pair match: `(x, y)` does not match `(y, x)`.
    pub fn matches_pair(&self, x: &TokenType, y: &TokenType) -> bool {
        self.x.type_tag == x.type_tag && self.y.type_tag == y.type_tag
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmRecord {
    pub id: String,
    pub alive: bool,
    pub end_time: u64,
    pub asset_total_weight: u128,
    pub release_per_second: u128,
    pub x: TokenType,
    pub y: TokenType,
    /// Reward coin type.
    pub reward: String,
    /// The caller's position in this farm's pool, if any.
    pub liquidity: Option<LpToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FarmPartition {
    pub active: Vec<FarmRecord>,
    pub expired: Vec<FarmRecord>,
}

/// Top-level type arguments between the outermost `<` `>` following
/// `marker`, split on commas that are not nested inside another generic.
pub(crate) fn type_args_after(type_str: &str, marker: &str) -> Result<Vec<String>, TradeError> {
    let malformed = || TradeError::MalformedType(type_str.to_string());
    let start = type_str.find(marker).ok_or_else(malformed)? + marker.len();
    let rest = type_str[start..].trim();
    let inner = rest.strip_suffix('>').ok_or_else(malformed)?;

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.checked_sub(1).ok_or_else(malformed)?;
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(malformed());
    }
    args.push(current.trim().to_string());
    if args.iter().any(String::is_empty) {
        return Err(malformed());
    }
    Ok(args)
}
