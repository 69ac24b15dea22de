//! Where liquidity positions come from.

use std::sync::Arc;

use async_trait::async_trait;
use portal_chain::{ChainProvider, ObjectStateFilter, PageQuery, RoochRpc};
use portal_core::PortalConfig;
use tracing::debug;

use crate::types::{LpToken, TokenType, TradeError, type_args_after};

const LP_TOKEN_MARKER: &str = "::swap::LPToken<";
const TOKEN_PAIR_MARKER: &str = "::swap::TokenPair<";

#[async_trait]
pub trait LiquiditySource: Send + Sync {
    /// Positions held by `owner`.
    async fn owner_liquidity(&self, owner: &str) -> Result<Vec<LpToken>, TradeError>;

    /// Every pool on the dex, up to `limit`.
    async fn all_liquidity(&self, limit: u64) -> Result<Vec<LpToken>, TradeError>;
}

/// `true` when `coin_type` is an LP token minted by the dex at `dex_address`.
pub fn is_lp_token(coin_type: &str, dex_address: &str) -> bool {
    coin_type
        .strip_prefix(dex_address)
        .is_some_and(|rest| rest.starts_with(LP_TOKEN_MARKER))
}

/// Token pair of `{dex}::swap::LPToken<X, Y>` or `{dex}::swap::TokenPair<X, Y>`.
fn pair_of(type_str: &str, marker: &str) -> Result<(TokenType, TokenType), TradeError> {
    let args = type_args_after(type_str, marker)?;
    let [x, y]: [String; 2] = args
        .try_into()
        .map_err(|_| TradeError::MalformedType(type_str.to_string()))?;
    Ok((TokenType::parse(&x)?, TokenType::parse(&y)?))
}

/// Reads owned positions from the account's coin balances and the pool list
/// from the dex's `TokenPair` objects, on whatever chain is active. Pool
/// entries carry no balance.
pub struct BalanceLiquiditySource {
    provider: Arc<ChainProvider>,
    config: Arc<PortalConfig>,
}

impl BalanceLiquiditySource {
    pub fn new(provider: Arc<ChainProvider>, config: Arc<PortalConfig>) -> Self {
        Self { provider, config }
    }

    fn context(&self) -> Result<(Arc<dyn RoochRpc>, String), TradeError> {
        let rpc = self.provider.client().ok_or(TradeError::NotReady)?;
        let dex = self
            .provider
            .active_chain()?
            .network_variables(&self.config)
            .dex_address
            .ok_or(TradeError::MissingDexAddress)?;
        Ok((rpc, dex))
    }
}

#[async_trait]
impl LiquiditySource for BalanceLiquiditySource {
    async fn owner_liquidity(&self, owner: &str) -> Result<Vec<LpToken>, TradeError> {
        let (rpc, dex) = self.context()?;
        let mut tokens = Vec::new();
        let mut page = PageQuery::default();
        loop {
            let balances = rpc.get_balances(owner, page.clone()).await?;
            for info in balances.data {
                if !is_lp_token(&info.coin_type, &dex) {
                    continue;
                }
                let (x, y) = pair_of(&info.coin_type, LP_TOKEN_MARKER)?;
                tokens.push(LpToken {
                    id: info.coin_type,
                    x,
                    y,
                    balance: info.balance,
                    decimals: info.decimals,
                });
            }
            if !balances.has_next_page || balances.next_cursor.is_none() {
                break;
            }
            page.cursor = balances.next_cursor;
        }
        debug!(%owner, positions = tokens.len(), "owner liquidity");
        Ok(tokens)
    }

    async fn all_liquidity(&self, limit: u64) -> Result<Vec<LpToken>, TradeError> {
        let (rpc, dex) = self.context()?;
        let pairs = rpc
            .query_object_states(
                ObjectStateFilter::ObjectType(format!("{dex}::swap::TokenPair")),
                PageQuery::first(limit),
            )
            .await?;
        pairs
            .data
            .iter()
            .map(|state| {
                let (x, y) = pair_of(&state.object_type, TOKEN_PAIR_MARKER)?;
                Ok(LpToken {
                    id: state.id.clone(),
                    x,
                    y,
                    balance: 0,
                    decimals: 0,
                })
            })
            .collect()
    }
}
