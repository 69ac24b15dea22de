//! Farming assets joined with the caller's liquidity, split by end time.

use std::sync::Arc;

use portal_chain::{ChainProvider, ObjectStateFilter, ObjectStateView, PageQuery};
use portal_core::PortalConfig;
use tracing::{debug, warn};

use crate::liquidity::LiquiditySource;
use crate::types::{FarmPartition, FarmRecord, LpToken, TokenType, TradeError, type_args_after};

const FARMING_ASSET_MARKER: &str = "::liquidity_incentive::FarmingAsset<";

/// Page size used when looking up every pool for the add-liquidity action.
pub const ALL_LIQUIDITY_LIMIT: u64 = 200;

/// Object type queried for farms on a dex deployment.
pub fn farming_asset_type(dex_address: &str) -> String {
    format!("{dex_address}::liquidity_incentive::FarmingAsset")
}

/// Split `...::liquidity_incentive::FarmingAsset<X, Y, R>` into its two pool
/// tokens and the reward type.
pub fn parse_farm_type(object_type: &str) -> Result<(TokenType, TokenType, String), TradeError> {
    let args = type_args_after(object_type, FARMING_ASSET_MARKER)?;
    let [x, y, reward]: [String; 3] = args
        .try_into()
        .map_err(|_| TradeError::MalformedType(object_type.to_string()))?;
    Ok((TokenType::parse(&x)?, TokenType::parse(&y)?, reward))
}

impl FarmRecord {
    pub fn from_state(state: &ObjectStateView, owned: &[LpToken]) -> Result<Self, TradeError> {
        let (x, y, reward) = parse_farm_type(&state.object_type)?;
        let missing = |field| TradeError::MissingField {
            id: state.id.clone(),
            field,
        };
        let end_time = state
            .u128_field("end_time")
            .and_then(|t| u64::try_from(t).ok())
            .ok_or_else(|| missing("end_time"))?;
        let liquidity = owned.iter().find(|lp| lp.matches_pair(&x, &y)).cloned();

        Ok(Self {
            id: state.id.clone(),
            alive: state.bool_field("alive").ok_or_else(|| missing("alive"))?,
            end_time,
            asset_total_weight: state
                .u128_field("asset_total_weight")
                .ok_or_else(|| missing("asset_total_weight"))?,
            release_per_second: state
                .u128_field("release_per_second")
                .ok_or_else(|| missing("release_per_second"))?,
            x,
            y,
            reward,
            liquidity,
        })
    }
}

/// Build farm records and partition them around `now_secs`. A farm ending
/// exactly at `now_secs` belongs to neither side. Records that fail to parse
/// are skipped.
pub fn resolve_farms(states: &[ObjectStateView], owned: &[LpToken], now_secs: u64) -> FarmPartition {
    let mut partition = FarmPartition::default();
    for state in states {
        let record = match FarmRecord::from_state(state, owned) {
            Ok(record) => record,
            Err(e) => {
                warn!(id = %state.id, error = %e, "skipping farm");
                continue;
            }
        };
        if record.end_time > now_secs {
            partition.active.push(record);
        } else if record.end_time < now_secs {
            partition.expired.push(record);
        }
    }
    partition
}

/// The pool for `farm`'s ordered token pair.
pub fn find_pool<'a>(farm: &FarmRecord, all_liquidity: &'a [LpToken]) -> Option<&'a LpToken> {
    all_liquidity
        .iter()
        .find(|lp| lp.matches_pair(&farm.x, &farm.y))
}

pub struct FarmService {
    provider: Arc<ChainProvider>,
    config: Arc<PortalConfig>,
    liquidity: Arc<dyn LiquiditySource>,
}

impl FarmService {
    pub fn new(
        provider: Arc<ChainProvider>,
        config: Arc<PortalConfig>,
        liquidity: Arc<dyn LiquiditySource>,
    ) -> Self {
        Self {
            provider,
            config,
            liquidity,
        }
    }

    /// Farms on the active chain's dex, with `owner`'s positions attached.
    pub async fn load(&self, owner: &str) -> Result<FarmPartition, TradeError> {
        let rpc = self.provider.client().ok_or(TradeError::NotReady)?;
        let dex = self
            .provider
            .active_chain()?
            .network_variables(&self.config)
            .dex_address
            .ok_or(TradeError::MissingDexAddress)?;

        let farms_query = async {
            rpc.query_object_states(
                ObjectStateFilter::ObjectType(farming_asset_type(&dex)),
                PageQuery::default(),
            )
            .await
            .map_err(TradeError::from)
        };
        let (farms, owned) =
            futures::try_join!(farms_query, self.liquidity.owner_liquidity(owner))?;

        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        let partition = resolve_farms(&farms.data, &owned, now);
        debug!(
            active = partition.active.len(),
            expired = partition.expired.len(),
            "farms resolved"
        );
        Ok(partition)
    }

    /// Pool to open the add-liquidity action on.
    pub async fn pool_for(&self, farm: &FarmRecord) -> Result<Option<LpToken>, TradeError> {
        let all = self.liquidity.all_liquidity(ALL_LIQUIDITY_LIMIT).await?;
        Ok(find_pool(farm, &all).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use portal_chain::ChainDescriptor;
    use portal_chain::mock::{MockFactory, MockRpc};
    use portal_core::{MemoryStore, NetworkVariables};
    use serde_json::json;

    const FARM_TYPE: &str =
        "0xabc::liquidity_incentive::FarmingAsset<0x1::a::X, 0x1::b::Y, 0x1::c::Z>";

    fn farm_state(id: &str, object_type: &str, end_time: u64) -> ObjectStateView {
        serde_json::from_value(json!({
            "id": id,
            "object_type": object_type,
            "decoded_value": { "value": {
                "alive": true,
                "end_time": end_time.to_string(),
                "asset_total_weight": "1000",
                "release_per_second": 5
            }}
        }))
        .unwrap()
    }

    fn lp(x: &str, y: &str, balance: u128) -> LpToken {
        LpToken {
            id: format!("0xabc::swap::LPToken<{x}, {y}>"),
            x: TokenType::parse(x).unwrap(),
            y: TokenType::parse(y).unwrap(),
            balance,
            decimals: 8,
        }
    }

    #[test]
    fn parses_farm_type() {
        let (x, y, reward) = parse_farm_type(FARM_TYPE).unwrap();
        assert_eq!(x.type_tag, "0x1::a::X");
        assert_eq!(x.name, "a");
        assert_eq!(y.type_tag, "0x1::b::Y");
        assert_eq!(y.name, "b");
        assert_eq!(reward, "0x1::c::Z");
    }

    #[test]
    fn malformed_farm_types_are_rejected() {
        for bad in [
            "0xabc::liquidity_incentive::FarmingAsset<0x1::a::X, 0x1::b::Y>",
            "0xabc::other::Thing<0x1::a::X, 0x1::b::Y, 0x1::c::Z>",
            "0xabc::liquidity_incentive::FarmingAsset<X, 0x1::b::Y, 0x1::c::Z>",
        ] {
            assert!(
                matches!(parse_farm_type(bad), Err(TradeError::MalformedType(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn partition_around_now() {
        let now = 1_700_000_000;
        let states = vec![
            farm_state("past", FARM_TYPE, now - 1),
            farm_state("future", FARM_TYPE, now + 1),
            farm_state("exact", FARM_TYPE, now),
        ];
        let partition = resolve_farms(&states, &[], now);

        let active: Vec<_> = partition.active.iter().map(|f| f.id.as_str()).collect();
        let expired: Vec<_> = partition.expired.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(active, vec!["future"]);
        assert_eq!(expired, vec!["past"]);
    }

    #[test]
    fn record_fields_are_decoded() {
        let record = FarmRecord::from_state(&farm_state("f", FARM_TYPE, 10), &[]).unwrap();
        assert!(record.alive);
        assert_eq!(record.end_time, 10);
        assert_eq!(record.asset_total_weight, 1000);
        assert_eq!(record.release_per_second, 5);
        assert_eq!(record.liquidity, None);
    }

    #[test]
    fn owned_liquidity_joins_on_ordered_pair() {
        let owned = vec![lp("0x1::b::Y", "0x1::a::X", 3), lp("0x1::a::X", "0x1::b::Y", 7)];
        let partition = resolve_farms(&[farm_state("f", FARM_TYPE, 100)], &owned, 0);
        assert_eq!(partition.active[0].liquidity.as_ref().unwrap().balance, 7);
    }

    #[test]
    fn undecodable_farm_is_skipped() {
        let mut broken = farm_state("broken", FARM_TYPE, 100);
        broken.decoded_value = None;
        let partition = resolve_farms(&[broken, farm_state("ok", FARM_TYPE, 100)], &[], 0);
        assert_eq!(partition.active.len(), 1);
        assert_eq!(partition.active[0].id, "ok");
    }

    #[test]
    fn find_pool_uses_ordered_pair() {
        let record = FarmRecord::from_state(&farm_state("f", FARM_TYPE, 10), &[]).unwrap();
        let pools = vec![lp("0x1::b::Y", "0x1::a::X", 0)];
        assert!(find_pool(&record, &pools).is_none());

        let pools = vec![lp("0x1::b::Y", "0x1::a::X", 0), lp("0x1::a::X", "0x1::b::Y", 0)];
        assert_eq!(find_pool(&record, &pools).unwrap().x.name, "a");
    }

    struct FixedLiquidity(Vec<LpToken>);

    #[async_trait]
    impl LiquiditySource for FixedLiquidity {
        async fn owner_liquidity(&self, _owner: &str) -> Result<Vec<LpToken>, TradeError> {
            Ok(self.0.clone())
        }

        async fn all_liquidity(&self, _limit: u64) -> Result<Vec<LpToken>, TradeError> {
            Ok(self.0.clone())
        }
    }

    async fn service(rpc: MockRpc, dex: Option<&str>, owned: Vec<LpToken>) -> FarmService {
        let provider = Arc::new(ChainProvider::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockFactory::with_client(Arc::new(rpc))),
        ));
        provider.initialize().await.unwrap();
        let mut config = PortalConfig::default();
        config.networks.insert(
            "0x3".into(),
            NetworkVariables {
                dex_address: dex.map(str::to_string),
                ..Default::default()
            },
        );
        FarmService::new(provider, Arc::new(config), Arc::new(FixedLiquidity(owned)))
    }

    #[tokio::test]
    async fn load_queries_dex_farms() {
        let far_future = 4_000_000_000;
        let rpc = MockRpc::new(ChainDescriptor::dev()).with_objects(
            "0xabc::liquidity_incentive::FarmingAsset",
            vec![farm_state("f1", FARM_TYPE, far_future), farm_state("f0", FARM_TYPE, 1)],
        );
        let owned = vec![lp("0x1::a::X", "0x1::b::Y", 42)];
        let svc = service(rpc, Some("0xabc"), owned).await;

        let partition = svc.load("0xowner").await.unwrap();
        assert_eq!(partition.active.len(), 1);
        assert_eq!(partition.active[0].liquidity.as_ref().unwrap().balance, 42);
        assert_eq!(partition.expired.len(), 1);

        let pool = svc.pool_for(&partition.active[0]).await.unwrap();
        assert_eq!(pool.unwrap().balance, 42);
    }

    #[tokio::test]
    async fn load_requires_dex_address() {
        let svc = service(MockRpc::new(ChainDescriptor::dev()), None, vec![]).await;
        assert!(matches!(
            svc.load("0xowner").await,
            Err(TradeError::MissingDexAddress)
        ));
    }
}
