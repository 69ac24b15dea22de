pub mod farm;
pub mod liquidity;
pub mod types;

pub use farm::{FarmService, farming_asset_type, find_pool, parse_farm_type, resolve_farms};
pub use liquidity::{BalanceLiquiditySource, LiquiditySource, is_lp_token};
pub use types::{FarmPartition, FarmRecord, LpToken, TokenType, TradeError};
