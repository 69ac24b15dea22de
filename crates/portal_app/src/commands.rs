use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use portal_chain::{AccountAddress, ChainDescriptor};
use portal_core::{Page, format_coin, keys};
use portal_faucet::{BalanceWatcher, FaucetFlow, HttpFaucetEndpoint};
use portal_trade::{BalanceLiquiditySource, FarmRecord, FarmService};
use tracing::info;

use crate::context::Portal;
use crate::wallet::WatchOnlyWallet;

#[derive(Subcommand)]
pub enum ChainsCommand {
    /// List built-in and custom chains
    List,
    /// Show the active chain
    Active,
    /// Add a custom chain and switch to it
    Add {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
    },
    /// Switch to a listed chain by hex chain id (e.g. 0x2)
    Switch { chain_id: String },
    /// Delete custom chains with this numeric id
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum FaucetCommand {
    /// Check how much RGas an address can claim
    Check {
        /// Bitcoin address owning the UTXOs
        #[arg(long)]
        bitcoin: String,
        /// Rooch address (hex) receiving the gas
        #[arg(long)]
        rooch: String,
    },
    /// Show, set or clear the stored inviter address
    Inviter {
        #[arg(long, conflicts_with = "clear")]
        set: Option<String>,
        #[arg(long)]
        clear: bool,
    },
}

pub fn routes(out: &mut dyn Write) -> Result<()> {
    for page in Page::ALL {
        let path = page.path();
        writeln!(out, "{:<14} {}", page.name(), if path.is_empty() { "/" } else { path.as_str() })?;
    }
    Ok(())
}

pub async fn chains(portal: &Portal, cmd: ChainsCommand, out: &mut dyn Write) -> Result<()> {
    let provider = &portal.provider;
    match cmd {
        ChainsCommand::List => {
            let active = provider.active_chain()?;
            for chain in provider.list_chains()? {
                let marker = if chain.same_endpoint(&active) { "*" } else { " " };
                writeln!(out, "{marker} {chain}")?;
            }
        }
        ChainsCommand::Active => writeln!(out, "{}", provider.active_chain()?)?,
        ChainsCommand::Add { id, name, url } => {
            let chain = ChainDescriptor::new(id, name, url);
            provider.add_chain(chain.clone()).await?;
            writeln!(out, "added and switched to {chain}")?;
        }
        ChainsCommand::Switch { chain_id } => {
            if provider.switch_chain_by_id(&chain_id).await? {
                writeln!(out, "switched to {}", provider.active_chain()?)?;
            } else {
                writeln!(out, "no change: {chain_id} is unknown or already active")?;
            }
        }
        ChainsCommand::Delete { id } => {
            let target = provider
                .custom_chains()?
                .into_iter()
                .find(|c| c.id == id)
                .with_context(|| format!("no custom chain with id {id}"))?;
            provider.delete_chain(&target).await?;
            writeln!(out, "deleted chain {id}; active: {}", provider.active_chain()?)?;
        }
    }
    Ok(())
}

pub async fn faucet(portal: &Portal, cmd: FaucetCommand, out: &mut dyn Write) -> Result<()> {
    let endpoint = Arc::new(
        HttpFaucetEndpoint::new(Duration::from_secs(portal.config.request_timeout_secs))?,
    );
    let flow = FaucetFlow::new(
        portal.provider.clone(),
        portal.config.clone(),
        portal.store.clone(),
        endpoint,
        portal.notices.clone(),
    );

    match cmd {
        FaucetCommand::Check { bitcoin, rooch } => {
            let rooch: AccountAddress = rooch.parse().context("Invalid rooch address")?;
            let wallet = WatchOnlyWallet::new(bitcoin, rooch);
            let state = flow.refresh(&wallet).await;

            for notice in portal.notices.drain_unread() {
                writeln!(out, "[{:?}] {}", notice.notification_type, notice.message)?;
            }
            if let Some(message) = state.status_message() {
                writeln!(out, "{message}")?;
            }
            let utxos = state.utxo_ids.as_ref().map_or(0, Vec::len);
            writeln!(out, "utxos: {utxos}")?;
            writeln!(out, "{}", state.action_label())?;
        }
        FaucetCommand::Inviter { set, clear } => {
            if clear {
                portal.store.remove(keys::INVITER_ADDRESS)?;
                writeln!(out, "inviter cleared")?;
            } else if let Some(inviter) = set {
                flow.remember_inviter(&inviter)?;
                writeln!(out, "inviter set to {inviter}")?;
            } else {
                match flow.stored_inviter() {
                    Some(inviter) => writeln!(out, "{inviter}")?,
                    None => writeln!(out, "no inviter stored")?,
                }
            }
        }
    }
    Ok(())
}

fn farm_line(farm: &FarmRecord) -> String {
    let lp = farm
        .liquidity
        .as_ref()
        .map(|l| format_coin(l.balance, l.decimals, 4))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}-{}  release/s {}  staked {}  ends {}  my LP {}",
        farm.x.name, farm.y.name, farm.release_per_second, farm.asset_total_weight, farm.end_time, lp
    )
}

pub async fn farms(portal: &Portal, owner: &str, out: &mut dyn Write) -> Result<()> {
    let liquidity = Arc::new(BalanceLiquiditySource::new(
        portal.provider.clone(),
        portal.config.clone(),
    ));
    let service = FarmService::new(portal.provider.clone(), portal.config.clone(), liquidity);
    let partition = service.load(owner).await?;

    writeln!(out, "Active")?;
    if partition.active.is_empty() {
        writeln!(out, "  No Farms Found")?;
    }
    for farm in &partition.active {
        writeln!(out, "  {}", farm_line(farm))?;
    }
    writeln!(out, "Finished")?;
    if partition.expired.is_empty() {
        writeln!(out, "  No Farms Found")?;
    }
    for farm in &partition.expired {
        writeln!(out, "  {}", farm_line(farm))?;
    }
    Ok(())
}

pub async fn balance(portal: &Portal, owner: &str, watch: bool, out: &mut dyn Write) -> Result<()> {
    let interval = Duration::from_secs(portal.config.balance_poll_secs.max(1));
    let watcher = BalanceWatcher::spawn(
        portal.provider.clone(),
        owner.to_string(),
        portal.config.gas_coin_type.clone(),
        interval,
    );
    let mut updates = watcher.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    bail!("balance watcher stopped");
                }
            }
            _ = tokio::signal::ctrl_c(), if watch => {
                info!("interrupted");
                return Ok(());
            }
        }
        if let Some(info) = watcher.latest() {
            writeln!(
                out,
                "{} {}",
                format_coin(info.balance, info.decimals, 2),
                info.symbol
            )?;
            out.flush()?;
        }
        if !watch {
            return Ok(());
        }
    }
}
