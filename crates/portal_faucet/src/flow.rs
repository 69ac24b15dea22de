//! Eligibility refresh and invite-based claim for the connected wallet.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use portal_chain::{
    ChainEvent, ChainProvider, ObjectStateFilter, PageQuery, RoochRpc, UtxoFilter,
};
use portal_core::{
    GenerationTicket, KeyValueStore, NetworkVariables, NotificationCenter, Page, PortalConfig,
    RequestGeneration, format_coin, keys,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::balance::BalanceWatcher;
use crate::eligibility::{DISPLAY_PRECISION, Eligibility, fetch_eligibility};
use crate::endpoint::{EndpointError, FaucetEndpoint, InviterClaimRequest};
use crate::error::{ClaimBlocker, FaucetError};
use crate::state::{ClaimOutcome, FaucetClaimState};
use crate::wallet::WalletSigner;

const NETWORK_NOT_OK: &str = "Network response was not ok";
const STILL_CHECKING: &str = "Still checking eligibility, try again shortly";

/// A response may land only if no newer request started and the chain it was
/// issued against is still bound.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    request: GenerationTicket,
    chain: u64,
}

pub struct FaucetFlow {
    provider: Arc<ChainProvider>,
    config: Arc<PortalConfig>,
    store: Arc<dyn KeyValueStore>,
    endpoint: Arc<dyn FaucetEndpoint>,
    notices: NotificationCenter,
    generation: RequestGeneration,
    state: RwLock<FaucetClaimState>,
    balance: RwLock<Option<Arc<BalanceWatcher>>>,
    chain_events: Mutex<broadcast::Receiver<ChainEvent>>,
}

impl FaucetFlow {
    pub fn new(
        provider: Arc<ChainProvider>,
        config: Arc<PortalConfig>,
        store: Arc<dyn KeyValueStore>,
        endpoint: Arc<dyn FaucetEndpoint>,
        notices: NotificationCenter,
    ) -> Self {
        let chain_events = Mutex::new(provider.subscribe());
        Self {
            provider,
            config,
            store,
            endpoint,
            notices,
            generation: RequestGeneration::new(),
            state: RwLock::new(FaucetClaimState::default()),
            balance: RwLock::new(None),
            chain_events,
        }
    }

    pub fn state(&self) -> FaucetClaimState {
        self.sync_chain();
        self.state.read().clone()
    }

    /// Balance watcher to nudge after a successful claim.
    pub fn attach_balance_watcher(&self, watcher: Arc<BalanceWatcher>) {
        *self.balance.write() = Some(watcher);
    }

    /// Inviter captured from an invite link, if any.
    pub fn stored_inviter(&self) -> Option<String> {
        match self.store.get(keys::INVITER_ADDRESS) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, "could not read inviter address");
                None
            }
        }
    }

    pub fn remember_inviter(&self, inviter: &str) -> Result<(), FaucetError> {
        Ok(self.store.set(keys::INVITER_ADDRESS, inviter)?)
    }

    fn rpc(&self) -> Result<Arc<dyn RoochRpc>, FaucetError> {
        self.provider.client().ok_or(FaucetError::NotReady)
    }

    fn network(&self) -> Result<NetworkVariables, FaucetError> {
        Ok(self.provider.active_chain()?.network_variables(&self.config))
    }

    /// Drain chain events. Any change of chain invalidates in-flight requests
    /// and resets the claim state, since it described the previous chain.
    fn sync_chain(&self) {
        let mut events = self.chain_events.lock();
        let mut changed = false;
        loop {
            match events.try_recv() {
                Ok(ChainEvent::Changed { .. }) | Err(TryRecvError::Lagged(_)) => changed = true,
                Ok(ChainEvent::Closed) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        drop(events);
        if changed {
            self.generation.advance();
            *self.state.write() = FaucetClaimState::default();
            debug!(chain_generation = self.provider.generation(), "chain changed, faucet state reset");
        }
    }

    fn ticket(&self, request: GenerationTicket) -> Ticket {
        Ticket {
            request,
            chain: self.provider.generation(),
        }
    }

    /// Write `state` unless a newer request started or the chain changed
    /// since `ticket` was taken.
    fn apply(&self, ticket: Ticket, update: impl FnOnce(&mut FaucetClaimState)) -> bool {
        self.sync_chain();
        if !self.generation.is_current(ticket.request) || self.provider.generation() != ticket.chain {
            debug!(ticket = ticket.request.value(), "discarding stale faucet response");
            return false;
        }
        update(&mut self.state.write());
        true
    }

    /// Recompute eligibility for `wallet`. Call whenever the connected address
    /// or the active chain changes. Failures become notices.
    pub async fn refresh(&self, wallet: &dyn WalletSigner) -> FaucetClaimState {
        self.sync_chain();
        let ticket = self.ticket(self.generation.advance());
        *self.state.write() = FaucetClaimState::loading();

        let result = self.check(wallet).await;
        self.apply(ticket, |state| {
            state.loading = false;
            match result {
                Ok((utxo_ids, eligibility)) => {
                    state.utxo_ids = Some(utxo_ids);
                    match eligibility {
                        Some(Eligibility::Claimable { raw, amount }) => {
                            state.claimable_raw = Some(raw);
                            state.claimable_amount = Some(amount);
                        }
                        Some(Eligibility::Ineligible(e)) => state.error = Some(e.into()),
                        None => state.error = Some(ClaimBlocker::NoUtxo),
                    }
                }
                Err(e) => self.notices.error(format!("faucet error: {e}")),
            }
        });
        self.state()
    }

    /// UTXO ids owned by the wallet and, when there are any, the contract's
    /// verdict on them.
    async fn check(
        &self,
        wallet: &dyn WalletSigner,
    ) -> Result<(Vec<String>, Option<Eligibility>), FaucetError> {
        let rpc = self.rpc()?;
        let vars = self.network()?;
        let owner = wallet.bitcoin_address();

        let page = rpc
            .query_utxos(
                UtxoFilter::Owner(owner.clone()),
                PageQuery::first(self.config.utxo_page_limit),
            )
            .await?;
        let utxo_ids: Vec<String> = page.data.into_iter().map(|u| u.id).collect();
        debug!(%owner, utxos = utxo_ids.len(), "queried utxos");
        if utxo_ids.is_empty() {
            return Ok((utxo_ids, None));
        }

        let eligibility = fetch_eligibility(
            rpc.as_ref(),
            &vars,
            wallet.rooch_address(),
            &utxo_ids,
            self.config.faucet_decimals,
        )
        .await?;
        Ok((utxo_ids, Some(eligibility)))
    }

    /// Press the claim button on behalf of `wallet`, crediting `inviter`.
    /// Nothing is signed or posted while a blocker is set or a check is
    /// still running.
    pub async fn claim(&self, wallet: &dyn WalletSigner, inviter: &str) -> ClaimOutcome {
        let state = self.state();
        if state.is_already_claimed() {
            return ClaimOutcome::Redirect(Page::GasSwap);
        }
        if !state.can_claim() {
            match state.error {
                Some(blocker) => self.notices.warning(blocker.to_string()),
                None => self.notices.warning(STILL_CHECKING),
            }
            return ClaimOutcome::Aborted;
        }

        let ticket = self.ticket(self.generation.current());
        self.state.write().loading = true;
        let outcome = self.submit_claim(wallet, inviter, ticket).await;
        self.apply(ticket, |state| state.loading = false);
        outcome
    }

    async fn submit_claim(
        &self,
        wallet: &dyn WalletSigner,
        inviter: &str,
        ticket: Ticket,
    ) -> ClaimOutcome {
        if inviter.is_empty() {
            self.notices.warning("No inviter address");
            return ClaimOutcome::Aborted;
        }

        let (rpc, vars) = match self.rpc().and_then(|rpc| Ok((rpc, self.network()?))) {
            Ok(pair) => pair,
            Err(e) => {
                self.notices.error(format!("faucet error: {e}"));
                return ClaimOutcome::Aborted;
            }
        };

        match self.invitation_open(rpc.as_ref(), &vars).await {
            Ok(true) => {}
            Ok(false) => return ClaimOutcome::Redirect(Page::Faucet),
            Err(e) => {
                self.notices.error(format!("faucet error: {e}"));
                return ClaimOutcome::Aborted;
            }
        }
        let Some(faucet_url) = vars.faucet_url.as_deref() else {
            self.notices
                .error(format!("faucet error: {}", FaucetError::MissingVariable("faucet_url")));
            return ClaimOutcome::Aborted;
        };

        let message = self.config.claim_message.clone();
        let signature = match wallet.sign(message.as_bytes()).await {
            Ok(sig) => sig,
            Err(e) => {
                self.notices.error(e.to_string());
                return ClaimOutcome::Aborted;
            }
        };

        let request = InviterClaimRequest {
            claimer: wallet.bitcoin_address(),
            inviter: inviter.to_string(),
            claimer_sign: hex::encode(signature),
            public_key: hex::encode(wallet.public_key()),
            message,
        };
        let response = match self.endpoint.claim_with_inviter(faucet_url, &request).await {
            Ok(resp) => resp,
            Err(e) if e.is_utxo_value_zero() => {
                let blocker = ClaimBlocker::ClaimRejected;
                self.apply(ticket, |state| state.error = Some(blocker));
                self.notices.error(blocker.to_string());
                return ClaimOutcome::Aborted;
            }
            Err(EndpointError::Status { .. }) => {
                self.notices.error(NETWORK_NOT_OK);
                return ClaimOutcome::Aborted;
            }
            Err(e) => {
                self.notices.error(e.to_string());
                return ClaimOutcome::Aborted;
            }
        };

        if let Err(e) = self.store.set(keys::INVITER_ADDRESS, "") {
            warn!(error = %e, "could not clear inviter address");
        }

        let decimals = self.gas_decimals(rpc.as_ref(), wallet).await;
        let formatted = format_coin(response.gas, decimals, DISPLAY_PRECISION);
        info!(claimer = %request.claimer, gas = %response.gas, "faucet claim succeeded");
        self.notices
            .success(format!("Faucet Success! RGas: {formatted}"));
        ClaimOutcome::Claimed {
            gas: response.gas,
            formatted,
        }
    }

    /// Whether the inviter's `InvitationConf` object reports `is_open`.
    /// A missing or undecodable config counts as closed.
    async fn invitation_open(
        &self,
        rpc: &dyn RoochRpc,
        vars: &NetworkVariables,
    ) -> Result<bool, FaucetError> {
        let Some(conf_type) = vars.invitation_conf_type() else {
            warn!("invitation config type is not configured");
            return Ok(false);
        };
        let page = rpc
            .query_object_states(ObjectStateFilter::ObjectType(conf_type.clone()), PageQuery::default())
            .await?;
        let open = page
            .data
            .first()
            .and_then(|conf| conf.bool_field("is_open"))
            .unwrap_or(false);
        debug!(%conf_type, open, "invitation config");
        Ok(open)
    }

    /// Refresh the balance and take its decimals for formatting the reward.
    async fn gas_decimals(&self, rpc: &dyn RoochRpc, wallet: &dyn WalletSigner) -> u8 {
        if let Some(watcher) = self.balance.read().clone() {
            watcher.refresh();
        }
        let owner = wallet.rooch_address().to_hex_literal();
        match rpc.get_balance(&owner, &self.config.gas_coin_type).await {
            Ok(info) => info.decimals,
            Err(e) => {
                warn!(error = %e, "balance refresh failed after claim");
                self.config.faucet_decimals
            }
        }
    }
}
