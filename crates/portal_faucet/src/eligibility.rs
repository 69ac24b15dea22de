use portal_chain::{
    AccountAddress, FunctionCall, MoveArg, ObjectId, RoochRpc, VmStatus,
};
use portal_core::{NetworkVariables, format_coin};
use tracing::debug;

use crate::error::{EligibilityError, FaucetError};

/// Fraction digits shown for claimable amounts.
pub const DISPLAY_PRECISION: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Claimable { raw: u128, amount: String },
    Ineligible(EligibilityError),
}

/// `{faucet_address}::gas_faucet::check_claim`
pub fn check_claim_function(faucet_address: &str) -> String {
    format!("{faucet_address}::gas_faucet::check_claim")
}

/// Ask the faucet contract how much `rooch_address` may claim against the
/// given UTXOs.
pub async fn fetch_eligibility(
    rpc: &dyn RoochRpc,
    vars: &NetworkVariables,
    rooch_address: AccountAddress,
    utxo_ids: &[String],
    decimals: u8,
) -> Result<Eligibility, FaucetError> {
    let faucet_address = vars
        .faucet_address
        .as_deref()
        .ok_or(FaucetError::MissingVariable("faucet_address"))?;
    let faucet_object = vars
        .faucet_object
        .as_deref()
        .ok_or(FaucetError::MissingVariable("faucet_object"))?;

    let utxos = utxo_ids
        .iter()
        .map(|id| id.parse::<ObjectId>())
        .collect::<Result<Vec<_>, _>>()?;
    let call = FunctionCall::new(
        check_claim_function(faucet_address),
        vec![
            MoveArg::ObjectId(faucet_object.parse()?),
            MoveArg::Address(rooch_address),
            MoveArg::ObjectIds(utxos),
        ],
    );

    let result = rpc.execute_view_function(call).await?;
    match result.vm_status {
        VmStatus::Executed => {
            let raw = result.first_u128().ok_or(FaucetError::MissingAmount)?;
            let amount = format_coin(raw, decimals, DISPLAY_PRECISION);
            debug!(%rooch_address, raw = %raw, %amount, "faucet claim available");
            Ok(Eligibility::Claimable { raw, amount })
        }
        VmStatus::MoveAbort { abort_code, .. } => {
            debug!(%rooch_address, abort_code, "faucet check aborted");
            Ok(Eligibility::Ineligible(EligibilityError::from_abort_code(
                abort_code,
            )))
        }
        VmStatus::Other(status) => Err(FaucetError::UnexpectedStatus(status)),
    }
}
