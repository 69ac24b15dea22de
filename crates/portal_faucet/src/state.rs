use portal_core::Page;

use crate::error::ClaimBlocker;

/// What the faucet page shows for the connected wallet. Rebuilt on every
/// address change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaucetClaimState {
    pub loading: bool,
    pub error: Option<ClaimBlocker>,
    /// Formatted claimable amount, e.g. `"5.00"`.
    pub claimable_amount: Option<String>,
    pub claimable_raw: Option<u128>,
    pub utxo_ids: Option<Vec<String>>,
}

/// Result of pressing the claim button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Navigate instead of claiming.
    Redirect(Page),
    Claimed { gas: u128, formatted: String },
    /// The claim did not go through; the reason was already posted as a notice.
    Aborted,
}

impl FaucetClaimState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn is_already_claimed(&self) -> bool {
        self.error.is_some_and(|e| e.is_already_claimed())
    }

    /// The button is enabled when nothing blocks it, or when the wallet already
    /// claimed (it then links to the gas swap).
    pub fn can_claim(&self) -> bool {
        !self.loading && (self.error.is_none() || self.is_already_claimed())
    }

    pub fn action_label(&self) -> String {
        match &self.error {
            Some(e) if e.is_already_claimed() => "Purchase RGas".to_string(),
            Some(e) => e.to_string(),
            None => format!(
                "Claim: {} RGas",
                self.claimable_amount.as_deref().unwrap_or("0")
            ),
        }
    }

    /// Explanation shown above the button when blocked.
    pub fn status_message(&self) -> Option<&'static str> {
        match &self.error {
            None => None,
            Some(e) if e.is_already_claimed() => Some("You Already Claimed RGAS"),
            Some(_) => Some(
                "You cannot claim gas, Please make sure the current address has a valid utxo and try again",
            ),
        }
    }
}
