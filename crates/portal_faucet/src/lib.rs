//! Gas faucet: eligibility over the wallet's UTXOs and invite-based claims.

pub mod balance;
pub mod eligibility;
pub mod endpoint;
pub mod error;
pub mod flow;
pub mod state;
pub mod wallet;

pub use balance::BalanceWatcher;
pub use eligibility::{Eligibility, check_claim_function, fetch_eligibility};
pub use endpoint::{
    ClaimResponse, EndpointError, FaucetEndpoint, HttpFaucetEndpoint, InviterClaimRequest,
};
pub use error::{ClaimBlocker, EligibilityError, FaucetError};
pub use flow::FaucetFlow;
pub use state::{ClaimOutcome, FaucetClaimState};
pub use wallet::{SignError, WalletSigner};
