use portal_chain::{MoveTypeError, ProviderError, RpcError};
use portal_core::StorageError;

/// Reason the faucet's eligibility check refused a wallet, keyed by the Move
/// abort code of `gas_faucet::check_claim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EligibilityError {
    #[error("Faucet Not Open")]
    FaucetNotOpen,
    #[error("Invalid UTXO")]
    InvalidUtxo,
    #[error("Faucet Not enough RGas")]
    InsufficientFaucetBalance,
    #[error("Already Claimed")]
    AlreadyClaimed,
    #[error("UTXO Value Is Zero")]
    UtxoValueZero,
    #[error("Unknown eligibility error (abort code {0})")]
    Unknown(u64),
}

impl EligibilityError {
    pub fn from_abort_code(code: u64) -> Self {
        match code {
            1 => Self::FaucetNotOpen,
            2 => Self::InvalidUtxo,
            3 => Self::InsufficientFaucetBalance,
            4 => Self::AlreadyClaimed,
            5 => Self::UtxoValueZero,
            other => Self::Unknown(other),
        }
    }

    pub fn abort_code(&self) -> u64 {
        match self {
            Self::FaucetNotOpen => 1,
            Self::InvalidUtxo => 2,
            Self::InsufficientFaucetBalance => 3,
            Self::AlreadyClaimed => 4,
            Self::UtxoValueZero => 5,
            Self::Unknown(code) => *code,
        }
    }
}

/// Anything that keeps the claim button from submitting a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClaimBlocker {
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error("Not found utxo")]
    NoUtxo,
    /// The faucet service answered 500 "UTXO value is zero".
    #[error("Claim failed, Not found UTXO")]
    ClaimRejected,
}

impl ClaimBlocker {
    pub fn is_already_claimed(&self) -> bool {
        matches!(self, Self::Eligibility(EligibilityError::AlreadyClaimed))
    }
}

/// Failures talking to the chain while preparing a claim.
#[derive(Debug, thiserror::Error)]
pub enum FaucetError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Chain client is not ready")]
    NotReady,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Argument(#[from] MoveTypeError),

    #[error("Network variable {0} is not configured for this chain")]
    MissingVariable(&'static str),

    #[error("Unexpected VM status: {0}")]
    UnexpectedStatus(String),

    #[error("Eligibility check returned no amount")]
    MissingAmount,
}
