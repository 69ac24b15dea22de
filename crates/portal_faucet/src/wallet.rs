use async_trait::async_trait;
use portal_chain::AccountAddress;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SignError(pub String);

/// The connected wallet: its addresses, public key and message signing.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Bitcoin address owning the UTXOs checked for eligibility.
    fn bitcoin_address(&self) -> String;

    /// Rooch account derived from the bitcoin key.
    fn rooch_address(&self) -> AccountAddress;

    fn public_key(&self) -> Vec<u8>;

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignError>;
}
