use async_trait::async_trait;
use portal_chain::AccountAddress;
use portal_faucet::{SignError, WalletSigner};

/// A wallet known only by its addresses. Good for eligibility checks; it
/// cannot sign, so claims through it abort before reaching the faucet.
pub struct WatchOnlyWallet {
    bitcoin: String,
    rooch: AccountAddress,
}

impl WatchOnlyWallet {
    pub fn new(bitcoin: String, rooch: AccountAddress) -> Self {
        Self { bitcoin, rooch }
    }
}

#[async_trait]
impl WalletSigner for WatchOnlyWallet {
    fn bitcoin_address(&self) -> String {
        self.bitcoin.clone()
    }

    fn rooch_address(&self) -> AccountAddress {
        self.rooch
    }

    fn public_key(&self) -> Vec<u8> {
        Vec::new()
    }

    async fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, SignError> {
        Err(SignError("watch-only wallet cannot sign".into()))
    }
}
