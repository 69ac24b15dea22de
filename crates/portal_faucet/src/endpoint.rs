//! The faucet service's invite-claim HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Body of `POST {faucet_url}/faucet-inviter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviterClaimRequest {
    /// Claimer's bitcoin address.
    pub claimer: String,
    pub inviter: String,
    /// Hex signature over `message`.
    pub claimer_sign: String,
    /// Hex public key of the claimer.
    pub public_key: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClaimResponse {
    #[serde(default, deserialize_with = "gas_amount")]
    pub gas: u128,
}

fn gas_amount<'de, D: serde::Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().map(u128::from).unwrap_or(0),
        serde_json::Value::String(s) => portal_core::parse_amount(&s).unwrap_or(0),
        _ => 0,
    })
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("Faucet returned {status}: {error}")]
    Status { status: u16, error: String },

    #[error("faucet error: {0}")]
    Transport(String),

    #[error("faucet error: malformed response: {0}")]
    Decode(String),
}

impl EndpointError {
    /// The faucet found no UTXO value to reward.
    pub fn is_utxo_value_zero(&self) -> bool {
        matches!(self, Self::Status { status: 500, error } if error.contains("UTXO value is zero"))
    }
}

#[async_trait]
pub trait FaucetEndpoint: Send + Sync {
    async fn claim_with_inviter(
        &self,
        faucet_url: &str,
        request: &InviterClaimRequest,
    ) -> Result<ClaimResponse, EndpointError>;
}

pub struct HttpFaucetEndpoint {
    client: reqwest::Client,
}

impl HttpFaucetEndpoint {
    pub fn new(timeout: Duration) -> Result<Self, EndpointError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EndpointError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FaucetEndpoint for HttpFaucetEndpoint {
    async fn claim_with_inviter(
        &self,
        faucet_url: &str,
        request: &InviterClaimRequest,
    ) -> Result<ClaimResponse, EndpointError> {
        let url = format!("{}/faucet-inviter", faucet_url.trim_end_matches('/'));
        debug!(%url, claimer = %request.claimer, inviter = %request.inviter, "posting invite claim");

        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            // Error bodies are `{ "error": "..." }`; anything else keeps an empty message.
            let error = resp
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_default();
            warn!(status = status.as_u16(), %error, "faucet rejected claim");
            return Err(EndpointError::Status {
                status: status.as_u16(),
                error,
            });
        }

        resp.json()
            .await
            .map_err(|e| EndpointError::Decode(e.to_string()))
    }
}
