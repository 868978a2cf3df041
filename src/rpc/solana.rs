//! [`ChainRpc`] over the nonblocking Solana `RpcClient`.
//!
//! Only available with the `solana-rpc` feature.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;

use super::{ChainRpc, Commitment, ConfirmationStatus};
use crate::error::RpcError;
use crate::shared::CanonicalAddress;

/// Solana JSON-RPC network layer.
pub struct SolanaRpc {
    rpc_client: RpcClient,
}

impl SolanaRpc {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc_client: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
        }
    }

    /// Create from an existing `RpcClient`.
    pub fn from_rpc_client(rpc_client: RpcClient) -> Self {
        Self { rpc_client }
    }

    pub fn rpc_client(&self) -> &RpcClient {
        &self.rpc_client
    }
}

fn commitment_config(commitment: Commitment) -> CommitmentConfig {
    match commitment {
        Commitment::Processed => CommitmentConfig::processed(),
        Commitment::Confirmed => CommitmentConfig::confirmed(),
        Commitment::Finalized => CommitmentConfig::finalized(),
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn get_balance(&self, address: &CanonicalAddress) -> Result<u64, RpcError> {
        self.rpc_client
            .get_balance(address.as_pubkey())
            .await
            .map_err(|e| RpcError::Balance(e.to_string()))
    }

    async fn send_raw_transaction(&self, signed_tx: &[u8]) -> Result<Signature, RpcError> {
        // Legacy transactions deserialize as versioned ones.
        let tx: VersionedTransaction = bincode::deserialize(signed_tx)
            .map_err(|e| RpcError::InvalidTransaction(e.to_string()))?;
        self.rpc_client
            .send_transaction(&tx)
            .await
            .map_err(|e| RpcError::Submission(e.to_string()))
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<ConfirmationStatus, RpcError> {
        let status = self
            .rpc_client
            .get_signature_status_with_commitment(signature, commitment_config(commitment))
            .await
            .map_err(|e| RpcError::Confirmation(e.to_string()))?;

        Ok(match status {
            None => ConfirmationStatus::Pending,
            Some(Ok(())) => ConfirmationStatus::Confirmed,
            Some(Err(e)) => ConfirmationStatus::Failed {
                reason: e.to_string(),
            },
        })
    }
}
