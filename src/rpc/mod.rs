//! Network layer — balance queries, raw transaction submission, confirmation.
//!
//! The wallet session and facade only see the [`ChainRpc`] trait, so the
//! Solana RPC client (feature `solana-rpc`) can be swapped for any other
//! transport, or for an in-memory fake in tests.

#[cfg(feature = "solana-rpc")]
pub mod solana;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_signature::Signature;

use crate::error::RpcError;
use crate::shared::CanonicalAddress;

#[cfg(feature = "solana-rpc")]
pub use solana::SolanaRpc;

/// Commitment level used when confirming a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a confirmation query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Not yet seen at the requested commitment.
    Pending,
    /// Landed at the requested commitment without error.
    Confirmed,
    /// Landed but the transaction failed.
    Failed { reason: String },
}

impl ConfirmationStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// The chain operations the wallet needs.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Balance in lamports.
    async fn get_balance(&self, address: &CanonicalAddress) -> Result<u64, RpcError>;

    /// Submit a fully signed, serialized transaction. Returns its signature.
    async fn send_raw_transaction(&self, signed_tx: &[u8]) -> Result<Signature, RpcError>;

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<ConfirmationStatus, RpcError>;
}
