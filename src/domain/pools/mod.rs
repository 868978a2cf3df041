//! Pool aggregator — Meteora DLMM pairs and dynamic AMM pools.

pub mod convert;
#[cfg(feature = "http")]
pub mod upstream;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{fan_out, Snapshot, SnapshotStore};
use super::{
    extract_transaction, ActionReceipt, AggregatedEntry, EntryKind, Protocol, SourceTag,
    UserPosition,
};
use crate::error::{AggregatorError, SdkError, WalletError};
use crate::shared::CanonicalAddress;
use crate::wallet::AuthorizationSession;

#[cfg(feature = "http")]
pub use upstream::HttpPoolBackend;

pub type PoolEntry = AggregatedEntry<PoolSource>;
pub type PoolPosition = UserPosition<PoolSource>;
pub type PoolSnapshot = Snapshot<PoolEntry, PoolPosition>;
pub type PoolReceipt = ActionReceipt<PoolSource, PoolAction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolSource {
    MeteoraDlmm,
    MeteoraDynamic,
}

impl PoolSource {
    pub const ALL: [PoolSource; 2] = [Self::MeteoraDlmm, Self::MeteoraDynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeteoraDlmm => "meteora-dlmm",
            Self::MeteoraDynamic => "meteora-dynamic",
        }
    }
}

impl SourceTag for PoolSource {
    fn protocol(&self) -> Protocol {
        Protocol::Meteora
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Liquidity
    }
}

impl fmt::Display for PoolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolAction {
    /// Add liquidity.
    Join,
    /// Remove liquidity.
    Leave,
}

impl fmt::Display for PoolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Join => "join",
            Self::Leave => "leave",
        })
    }
}

/// Upstream endpoint for a `(source, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRoute {
    pub source: PoolSource,
    pub action: PoolAction,
    pub operation: &'static str,
}

pub fn route(source: PoolSource, action: PoolAction) -> PoolRoute {
    let operation = match (source, action) {
        (PoolSource::MeteoraDlmm, PoolAction::Join) => "add-liquidity",
        (PoolSource::MeteoraDlmm, PoolAction::Leave) => "remove-liquidity",
        (PoolSource::MeteoraDynamic, PoolAction::Join) => "deposit",
        (PoolSource::MeteoraDynamic, PoolAction::Leave) => "withdraw",
    };
    PoolRoute {
        source,
        action,
        operation,
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolAmounts {
    Deposit { token_a: Decimal, token_b: Decimal },
    /// Fraction of the position to remove, in `(0, 1]`.
    Withdraw { share: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolActionRequest {
    pub owner: CanonicalAddress,
    pub pool_id: String,
    pub amounts: PoolAmounts,
}

/// Parameters for a new pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePoolParams {
    pub source: PoolSource,
    pub token_a_mint: CanonicalAddress,
    pub token_b_mint: CanonicalAddress,
    /// Required for DLMM pairs.
    pub bin_step: Option<u16>,
    pub fee_bps: Option<u16>,
    pub initial_price: Option<Decimal>,
    pub token_a_amount: Option<Decimal>,
    pub token_b_amount: Option<Decimal>,
}

impl CreatePoolParams {
    pub fn new(source: PoolSource, token_a_mint: CanonicalAddress, token_b_mint: CanonicalAddress) -> Self {
        Self {
            source,
            token_a_mint,
            token_b_mint,
            bin_step: None,
            fee_bps: None,
            initial_price: None,
            token_a_amount: None,
            token_b_amount: None,
        }
    }

    fn validate(&self) -> Result<(), SdkError> {
        if self.token_a_mint == self.token_b_mint {
            return Err(SdkError::Validation("pool tokens must differ".into()));
        }
        match self.source {
            PoolSource::MeteoraDlmm if self.bin_step.is_none() => {
                Err(SdkError::Validation("DLMM pairs require a bin step".into()))
            }
            PoolSource::MeteoraDlmm | PoolSource::MeteoraDynamic => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolCreation {
    pub source: PoolSource,
    pub owner: CanonicalAddress,
    pub response: Value,
}

impl PoolCreation {
    pub fn transaction(&self) -> Result<Option<Vec<u8>>, SdkError> {
        extract_transaction(&self.response)
    }
}

// ============================================================================
// Backend
// ============================================================================

#[async_trait]
pub trait PoolBackend: Send + Sync {
    async fn list(&self, source: PoolSource) -> Result<Vec<Value>, AggregatorError>;

    async fn positions(
        &self,
        source: PoolSource,
        owner: &CanonicalAddress,
    ) -> Result<Vec<Value>, AggregatorError>;

    async fn submit(
        &self,
        route: &PoolRoute,
        request: &PoolActionRequest,
    ) -> Result<Value, AggregatorError>;

    async fn create_pool(
        &self,
        owner: &CanonicalAddress,
        params: &CreatePoolParams,
    ) -> Result<Value, AggregatorError>;
}

// ============================================================================
// Aggregator
// ============================================================================

pub struct PoolAggregator {
    backend: Arc<dyn PoolBackend>,
    session: Option<Arc<AuthorizationSession>>,
    store: SnapshotStore<PoolEntry, PoolPosition>,
}

impl PoolAggregator {
    pub fn new(backend: Arc<dyn PoolBackend>) -> Self {
        Self {
            backend,
            session: None,
            store: SnapshotStore::new(),
        }
    }

    pub fn with_session(mut self, session: Arc<AuthorizationSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub async fn snapshot(&self) -> Arc<PoolSnapshot> {
        self.store.current().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.store.last_error().await
    }

    pub async fn refresh(&self) -> Result<Arc<PoolSnapshot>, SdkError> {
        let owner = self.owner().await;
        self.store.refresh_with("pools", self.fetch(owner)).await
    }

    /// Add liquidity to a listed pool.
    pub async fn join(
        &self,
        pool_id: &str,
        token_a: Decimal,
        token_b: Decimal,
    ) -> Result<PoolReceipt, SdkError> {
        let nothing = token_a.is_zero() && token_b.is_zero();
        if token_a < Decimal::ZERO || token_b < Decimal::ZERO || nothing {
            return Err(SdkError::Validation(
                "join needs a positive amount of at least one token".into(),
            ));
        }
        self.execute(PoolAction::Join, pool_id, PoolAmounts::Deposit { token_a, token_b })
            .await
    }

    /// Remove `share` (a fraction in `(0, 1]`) of the position in a pool.
    pub async fn leave(&self, pool_id: &str, share: Decimal) -> Result<PoolReceipt, SdkError> {
        if share <= Decimal::ZERO || share > Decimal::ONE {
            return Err(SdkError::Validation(format!(
                "leave share must be in (0, 1], got {share}"
            )));
        }
        self.execute(PoolAction::Leave, pool_id, PoolAmounts::Withdraw { share })
            .await
    }

    /// Create a pool on the venue named by `params.source`.
    pub async fn create_pool(&self, params: CreatePoolParams) -> Result<PoolCreation, SdkError> {
        params.validate()?;
        let owner = self.owner().await.ok_or(WalletError::NotConnected)?;

        tracing::info!(source = %params.source, "creating pool");
        let response = self.backend.create_pool(&owner, &params).await?;

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after pool creation failed");
        }

        Ok(PoolCreation {
            source: params.source,
            owner,
            response,
        })
    }

    async fn execute(
        &self,
        action: PoolAction,
        pool_id: &str,
        amounts: PoolAmounts,
    ) -> Result<PoolReceipt, SdkError> {
        let snapshot = self.store.current().await;
        let entry = snapshot.entry(pool_id)?;
        let route = route(entry.source, action);
        let owner = self.owner().await.ok_or(WalletError::NotConnected)?;

        let request = PoolActionRequest {
            owner,
            pool_id: entry.id.clone(),
            amounts,
        };
        tracing::info!(source = %route.source, %action, pool_id, "dispatching pool action");
        let response = self.backend.submit(&route, &request).await?;

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after {action} failed");
        }

        Ok(ActionReceipt {
            source: route.source,
            action,
            entry_id: request.pool_id,
            response,
        })
    }

    async fn owner(&self) -> Option<CanonicalAddress> {
        match &self.session {
            Some(session) => session.connected_address().await,
            None => None,
        }
    }

    async fn fetch(&self, owner: Option<CanonicalAddress>) -> Result<PoolSnapshot, SdkError> {
        let backend = self.backend.as_ref();

        let entries = fan_out(PoolSource::ALL, |source| async move {
            let records = backend.list(source).await?;
            Ok(convert::entries(source, records))
        });

        let positions = async {
            let Some(owner) = owner else {
                return Ok::<_, AggregatorError>(Vec::new());
            };
            fan_out(PoolSource::ALL, |source| async move {
                let records = backend.positions(source, &owner).await?;
                Ok(convert::positions(source, records))
            })
            .await
        };

        let (entries, positions) = futures_util::future::try_join(entries, positions).await?;
        Ok(Snapshot::new(entries, positions, owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_combination_routes() {
        let mut seen = std::collections::HashSet::new();
        for source in PoolSource::ALL {
            for action in [PoolAction::Join, PoolAction::Leave] {
                let r = route(source, action);
                assert_eq!(r.source, source);
                seen.insert((source, r.operation));
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_create_params_validation() {
        let a = CanonicalAddress::from_bytes([1; 32]);
        let b = CanonicalAddress::from_bytes([2; 32]);

        assert!(CreatePoolParams::new(PoolSource::MeteoraDynamic, a, a)
            .validate()
            .is_err());
        assert!(CreatePoolParams::new(PoolSource::MeteoraDlmm, a, b)
            .validate()
            .is_err());

        let mut dlmm = CreatePoolParams::new(PoolSource::MeteoraDlmm, a, b);
        dlmm.bin_step = Some(25);
        assert!(dlmm.validate().is_ok());
        assert!(CreatePoolParams::new(PoolSource::MeteoraDynamic, a, b)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_source_tags() {
        for source in PoolSource::ALL {
            assert_eq!(source.protocol(), Protocol::Meteora);
            assert_eq!(source.kind(), EntryKind::Liquidity);
        }
        assert_eq!(PoolSource::MeteoraDlmm.to_string(), "meteora-dlmm");
    }
}
