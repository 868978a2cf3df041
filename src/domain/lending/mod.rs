//! Lending aggregator — Kamino (lend, vaults, liquidity) and MarginFi
//! (banks, markets) behind one refresh-replace snapshot.
//!
//! Actions are dispatched through [`route`], an exhaustive
//! `(source, action)` match. Combinations without an upstream endpoint are
//! rejected before any request is made.

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
use super::{ActionReceipt, AggregatedEntry, EntryKind, Protocol, SourceTag, UserPosition};
use crate::error::{AggregatorError, SdkError, WalletError};
use crate::shared::CanonicalAddress;
use crate::wallet::AuthorizationSession;

#[cfg(feature = "http")]
pub use upstream::HttpLendingBackend;

pub type LendingEntry = AggregatedEntry<LendingSource>;
pub type LendingPosition = UserPosition<LendingSource>;
pub type LendingSnapshot = Snapshot<LendingEntry, LendingPosition>;
pub type LendingReceipt = ActionReceipt<LendingSource, LendingAction>;

// ============================================================================
// Sources and actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LendingSource {
    KaminoLend,
    KaminoVault,
    KaminoLiquidity,
    #[serde(rename = "marginfi-bank")]
    MarginFiBank,
    #[serde(rename = "marginfi-market")]
    MarginFiMarket,
}

impl LendingSource {
    pub const ALL: [LendingSource; 5] = [
        Self::KaminoLend,
        Self::KaminoVault,
        Self::KaminoLiquidity,
        Self::MarginFiBank,
        Self::MarginFiMarket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KaminoLend => "kamino-lend",
            Self::KaminoVault => "kamino-vault",
            Self::KaminoLiquidity => "kamino-liquidity",
            Self::MarginFiBank => "marginfi-bank",
            Self::MarginFiMarket => "marginfi-market",
        }
    }
}

impl SourceTag for LendingSource {
    fn protocol(&self) -> Protocol {
        match self {
            Self::KaminoLend | Self::KaminoVault | Self::KaminoLiquidity => Protocol::Kamino,
            Self::MarginFiBank | Self::MarginFiMarket => Protocol::MarginFi,
        }
    }

    fn kind(&self) -> EntryKind {
        match self {
            Self::KaminoLend => EntryKind::Lend,
            Self::KaminoVault => EntryKind::Vault,
            Self::KaminoLiquidity => EntryKind::Liquidity,
            Self::MarginFiBank => EntryKind::Bank,
            Self::MarginFiMarket => EntryKind::Market,
        }
    }
}

impl fmt::Display for LendingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingAction {
    Supply,
    Borrow,
    Withdraw,
    Repay,
}

impl LendingAction {
    pub const ALL: [LendingAction; 4] = [Self::Supply, Self::Borrow, Self::Withdraw, Self::Repay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supply => "supply",
            Self::Borrow => "borrow",
            Self::Withdraw => "withdraw",
            Self::Repay => "repay",
        }
    }
}

impl fmt::Display for LendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protocols with per-wallet position endpoints.
pub const POSITION_PROTOCOLS: [Protocol; 2] = [Protocol::Kamino, Protocol::MarginFi];

// ============================================================================
// Routing
// ============================================================================

/// Upstream endpoint for a supported `(source, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRoute {
    pub source: LendingSource,
    pub action: LendingAction,
    /// Upstream verb, e.g. `deposit` for [`LendingAction::Supply`].
    pub operation: &'static str,
}

/// Resolve the endpoint for `action` on an entry from `source`.
///
/// Vaults and liquidity strategies only take deposits and withdrawals.
pub fn route(source: LendingSource, action: LendingAction) -> Result<ActionRoute, AggregatorError> {
    use LendingAction::*;
    use LendingSource::*;

    let operation = match (source, action) {
        (KaminoLend, Supply) => "deposit",
        (KaminoLend, Borrow) => "borrow",
        (KaminoLend, Withdraw) => "withdraw",
        (KaminoLend, Repay) => "repay",

        (KaminoVault, Supply) => "deposit",
        (KaminoVault, Withdraw) => "withdraw",
        (KaminoVault, Borrow | Repay) => return Err(unsupported(source, action)),

        (KaminoLiquidity, Supply) => "deposit",
        (KaminoLiquidity, Withdraw) => "withdraw",
        (KaminoLiquidity, Borrow | Repay) => return Err(unsupported(source, action)),

        (MarginFiBank | MarginFiMarket, Supply) => "deposit",
        (MarginFiBank | MarginFiMarket, Borrow) => "borrow",
        (MarginFiBank | MarginFiMarket, Withdraw) => "withdraw",
        (MarginFiBank | MarginFiMarket, Repay) => "repay",
    };

    Ok(ActionRoute {
        source,
        action,
        operation,
    })
}

fn unsupported(source: LendingSource, action: LendingAction) -> AggregatorError {
    AggregatorError::UnsupportedAction {
        source_tag: source.to_string(),
        action: action.to_string(),
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Parameters forwarded to the upstream transaction builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub owner: CanonicalAddress,
    pub entry_id: String,
    pub mint: Option<String>,
    pub amount: Decimal,
}

/// Upstream access for the lending aggregator.
///
/// Listings and positions are returned as raw records; tagging and
/// conversion happen in the aggregator.
#[async_trait]
pub trait LendingBackend: Send + Sync {
    async fn list(&self, source: LendingSource) -> Result<Vec<Value>, AggregatorError>;

    async fn positions(
        &self,
        protocol: Protocol,
        owner: &CanonicalAddress,
    ) -> Result<Vec<Value>, AggregatorError>;

    async fn submit(
        &self,
        route: &ActionRoute,
        request: &ActionRequest,
    ) -> Result<Value, AggregatorError>;
}

// ============================================================================
// Aggregator
// ============================================================================

pub struct LendingAggregator {
    backend: Arc<dyn LendingBackend>,
    session: Option<Arc<AuthorizationSession>>,
    store: SnapshotStore<LendingEntry, LendingPosition>,
}

impl LendingAggregator {
    pub fn new(backend: Arc<dyn LendingBackend>) -> Self {
        Self {
            backend,
            session: None,
            store: SnapshotStore::new(),
        }
    }

    /// Fetch positions for this session's wallet whenever it is connected.
    pub fn with_session(mut self, session: Arc<AuthorizationSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub async fn snapshot(&self) -> Arc<LendingSnapshot> {
        self.store.current().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.store.last_error().await
    }

    /// Refetch every source (and positions, when connected) and publish a
    /// new snapshot. Any upstream failure keeps the previous snapshot.
    pub async fn refresh(&self) -> Result<Arc<LendingSnapshot>, SdkError> {
        let owner = self.owner().await;
        self.store.refresh_with("lending", self.fetch(owner)).await
    }

    pub async fn supply(&self, entry_id: &str, amount: Decimal) -> Result<LendingReceipt, SdkError> {
        self.execute(LendingAction::Supply, entry_id, amount).await
    }

    pub async fn borrow(&self, entry_id: &str, amount: Decimal) -> Result<LendingReceipt, SdkError> {
        self.execute(LendingAction::Borrow, entry_id, amount).await
    }

    pub async fn withdraw(&self, entry_id: &str, amount: Decimal) -> Result<LendingReceipt, SdkError> {
        self.execute(LendingAction::Withdraw, entry_id, amount).await
    }

    pub async fn repay(&self, entry_id: &str, amount: Decimal) -> Result<LendingReceipt, SdkError> {
        self.execute(LendingAction::Repay, entry_id, amount).await
    }

    /// Dispatch `action` against an entry of the current snapshot, then
    /// refresh. A failed post-action refresh is flagged, not returned.
    ///
    /// An id listed by several sources fails with
    /// [`AggregatorError::AmbiguousEntry`]; see [`execute_from`](Self::execute_from).
    pub async fn execute(
        &self,
        action: LendingAction,
        entry_id: &str,
        amount: Decimal,
    ) -> Result<LendingReceipt, SdkError> {
        self.dispatch(action, None, entry_id, amount).await
    }

    /// [`execute`](Self::execute) against the entry `source` lists under `entry_id`.
    pub async fn execute_from(
        &self,
        source: LendingSource,
        action: LendingAction,
        entry_id: &str,
        amount: Decimal,
    ) -> Result<LendingReceipt, SdkError> {
        self.dispatch(action, Some(source), entry_id, amount).await
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn dispatch(
        &self,
        action: LendingAction,
        source: Option<LendingSource>,
        entry_id: &str,
        amount: Decimal,
    ) -> Result<LendingReceipt, SdkError> {
        if amount <= Decimal::ZERO {
            return Err(SdkError::Validation(format!(
                "{action} amount must be positive, got {amount}"
            )));
        }

        let snapshot = self.store.current().await;
        let entry = match source {
            Some(source) => snapshot
                .entry_from(source, entry_id)
                .ok_or_else(|| AggregatorError::EntryNotFound(entry_id.to_string()))?,
            None => snapshot.entry(entry_id)?,
        };
        let route = route(entry.source, action)?;
        let owner = self.owner().await.ok_or(WalletError::NotConnected)?;

        let request = ActionRequest {
            owner,
            entry_id: entry.id.clone(),
            mint: convert_mint(&entry.raw),
            amount,
        };
        tracing::info!(
            source = %route.source,
            action = %route.action,
            entry_id,
            "dispatching lending action"
        );
        let response = self.backend.submit(&route, &request).await?;

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after {action} failed");
        }

        Ok(ActionReceipt {
            source: route.source,
            action,
            entry_id: request.entry_id,
            response,
        })
    }

    async fn owner(&self) -> Option<CanonicalAddress> {
        match &self.session {
            Some(session) => session.connected_address().await,
            None => None,
        }
    }

    async fn fetch(&self, owner: Option<CanonicalAddress>) -> Result<LendingSnapshot, SdkError> {
        let backend = self.backend.as_ref();

        let entries = fan_out(LendingSource::ALL, |source| async move {
            let records = backend.list(source).await?;
            Ok(convert::entries(source, records))
        });

        let positions = async {
            let Some(owner) = owner else {
                return Ok::<_, AggregatorError>(Vec::new());
            };
            fan_out(POSITION_PROTOCOLS, |protocol| async move {
                let records = backend.positions(protocol, &owner).await?;
                Ok(convert::positions(protocol, records))
            })
            .await
        };

        let (entries, positions) = futures_util::future::try_join(entries, positions).await?;
        Ok(Snapshot::new(entries, positions, owner))
    }
}

fn convert_mint(raw: &Value) -> Option<String> {
    crate::shared::json::str_field(
        raw,
        &["liquidityTokenMint", "mint", "tokenMint", "tokenAMint"],
    )
    .or_else(|| {
        crate::shared::json::path(raw, "state.tokenMint")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}
