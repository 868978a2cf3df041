//! Market-data aggregator — prices from DexScreener and safety reports from
//! RugCheck for a watch list of mints, merged by mint.
//!
//! Safety scores are the upstream's normalized score, or `None` when the
//! upstream does not provide one.

pub mod convert;
#[cfg(feature = "http")]
pub mod upstream;

use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{fan_out, Snapshot, SnapshotStore};
use crate::error::{AggregatorError, SdkError};
use crate::shared::CanonicalAddress;

#[cfg(feature = "http")]
pub use upstream::HttpMarketDataBackend;

/// Market data carries no per-wallet positions.
pub type MarketSnapshot = Snapshot<TokenOverview, ()>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenOverview {
    pub mint: CanonicalAddress,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price_usd: Option<Decimal>,
    pub liquidity_usd: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub price_change_24h: Option<Decimal>,
    /// Pair the price was taken from (the deepest one).
    pub pair_address: Option<String>,
    pub dex: Option<String>,
    pub safety: Option<SafetyReport>,
}

impl TokenOverview {
    fn unlisted(mint: CanonicalAddress) -> Self {
        Self {
            mint,
            symbol: None,
            name: None,
            price_usd: None,
            liquidity_usd: None,
            volume_24h: None,
            price_change_24h: None,
            pair_address: None,
            dex: None,
            safety: None,
        }
    }
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Unknown,
    Good,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyRisk {
    pub name: String,
    pub description: Option<String>,
    pub level: RiskLevel,
    pub score: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyReport {
    pub score: Option<Decimal>,
    pub risk_level: RiskLevel,
    pub risks: Vec<SafetyRisk>,
}

// ============================================================================
// Backend
// ============================================================================

#[async_trait]
pub trait MarketDataBackend: Send + Sync {
    /// Trading pairs whose base token is one of `mints`.
    async fn token_pairs(&self, mints: &[CanonicalAddress]) -> Result<Vec<Value>, AggregatorError>;

    async fn safety_report(&self, mint: &CanonicalAddress) -> Result<Value, AggregatorError>;

    /// Free-text pair search.
    async fn search(&self, query: &str) -> Result<Vec<Value>, AggregatorError>;
}

// ============================================================================
// Aggregator
// ============================================================================

pub struct MarketDataAggregator {
    backend: Arc<dyn MarketDataBackend>,
    watch_list: RwLock<Vec<CanonicalAddress>>,
    store: SnapshotStore<TokenOverview, ()>,
}

impl MarketDataAggregator {
    pub fn new(backend: Arc<dyn MarketDataBackend>, watch_list: Vec<CanonicalAddress>) -> Self {
        let mut deduped = Vec::with_capacity(watch_list.len());
        for mint in watch_list {
            if !deduped.contains(&mint) {
                deduped.push(mint);
            }
        }
        Self {
            backend,
            watch_list: RwLock::new(deduped),
            store: SnapshotStore::new(),
        }
    }

    pub async fn watch_list(&self) -> Vec<CanonicalAddress> {
        self.watch_list.read().await.clone()
    }

    /// Add a mint. Returns `false` if it was already watched.
    pub async fn watch(&self, mint: CanonicalAddress) -> bool {
        let mut list = self.watch_list.write().await;
        if list.contains(&mint) {
            return false;
        }
        list.push(mint);
        true
    }

    pub async fn unwatch(&self, mint: &CanonicalAddress) -> bool {
        let mut list = self.watch_list.write().await;
        let before = list.len();
        list.retain(|m| m != mint);
        list.len() != before
    }

    pub async fn snapshot(&self) -> Arc<MarketSnapshot> {
        self.store.current().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.store.last_error().await
    }

    pub async fn overview(&self, mint: &CanonicalAddress) -> Option<TokenOverview> {
        self.store
            .current()
            .await
            .entries
            .iter()
            .find(|o| &o.mint == mint)
            .cloned()
    }

    /// Fetch prices and safety reports for the watch list concurrently and
    /// publish them merged by mint, in watch-list order.
    pub async fn refresh(&self) -> Result<Arc<MarketSnapshot>, SdkError> {
        let mints = self.watch_list().await;
        self.store.refresh_with("market_data", self.fetch(mints)).await
    }

    /// Search pairs upstream. Results are not cached and carry no safety report.
    pub async fn search(&self, query: &str) -> Result<Vec<TokenOverview>, SdkError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SdkError::Validation("search query is empty".into()));
        }
        let pairs = self.backend.search(query).await?;
        Ok(convert::best_pairs(&pairs)
            .into_iter()
            .map(|(mint, pair)| convert::overview_from_pair(mint, pair))
            .collect())
    }

    async fn fetch(&self, mints: Vec<CanonicalAddress>) -> Result<MarketSnapshot, SdkError> {
        if mints.is_empty() {
            return Ok(Snapshot::new(Vec::new(), Vec::new(), None));
        }
        let backend = self.backend.as_ref();

        let pairs = backend.token_pairs(&mints);
        let reports = fan_out(mints.iter().copied(), |mint| async move {
            let raw = backend.safety_report(&mint).await?;
            Ok(vec![(mint, convert::safety_report(&raw))])
        });

        let (pairs, reports) = futures_util::future::try_join(pairs, reports).await?;
        let best = convert::best_pairs(&pairs);

        let overviews = mints
            .iter()
            .map(|mint| {
                let mut overview = best
                    .iter()
                    .find(|(m, _)| m == mint)
                    .map(|(m, pair)| convert::overview_from_pair(*m, pair))
                    .unwrap_or_else(|| TokenOverview::unlisted(*mint));
                overview.safety = reports
                    .iter()
                    .find(|(m, _)| m == mint)
                    .map(|(_, report)| report.clone());
                overview
            })
            .collect();

        Ok(Snapshot::new(overviews, Vec::new(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoBackend;

    #[async_trait]
    impl MarketDataBackend for NoBackend {
        async fn token_pairs(&self, _mints: &[CanonicalAddress]) -> Result<Vec<Value>, AggregatorError> {
            Err(AggregatorError::upstream("dexscreener", "offline"))
        }
        async fn safety_report(&self, _mint: &CanonicalAddress) -> Result<Value, AggregatorError> {
            Err(AggregatorError::upstream("rugcheck", "offline"))
        }
        async fn search(&self, _query: &str) -> Result<Vec<Value>, AggregatorError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_watch_list_dedupes() {
        let a = CanonicalAddress::from_bytes([1; 32]);
        let agg = MarketDataAggregator::new(Arc::new(NoBackend), vec![a, a]);
        assert_eq!(agg.watch_list().await.len(), 1);
        assert!(!agg.watch(a).await);
        assert!(agg.unwatch(&a).await);
        assert!(agg.watch_list().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_watch_list_skips_upstream() {
        let agg = MarketDataAggregator::new(Arc::new(NoBackend), Vec::new());
        let snap = agg.refresh().await.unwrap();
        assert!(snap.entries.is_empty());
        assert!(snap.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_search_rejected() {
        let agg = MarketDataAggregator::new(Arc::new(NoBackend), Vec::new());
        assert!(matches!(agg.search("  ").await, Err(SdkError::Validation(_))));
    }
}
