//! HTTP backend for DexScreener (prices) and RugCheck (safety).

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde_json::Value;

use super::MarketDataBackend;
use crate::error::{AggregatorError, SdkError};
use crate::http::UpstreamHttp;
use crate::shared::json::list_payload;
use crate::shared::CanonicalAddress;

/// DexScreener accepts at most this many addresses per token lookup.
pub const MAX_MINTS_PER_REQUEST: usize = 30;

const DEXSCREENER: &str = "dexscreener";
const RUGCHECK: &str = "rugcheck";

pub struct HttpMarketDataBackend {
    dexscreener: UpstreamHttp,
    rugcheck: UpstreamHttp,
}

impl HttpMarketDataBackend {
    pub fn new(dexscreener: UpstreamHttp, rugcheck: UpstreamHttp) -> Self {
        Self {
            dexscreener,
            rugcheck,
        }
    }

    pub fn from_defaults() -> Result<Self, SdkError> {
        Ok(Self::new(
            UpstreamHttp::new(crate::network::DEFAULT_DEXSCREENER_API_URL)?,
            UpstreamHttp::new(crate::network::DEFAULT_RUGCHECK_API_URL)?,
        ))
    }

    fn tokens_url(&self, mints: &[CanonicalAddress]) -> String {
        let joined = mints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.dexscreener.url(&format!("/latest/dex/tokens/{joined}"))
    }

    fn search_url(&self, query: &str) -> String {
        self.dexscreener
            .url(&format!("/latest/dex/search?q={}", urlencoding::encode(query)))
    }

    fn summary_url(&self, mint: &CanonicalAddress) -> String {
        self.rugcheck.url(&format!("/v1/tokens/{mint}/report/summary"))
    }

    async fn pairs(&self, url: &str) -> Result<Vec<Value>, AggregatorError> {
        let payload: Value = self
            .dexscreener
            .get(url)
            .await
            .map_err(|e| AggregatorError::upstream(DEXSCREENER, e))?;
        Ok(list_payload(payload, &["pairs"])
            .into_iter()
            .filter(|p| p.get("chainId").and_then(Value::as_str).map_or(true, |c| c == "solana"))
            .collect())
    }
}

#[async_trait]
impl MarketDataBackend for HttpMarketDataBackend {
    async fn token_pairs(&self, mints: &[CanonicalAddress]) -> Result<Vec<Value>, AggregatorError> {
        let urls: Vec<String> = mints
            .chunks(MAX_MINTS_PER_REQUEST)
            .map(|chunk| self.tokens_url(chunk))
            .collect();
        let batches = try_join_all(urls.iter().map(|url| self.pairs(url))).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn safety_report(&self, mint: &CanonicalAddress) -> Result<Value, AggregatorError> {
        self.rugcheck
            .get(&self.summary_url(mint))
            .await
            .map_err(|e| AggregatorError::upstream(RUGCHECK, e))
    }

    async fn search(&self, query: &str) -> Result<Vec<Value>, AggregatorError> {
        self.pairs(&self.search_url(query)).await
    }
}
