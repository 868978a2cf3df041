//! HTTP backend for the Kamino and MarginFi REST APIs.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ActionRequest, ActionRoute, LendingBackend, LendingSource};
use crate::domain::Protocol;
use crate::error::{AggregatorError, SdkError};
use crate::http::UpstreamHttp;
use crate::shared::json::list_payload;
use crate::shared::CanonicalAddress;

const LIST_KEYS: &[&str] = &["data", "reserves", "vaults", "strategies", "banks", "markets", "groups"];

/// Kamino + MarginFi over HTTP.
pub struct HttpLendingBackend {
    kamino: UpstreamHttp,
    marginfi: UpstreamHttp,
    kamino_market: String,
}

impl HttpLendingBackend {
    pub fn new(kamino: UpstreamHttp, marginfi: UpstreamHttp, kamino_market: &str) -> Self {
        Self {
            kamino,
            marginfi,
            kamino_market: kamino_market.to_string(),
        }
    }

    /// Backend against the public endpoints in [`crate::network`].
    pub fn from_defaults() -> Result<Self, SdkError> {
        Ok(Self::new(
            UpstreamHttp::new(crate::network::DEFAULT_KAMINO_API_URL)?,
            UpstreamHttp::new(crate::network::DEFAULT_MARGINFI_API_URL)?,
            crate::network::DEFAULT_KAMINO_MARKET,
        ))
    }

    fn list_url(&self, source: LendingSource) -> String {
        match source {
            LendingSource::KaminoLend => self
                .kamino
                .url(&format!("/kamino-market/{}/reserves/metrics", self.kamino_market)),
            LendingSource::KaminoVault => self.kamino.url("/kvaults/vaults"),
            LendingSource::KaminoLiquidity => self
                .kamino
                .url("/strategies/metrics?env=mainnet-beta&status=LIVE"),
            LendingSource::MarginFiBank => self.marginfi.url("/v1/banks"),
            LendingSource::MarginFiMarket => self.marginfi.url("/v1/markets"),
        }
    }

    fn http_for(&self, source: LendingSource) -> &UpstreamHttp {
        match source {
            LendingSource::KaminoLend | LendingSource::KaminoVault | LendingSource::KaminoLiquidity => {
                &self.kamino
            }
            LendingSource::MarginFiBank | LendingSource::MarginFiMarket => &self.marginfi,
        }
    }

    /// Transaction-builder endpoint and body for a routed action.
    fn action_call(&self, route: &ActionRoute, request: &ActionRequest) -> (String, Value) {
        let wallet = request.owner.to_string();
        let amount = request.amount.to_string();
        let op = route.operation;

        match route.source {
            LendingSource::KaminoLend => (
                self.kamino.url(&format!("/ktx/klend/{op}")),
                json!({
                    "wallet": wallet,
                    "market": self.kamino_market,
                    "reserve": request.entry_id,
                    "amount": amount,
                }),
            ),
            LendingSource::KaminoVault => (
                self.kamino.url(&format!("/ktx/kvault/{op}")),
                json!({ "wallet": wallet, "kvault": request.entry_id, "amount": amount }),
            ),
            LendingSource::KaminoLiquidity => (
                self.kamino.url(&format!("/ktx/kliquidity/{op}")),
                json!({ "wallet": wallet, "strategy": request.entry_id, "amount": amount }),
            ),
            LendingSource::MarginFiBank => (
                self.marginfi
                    .url(&format!("/v1/banks/{}/{op}", request.entry_id)),
                json!({ "wallet": wallet, "mint": request.mint, "amount": amount }),
            ),
            LendingSource::MarginFiMarket => (
                self.marginfi
                    .url(&format!("/v1/markets/{}/{op}", request.entry_id)),
                json!({ "wallet": wallet, "mint": request.mint, "amount": amount }),
            ),
        }
    }
}

#[async_trait]
impl LendingBackend for HttpLendingBackend {
    async fn list(&self, source: LendingSource) -> Result<Vec<Value>, AggregatorError> {
        let url = self.list_url(source);
        tracing::debug!(%source, url = %url, "listing");
        let payload: Value = self
            .http_for(source)
            .get(&url)
            .await
            .map_err(|e| AggregatorError::upstream(source, e))?;
        Ok(list_payload(payload, LIST_KEYS))
    }

    async fn positions(
        &self,
        protocol: Protocol,
        owner: &CanonicalAddress,
    ) -> Result<Vec<Value>, AggregatorError> {
        let (http, url) = match protocol {
            Protocol::Kamino => (
                &self.kamino,
                self.kamino.url(&format!(
                    "/kamino-market/{}/users/{owner}/obligations",
                    self.kamino_market
                )),
            ),
            Protocol::MarginFi => (
                &self.marginfi,
                self.marginfi.url(&format!("/v1/accounts/{owner}")),
            ),
            Protocol::Meteora => return Ok(Vec::new()),
        };
        let payload: Value = http
            .get(&url)
            .await
            .map_err(|e| AggregatorError::upstream(protocol, e))?;
        Ok(list_payload(payload, &["data", "obligations", "accounts"]))
    }

    async fn submit(
        &self,
        route: &ActionRoute,
        request: &ActionRequest,
    ) -> Result<Value, AggregatorError> {
        let (url, body) = self.action_call(route, request);
        self.http_for(route.source)
            .post(&url, &body)
            .await
            .map_err(|e| AggregatorError::upstream(route.source, e))
    }
}
