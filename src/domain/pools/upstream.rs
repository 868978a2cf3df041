//! HTTP backend for the Meteora DLMM and dynamic AMM APIs.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{CreatePoolParams, PoolActionRequest, PoolAmounts, PoolBackend, PoolRoute, PoolSource};
use crate::error::{AggregatorError, SdkError};
use crate::http::UpstreamHttp;
use crate::shared::json::list_payload;
use crate::shared::CanonicalAddress;

const LIST_KEYS: &[&str] = &["data", "pairs", "pools", "positions", "groups"];

pub struct HttpPoolBackend {
    dlmm: UpstreamHttp,
    dynamic: UpstreamHttp,
}

impl HttpPoolBackend {
    pub fn new(dlmm: UpstreamHttp, dynamic: UpstreamHttp) -> Self {
        Self { dlmm, dynamic }
    }

    pub fn from_defaults() -> Result<Self, SdkError> {
        Ok(Self::new(
            UpstreamHttp::new(crate::network::DEFAULT_METEORA_DLMM_API_URL)?,
            UpstreamHttp::new(crate::network::DEFAULT_METEORA_AMM_API_URL)?,
        ))
    }

    fn http_for(&self, source: PoolSource) -> &UpstreamHttp {
        match source {
            PoolSource::MeteoraDlmm => &self.dlmm,
            PoolSource::MeteoraDynamic => &self.dynamic,
        }
    }

    fn list_url(&self, source: PoolSource) -> String {
        match source {
            PoolSource::MeteoraDlmm => self.dlmm.url("/pair/all"),
            PoolSource::MeteoraDynamic => self.dynamic.url("/pools"),
        }
    }

    fn positions_url(&self, source: PoolSource, owner: &CanonicalAddress) -> String {
        match source {
            PoolSource::MeteoraDlmm => self.dlmm.url(&format!("/user/{owner}/positions")),
            PoolSource::MeteoraDynamic => self.dynamic.url(&format!("/pools/lp?user={owner}")),
        }
    }

    fn action_call(&self, route: &PoolRoute, request: &PoolActionRequest) -> (String, Value) {
        let http = self.http_for(route.source);
        let path = match route.source {
            PoolSource::MeteoraDlmm => format!("/pair/{}/{}", request.pool_id, route.operation),
            PoolSource::MeteoraDynamic => format!("/pool/{}/{}", request.pool_id, route.operation),
        };
        let mut body = json!({ "wallet": request.owner.to_string() });
        match &request.amounts {
            PoolAmounts::Deposit { token_a, token_b } => {
                body["token_a_amount"] = json!(token_a.to_string());
                body["token_b_amount"] = json!(token_b.to_string());
            }
            PoolAmounts::Withdraw { share } => {
                body["share"] = json!(share.to_string());
            }
        }
        (http.url(&path), body)
    }

    fn create_call(&self, owner: &CanonicalAddress, params: &CreatePoolParams) -> (String, Value) {
        let path = match params.source {
            PoolSource::MeteoraDlmm => "/pair/create",
            PoolSource::MeteoraDynamic => "/pool/create",
        };
        let body = json!({
            "wallet": owner.to_string(),
            "token_a_mint": params.token_a_mint.to_string(),
            "token_b_mint": params.token_b_mint.to_string(),
            "bin_step": params.bin_step,
            "fee_bps": params.fee_bps,
            "initial_price": params.initial_price.map(|p| p.to_string()),
            "token_a_amount": params.token_a_amount.map(|a| a.to_string()),
            "token_b_amount": params.token_b_amount.map(|a| a.to_string()),
        });
        (self.http_for(params.source).url(path), body)
    }
}

#[async_trait]
impl PoolBackend for HttpPoolBackend {
    async fn list(&self, source: PoolSource) -> Result<Vec<Value>, AggregatorError> {
        let payload: Value = self
            .http_for(source)
            .get(&self.list_url(source))
            .await
            .map_err(|e| AggregatorError::upstream(source, e))?;
        Ok(list_payload(payload, LIST_KEYS))
    }

    async fn positions(
        &self,
        source: PoolSource,
        owner: &CanonicalAddress,
    ) -> Result<Vec<Value>, AggregatorError> {
        let payload: Value = self
            .http_for(source)
            .get(&self.positions_url(source, owner))
            .await
            .map_err(|e| AggregatorError::upstream(source, e))?;
        Ok(list_payload(payload, LIST_KEYS))
    }

    async fn submit(
        &self,
        route: &PoolRoute,
        request: &PoolActionRequest,
    ) -> Result<Value, AggregatorError> {
        let (url, body) = self.action_call(route, request);
        self.http_for(route.source)
            .post(&url, &body)
            .await
            .map_err(|e| AggregatorError::upstream(route.source, e))
    }

    async fn create_pool(
        &self,
        owner: &CanonicalAddress,
        params: &CreatePoolParams,
    ) -> Result<Value, AggregatorError> {
        let (url, body) = self.create_call(owner, params);
        self.http_for(params.source)
            .post(&url, &body)
            .await
            .map_err(|e| AggregatorError::upstream(params.source, e))
    }
}
