//! In-memory wallet adapter, network layer and upstream backends.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use solana_signature::Signature;

use defi_wallet_sdk::domain::lending::{ActionRequest, ActionRoute, LendingBackend, LendingSource};
use defi_wallet_sdk::domain::market_data::MarketDataBackend;
use defi_wallet_sdk::domain::pools::{
    CreatePoolParams, PoolActionRequest, PoolBackend, PoolRoute, PoolSource,
};
use defi_wallet_sdk::domain::Protocol;
use defi_wallet_sdk::error::{AggregatorError, RpcError, WalletError};
use defi_wallet_sdk::rpc::{ChainRpc, Commitment, ConfirmationStatus};
use defi_wallet_sdk::shared::{CanonicalAddress, PublicKeyRepr};
use defi_wallet_sdk::wallet::{
    AppIdentity, AuthToken, AuthorizationResult, AuthorizationSession, AuthorizedAccount, Cluster,
    SessionConfig, WalletAdapter,
};

/// Key bytes the mock wallet authorizes with.
pub const WALLET_BYTES: [u8; 32] = [7; 32];

pub fn wallet_address() -> CanonicalAddress {
    CanonicalAddress::from_bytes(WALLET_BYTES)
}

pub fn base64_key(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ============================================================================
// Wallet adapter
// ============================================================================

pub struct MockAdapter {
    pub available: AtomicBool,
    pub account: Mutex<Option<PublicKeyRepr>>,
    pub fail_authorize: AtomicBool,
    pub fail_deauthorize: AtomicBool,
    pub fail_reauthorize: AtomicBool,
    pub authorize_delay: Mutex<Option<Duration>>,
    /// Extra payloads appended to every signing response.
    pub extra_signed: AtomicUsize,
    pub authorize_calls: AtomicUsize,
    pub deauthorize_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
    token_counter: AtomicUsize,
}

impl MockAdapter {
    /// Wallet answering with a base64 account, like the mobile wallet adapter.
    pub fn new() -> Self {
        Self::with_account(PublicKeyRepr::from(base64_key(&WALLET_BYTES)))
    }

    pub fn with_account(account: PublicKeyRepr) -> Self {
        Self {
            available: AtomicBool::new(true),
            account: Mutex::new(Some(account)),
            fail_authorize: AtomicBool::new(false),
            fail_deauthorize: AtomicBool::new(false),
            fail_reauthorize: AtomicBool::new(false),
            authorize_delay: Mutex::new(None),
            extra_signed: AtomicUsize::new(0),
            authorize_calls: AtomicUsize::new(0),
            deauthorize_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            token_counter: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        let adapter = Self::new();
        adapter.available.store(false, Ordering::SeqCst);
        adapter
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn deauthorize_calls(&self) -> usize {
        self.deauthorize_calls.load(Ordering::SeqCst)
    }

    fn result(&self) -> AuthorizationResult {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst);
        let accounts = self
            .account
            .lock()
            .unwrap()
            .clone()
            .map(|address| {
                vec![AuthorizedAccount {
                    address,
                    label: Some("Phantom".into()),
                }]
            })
            .unwrap_or_default();
        AuthorizationResult {
            auth_token: AuthToken::new(format!("token-{n}")),
            accounts,
            public_key: None,
            wallet_uri_base: None,
        }
    }
}

#[async_trait]
impl WalletAdapter for MockAdapter {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn authorize(
        &self,
        _cluster: Cluster,
        _identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.authorize_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_authorize.load(Ordering::SeqCst) {
            return Err(WalletError::AuthorizationFailed("user declined".into()));
        }
        Ok(self.result())
    }

    async fn reauthorize(
        &self,
        _auth_token: &AuthToken,
        _identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError> {
        if self.fail_reauthorize.load(Ordering::SeqCst) {
            return Err(WalletError::AuthorizationFailed("token expired".into()));
        }
        Ok(self.result())
    }

    async fn deauthorize(&self, _auth_token: &AuthToken) -> Result<(), WalletError> {
        self.deauthorize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deauthorize.load(Ordering::SeqCst) {
            return Err(WalletError::AuthorizationFailed("wallet closed".into()));
        }
        Ok(())
    }

    async fn sign_transactions(
        &self,
        transactions: Vec<Vec<u8>>,
        _auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        let mut signed: Vec<Vec<u8>> = transactions
            .into_iter()
            .map(|mut tx| {
                tx.push(0xff);
                tx
            })
            .collect();
        for _ in 0..self.extra_signed.load(Ordering::SeqCst) {
            signed.push(vec![0]);
        }
        Ok(signed)
    }

    async fn sign_messages(
        &self,
        messages: Vec<Vec<u8>>,
        _address: &CanonicalAddress,
        _auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(messages.into_iter().map(|_| vec![1; 64]).collect())
    }
}

// ============================================================================
// Network layer
// ============================================================================

pub struct MockRpc {
    pub lamports: AtomicU64,
    pub fail_balance: AtomicBool,
    pub balance_delay: Mutex<Option<Duration>>,
    pub balance_calls: AtomicUsize,
    pub submitted: Mutex<Vec<Vec<u8>>>,
    pub signature: Signature,
}

impl MockRpc {
    pub fn new(lamports: u64) -> Self {
        Self {
            lamports: AtomicU64::new(lamports),
            fail_balance: AtomicBool::new(false),
            balance_delay: Mutex::new(None),
            balance_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            signature: Signature::from([3u8; 64]),
        }
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_balance(&self, _address: &CanonicalAddress) -> Result<u64, RpcError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.balance_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(RpcError::Balance("node unavailable".into()));
        }
        Ok(self.lamports.load(Ordering::SeqCst))
    }

    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<Signature, RpcError> {
        self.submitted.lock().unwrap().push(transaction.to_vec());
        Ok(self.signature)
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> Result<ConfirmationStatus, RpcError> {
        Ok(ConfirmationStatus::Confirmed)
    }
}

// ============================================================================
// Sessions
// ============================================================================

pub fn session_with(
    adapter: Arc<MockAdapter>,
    rpc: Arc<MockRpc>,
    demo_fallback: bool,
) -> Arc<AuthorizationSession> {
    Arc::new(AuthorizationSession::new(
        adapter,
        rpc,
        SessionConfig {
            demo_fallback,
            ..SessionConfig::default()
        },
    ))
}

pub async fn connected_session() -> Arc<AuthorizationSession> {
    let session = session_with(Arc::new(MockAdapter::new()), Arc::new(MockRpc::new(0)), false);
    session.connect().await.expect("mock wallet should authorize");
    session
}

// ============================================================================
// Lending backend
// ============================================================================

pub struct MockLendingBackend {
    pub failing: Mutex<HashSet<LendingSource>>,
    pub positions: Mutex<HashMap<Protocol, Vec<Value>>>,
    pub listed_ids: Mutex<HashMap<LendingSource, String>>,
    pub list_calls: AtomicUsize,
    pub position_calls: AtomicUsize,
    pub submissions: Mutex<Vec<(ActionRoute, ActionRequest)>>,
}

impl MockLendingBackend {
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
            positions: Mutex::new(HashMap::new()),
            listed_ids: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
            position_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, source: LendingSource) {
        self.failing.lock().unwrap().insert(source);
    }

    /// List `source`'s entry under `id` instead of [`entry_id`].
    pub fn list_as(&self, source: LendingSource, id: &str) {
        self.listed_ids.lock().unwrap().insert(source, id.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

/// Id of the single entry the mock lists for `source`.
pub fn entry_id(source: LendingSource) -> String {
    format!("{source}-1")
}

#[async_trait]
impl LendingBackend for MockLendingBackend {
    async fn list(&self, source: LendingSource) -> Result<Vec<Value>, AggregatorError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&source) {
            return Err(AggregatorError::UpstreamRequestFailed {
                source_tag: source.to_string(),
                message: "503".into(),
            });
        }
        let id = self
            .listed_ids
            .lock()
            .unwrap()
            .get(&source)
            .cloned()
            .unwrap_or_else(|| entry_id(source));
        Ok(vec![json!({
            "address": id,
            "name": format!("{source} entry"),
            "apy": "0.05",
            "tvl": 1000,
            "mint": "So11111111111111111111111111111111111111112"
        })])
    }

    async fn positions(
        &self,
        protocol: Protocol,
        _owner: &CanonicalAddress,
    ) -> Result<Vec<Value>, AggregatorError> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .positions
            .lock()
            .unwrap()
            .get(&protocol)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit(
        &self,
        route: &ActionRoute,
        request: &ActionRequest,
    ) -> Result<Value, AggregatorError> {
        self.submissions
            .lock()
            .unwrap()
            .push((*route, request.clone()));
        Ok(json!({ "transaction": base64_key(&[9, 9, 9]) }))
    }
}

// ============================================================================
// Pool backend
// ============================================================================

pub struct MockPoolBackend {
    pub fail_list: AtomicBool,
    pub submissions: Mutex<Vec<(PoolRoute, PoolActionRequest)>>,
    pub created: Mutex<Vec<CreatePoolParams>>,
}

impl MockPoolBackend {
    pub fn new() -> Self {
        Self {
            fail_list: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PoolBackend for MockPoolBackend {
    async fn list(&self, source: PoolSource) -> Result<Vec<Value>, AggregatorError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AggregatorError::UpstreamRequestFailed {
                source_tag: source.to_string(),
                message: "timeout".into(),
            });
        }
        Ok(vec![json!({ "address": format!("{source}-pool"), "liquidity": "500" })])
    }

    async fn positions(
        &self,
        source: PoolSource,
        _owner: &CanonicalAddress,
    ) -> Result<Vec<Value>, AggregatorError> {
        Ok(vec![json!({
            "pool_address": format!("{source}-pool"),
            "value_usd": 100,
            "apy": "0.2"
        })])
    }

    async fn submit(
        &self,
        route: &PoolRoute,
        request: &PoolActionRequest,
    ) -> Result<Value, AggregatorError> {
        self.submissions
            .lock()
            .unwrap()
            .push((*route, request.clone()));
        Ok(json!({ "ok": true }))
    }

    async fn create_pool(
        &self,
        _owner: &CanonicalAddress,
        params: &CreatePoolParams,
    ) -> Result<Value, AggregatorError> {
        self.created.lock().unwrap().push(params.clone());
        Ok(json!({ "data": { "tx": base64_key(&[1, 2]) } }))
    }
}

// ============================================================================
// Market data backend
// ============================================================================

pub struct MockMarketData {
    pub pairs: Mutex<Vec<Value>>,
    pub reports: Mutex<HashMap<CanonicalAddress, Value>>,
    pub fail_safety: AtomicBool,
    pub search_queries: Mutex<Vec<String>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            pairs: Mutex::new(Vec::new()),
            reports: Mutex::new(HashMap::new()),
            fail_safety: AtomicBool::new(false),
            search_queries: Mutex::new(Vec::new()),
        }
    }
}

pub fn dex_pair(mint: &CanonicalAddress, symbol: &str, price: &str, liquidity: u64) -> Value {
    json!({
        "chainId": "solana",
        "dexId": "raydium",
        "pairAddress": format!("{symbol}-pair-{liquidity}"),
        "baseToken": { "address": mint.to_string(), "symbol": symbol, "name": symbol },
        "priceUsd": price,
        "liquidity": { "usd": liquidity },
        "volume": { "h24": 10 },
        "priceChange": { "h24": 1.5 }
    })
}

#[async_trait]
impl MarketDataBackend for MockMarketData {
    async fn token_pairs(&self, mints: &[CanonicalAddress]) -> Result<Vec<Value>, AggregatorError> {
        let wanted: Vec<String> = mints.iter().map(ToString::to_string).collect();
        Ok(self
            .pairs
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p["baseToken"]["address"]
                    .as_str()
                    .is_some_and(|a| wanted.iter().any(|w| w == a))
            })
            .cloned()
            .collect())
    }

    async fn safety_report(&self, mint: &CanonicalAddress) -> Result<Value, AggregatorError> {
        if self.fail_safety.load(Ordering::SeqCst) {
            return Err(AggregatorError::UpstreamRequestFailed {
                source_tag: "rugcheck".into(),
                message: "429".into(),
            });
        }
        Ok(self
            .reports
            .lock()
            .unwrap()
            .get(mint)
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    async fn search(&self, query: &str) -> Result<Vec<Value>, AggregatorError> {
        self.search_queries.lock().unwrap().push(query.to_string());
        Ok(self.pairs.lock().unwrap().clone())
    }
}
