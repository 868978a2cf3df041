//! High-level client — `WalletHubClient` wiring the wallet facade and the
//! aggregators to one session and one network handle.
//!
//! Every dependency can be injected through the builder; anything left unset
//! is built from the defaults in [`crate::network`].

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::lending::{HttpLendingBackend, LendingAggregator, LendingBackend};
use crate::domain::market_data::{HttpMarketDataBackend, MarketDataAggregator, MarketDataBackend};
use crate::domain::pools::{HttpPoolBackend, PoolAggregator, PoolBackend};
use crate::error::SdkError;
use crate::http::{RetryPolicy, UpstreamHttp};
use crate::network;
use crate::rpc::ChainRpc;
use crate::shared::CanonicalAddress;
use crate::wallet::{
    AppIdentity, AuthorizationSession, Cluster, SessionConfig, UnavailableAdapter, Wallet,
    WalletAdapter,
};

/// The primary entry point of the SDK.
///
/// Cloning is cheap; clones share the session, the balance poll and every
/// aggregator snapshot.
#[derive(Clone)]
pub struct WalletHubClient {
    session: Arc<AuthorizationSession>,
    wallet: Arc<Wallet>,
    lending: Arc<LendingAggregator>,
    pools: Arc<PoolAggregator>,
    market_data: Arc<MarketDataAggregator>,
}

impl WalletHubClient {
    pub fn builder() -> WalletHubClientBuilder {
        WalletHubClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn lending(&self) -> &LendingAggregator {
        &self.lending
    }

    pub fn pools(&self) -> &PoolAggregator {
        &self.pools
    }

    pub fn market_data(&self) -> &MarketDataAggregator {
        &self.market_data
    }

    pub fn session(&self) -> Arc<AuthorizationSession> {
        self.session.clone()
    }

    /// Refresh every aggregator concurrently. Each keeps its own snapshot
    /// and error flag; the first failure is returned.
    pub async fn refresh_all(&self) -> Result<(), SdkError> {
        futures_util::future::try_join3(
            self.lending.refresh(),
            self.pools.refresh(),
            self.market_data.refresh(),
        )
        .await?;
        Ok(())
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct WalletHubClientBuilder {
    rpc_url: String,
    kamino_url: String,
    kamino_market: String,
    marginfi_url: String,
    meteora_dlmm_url: String,
    meteora_amm_url: String,
    dexscreener_url: String,
    rugcheck_url: String,
    cluster: Cluster,
    identity: AppIdentity,
    request_timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
    demo_fallback: bool,
    watch_list: Vec<CanonicalAddress>,
    wallet_adapter: Option<Arc<dyn WalletAdapter>>,
    rpc: Option<Arc<dyn ChainRpc>>,
    lending_backend: Option<Arc<dyn LendingBackend>>,
    pool_backend: Option<Arc<dyn PoolBackend>>,
    market_data_backend: Option<Arc<dyn MarketDataBackend>>,
}

impl std::fmt::Debug for WalletHubClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHubClientBuilder")
            .field("rpc_url", &self.rpc_url)
            .field("kamino_url", &self.kamino_url)
            .field("kamino_market", &self.kamino_market)
            .field("marginfi_url", &self.marginfi_url)
            .field("meteora_dlmm_url", &self.meteora_dlmm_url)
            .field("meteora_amm_url", &self.meteora_amm_url)
            .field("dexscreener_url", &self.dexscreener_url)
            .field("rugcheck_url", &self.rugcheck_url)
            .field("cluster", &self.cluster)
            .field("identity", &self.identity)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("retry", &self.retry)
            .field("demo_fallback", &self.demo_fallback)
            .field("watch_list", &self.watch_list)
            .field("wallet_adapter", &self.wallet_adapter.is_some())
            .field("rpc", &self.rpc.is_some())
            .field("lending_backend", &self.lending_backend.is_some())
            .field("pool_backend", &self.pool_backend.is_some())
            .field("market_data_backend", &self.market_data_backend.is_some())
            .finish()
    }
}

impl Default for WalletHubClientBuilder {
    fn default() -> Self {
        Self {
            rpc_url: network::DEFAULT_RPC_URL.to_string(),
            kamino_url: network::DEFAULT_KAMINO_API_URL.to_string(),
            kamino_market: network::DEFAULT_KAMINO_MARKET.to_string(),
            marginfi_url: network::DEFAULT_MARGINFI_API_URL.to_string(),
            meteora_dlmm_url: network::DEFAULT_METEORA_DLMM_API_URL.to_string(),
            meteora_amm_url: network::DEFAULT_METEORA_AMM_API_URL.to_string(),
            dexscreener_url: network::DEFAULT_DEXSCREENER_API_URL.to_string(),
            rugcheck_url: network::DEFAULT_RUGCHECK_API_URL.to_string(),
            cluster: Cluster::default(),
            identity: AppIdentity::default(),
            request_timeout: network::DEFAULT_REQUEST_TIMEOUT,
            poll_interval: network::DEFAULT_BALANCE_POLL_INTERVAL,
            retry: RetryPolicy::None,
            demo_fallback: false,
            watch_list: Vec::new(),
            wallet_adapter: None,
            rpc: None,
            lending_backend: None,
            pool_backend: None,
            market_data_backend: None,
        }
    }
}

impl WalletHubClientBuilder {
    /// Defaults overridden by `DEFI_WALLET_*` environment variables.
    ///
    /// | Variable | Setting |
    /// |---|---|
    /// | `DEFI_WALLET_RPC_URL` | Solana RPC endpoint |
    /// | `DEFI_WALLET_KAMINO_API_URL` / `DEFI_WALLET_KAMINO_MARKET` | Kamino API and lending market |
    /// | `DEFI_WALLET_MARGINFI_API_URL` | MarginFi API |
    /// | `DEFI_WALLET_METEORA_DLMM_API_URL` / `DEFI_WALLET_METEORA_AMM_API_URL` | Meteora APIs |
    /// | `DEFI_WALLET_DEXSCREENER_API_URL` / `DEFI_WALLET_RUGCHECK_API_URL` | Market data APIs |
    /// | `DEFI_WALLET_CLUSTER` | `mainnet-beta`, `devnet` or `testnet` |
    /// | `DEFI_WALLET_APP_NAME` | Identity shown by the wallet |
    /// | `DEFI_WALLET_REQUEST_TIMEOUT_SECS` | Upstream request timeout |
    /// | `DEFI_WALLET_POLL_INTERVAL_SECS` | Balance poll interval |
    /// | `DEFI_WALLET_DEMO_FALLBACK` | `true` / `false` |
    /// | `DEFI_WALLET_WATCH_LIST` | Comma-separated mints |
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let mut builder = Self::default();
        let var = |key: &str| {
            lookup(&format!("DEFI_WALLET_{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let urls: [(&str, &mut String); 8] = [
            ("RPC_URL", &mut builder.rpc_url),
            ("KAMINO_API_URL", &mut builder.kamino_url),
            ("KAMINO_MARKET", &mut builder.kamino_market),
            ("MARGINFI_API_URL", &mut builder.marginfi_url),
            ("METEORA_DLMM_API_URL", &mut builder.meteora_dlmm_url),
            ("METEORA_AMM_API_URL", &mut builder.meteora_amm_url),
            ("DEXSCREENER_API_URL", &mut builder.dexscreener_url),
            ("RUGCHECK_API_URL", &mut builder.rugcheck_url),
        ];
        for (key, slot) in urls {
            if let Some(value) = var(key) {
                *slot = value;
            }
        }

        if let Some(cluster) = var("CLUSTER") {
            builder.cluster = Cluster::from_str(&cluster)
                .ok_or_else(|| SdkError::Validation(format!("unknown cluster: {cluster}")))?;
        }
        if let Some(name) = var("APP_NAME") {
            builder.identity = AppIdentity::new(name);
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            builder.request_timeout = parse_secs("REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = var("POLL_INTERVAL_SECS") {
            builder.poll_interval = parse_secs("POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(flag) = var("DEMO_FALLBACK") {
            builder.demo_fallback = parse_env("DEMO_FALLBACK", &flag)?;
        }
        if let Some(list) = var("WATCH_LIST") {
            builder.watch_list = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(CanonicalAddress::from_str)
                .collect::<Result<_, _>>()?;
        }

        Ok(builder)
    }

    pub fn rpc_url(mut self, url: &str) -> Self {
        self.rpc_url = url.to_string();
        self
    }

    pub fn kamino_url(mut self, url: &str) -> Self {
        self.kamino_url = url.to_string();
        self
    }

    pub fn kamino_market(mut self, market: &str) -> Self {
        self.kamino_market = market.to_string();
        self
    }

    pub fn marginfi_url(mut self, url: &str) -> Self {
        self.marginfi_url = url.to_string();
        self
    }

    pub fn meteora_dlmm_url(mut self, url: &str) -> Self {
        self.meteora_dlmm_url = url.to_string();
        self
    }

    pub fn meteora_amm_url(mut self, url: &str) -> Self {
        self.meteora_amm_url = url.to_string();
        self
    }

    pub fn dexscreener_url(mut self, url: &str) -> Self {
        self.dexscreener_url = url.to_string();
        self
    }

    pub fn rugcheck_url(mut self, url: &str) -> Self {
        self.rugcheck_url = url.to_string();
        self
    }

    pub fn cluster(mut self, cluster: Cluster) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn identity(mut self, identity: AppIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Timeout of every upstream request. `build()` rejects zero.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Balance poll interval. `build()` rejects zero.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Retry policy for upstream reads. Defaults to single attempt; action
    /// requests are never retried.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn demo_fallback(mut self, enabled: bool) -> Self {
        self.demo_fallback = enabled;
        self
    }

    pub fn watch_list(mut self, mints: Vec<CanonicalAddress>) -> Self {
        self.watch_list = mints;
        self
    }

    /// Platform wallet bridge. Without one the client is view-only.
    pub fn wallet_adapter(mut self, adapter: Arc<dyn WalletAdapter>) -> Self {
        self.wallet_adapter = Some(adapter);
        self
    }

    /// Network layer. Required unless the `solana-rpc` feature is enabled.
    pub fn rpc(mut self, rpc: Arc<dyn ChainRpc>) -> Self {
        self.rpc = Some(rpc);
        self
    }

    pub fn lending_backend(mut self, backend: Arc<dyn LendingBackend>) -> Self {
        self.lending_backend = Some(backend);
        self
    }

    pub fn pool_backend(mut self, backend: Arc<dyn PoolBackend>) -> Self {
        self.pool_backend = Some(backend);
        self
    }

    pub fn market_data_backend(mut self, backend: Arc<dyn MarketDataBackend>) -> Self {
        self.market_data_backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<WalletHubClient, SdkError> {
        if self.request_timeout.is_zero() {
            return Err(SdkError::Validation(
                "request timeout must be non-zero".into(),
            ));
        }
        let rpc = match self.rpc {
            Some(rpc) => rpc,
            None => default_rpc(&self.rpc_url)?,
        };
        let adapter = self
            .wallet_adapter
            .unwrap_or_else(|| Arc::new(UnavailableAdapter));

        let session = Arc::new(AuthorizationSession::new(
            adapter,
            rpc.clone(),
            SessionConfig {
                cluster: self.cluster,
                identity: self.identity,
                demo_fallback: self.demo_fallback,
            },
        ));
        let wallet = Wallet::with_poll_interval(session.clone(), rpc, self.poll_interval)?;

        let timeout = self.request_timeout;
        let retry = self.retry;
        let upstream = |url: &str| UpstreamHttp::with_options(url, timeout, retry.clone());

        let lending_backend: Arc<dyn LendingBackend> = match self.lending_backend {
            Some(backend) => backend,
            None => Arc::new(HttpLendingBackend::new(
                upstream(&self.kamino_url)?,
                upstream(&self.marginfi_url)?,
                &self.kamino_market,
            )),
        };
        let pool_backend: Arc<dyn PoolBackend> = match self.pool_backend {
            Some(backend) => backend,
            None => Arc::new(HttpPoolBackend::new(
                upstream(&self.meteora_dlmm_url)?,
                upstream(&self.meteora_amm_url)?,
            )),
        };
        let market_data_backend: Arc<dyn MarketDataBackend> = match self.market_data_backend {
            Some(backend) => backend,
            None => Arc::new(HttpMarketDataBackend::new(
                upstream(&self.dexscreener_url)?,
                upstream(&self.rugcheck_url)?,
            )),
        };

        Ok(WalletHubClient {
            wallet: Arc::new(wallet),
            lending: Arc::new(LendingAggregator::new(lending_backend).with_session(session.clone())),
            pools: Arc::new(PoolAggregator::new(pool_backend).with_session(session.clone())),
            market_data: Arc::new(MarketDataAggregator::new(
                market_data_backend,
                self.watch_list,
            )),
            session,
        })
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, SdkError> {
    value
        .parse()
        .map_err(|_| SdkError::Validation(format!("invalid DEFI_WALLET_{key}: {value}")))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, SdkError> {
    match parse_env::<u64>(key, value)? {
        0 => Err(SdkError::Validation(format!(
            "DEFI_WALLET_{key} must be at least 1 second"
        ))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(feature = "solana-rpc")]
fn default_rpc(rpc_url: &str) -> Result<Arc<dyn ChainRpc>, SdkError> {
    Ok(Arc::new(crate::rpc::SolanaRpc::new(rpc_url)))
}

#[cfg(not(feature = "solana-rpc"))]
fn default_rpc(rpc_url: &str) -> Result<Arc<dyn ChainRpc>, SdkError> {
    Err(SdkError::Validation(format!(
        "no network layer for {rpc_url}: enable the `solana-rpc` feature or call `rpc()`"
    )))
}
