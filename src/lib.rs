//! # DeFi Wallet SDK
//!
//! Client core for a mobile Solana DeFi wallet: wallet-adapter authorization
//! sessions, balance tracking, and lending / liquidity / market-data
//! aggregation across Kamino, MarginFi, Meteora, DexScreener and RugCheck.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Canonical addresses, domain records, snapshots, analytics
//! 2. **Wallet** — Wallet-adapter protocol, authorization session, facade with balance poll
//! 3. **Network** — `ChainRpc` trait; Solana `RpcClient` implementation behind `solana-rpc`
//! 4. **HTTP API** — `UpstreamHttp` with bounded timeouts and opt-in retry
//! 5. **High-Level Client** — `WalletHubClient` wiring everything to one session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use defi_wallet_sdk::prelude::*;
//!
//! let client = WalletHubClient::builder()
//!     .wallet_adapter(adapter)
//!     .demo_fallback(true)
//!     .build()?;
//!
//! if let Some(session) = client.wallet().connect().await? {
//!     println!("connected {}", session.address);
//! }
//! let lending = client.lending().refresh().await?;
//! println!("net APY: {:?}", net_apy(&lending.positions));
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes: canonical addresses, unit conversion, JSON field helpers.
pub mod shared;

/// Domain modules: aggregators, snapshots, analytics.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants and protocol defaults.
pub mod network;

// ── Layer 2: Wallet ──────────────────────────────────────────────────────────

/// Wallet-adapter protocol, authorization session, wallet facade.
pub mod wallet;

// ── Layer 3: Network ─────────────────────────────────────────────────────────

/// Balance queries, transaction submission and confirmation.
pub mod rpc;

// ── Layer 4: HTTP API ────────────────────────────────────────────────────────

/// HTTP client for the upstream REST services.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// `WalletHubClient` — the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{
        lamports_to_sol, normalize_public_key, normalize_str, CanonicalAddress, PublicKeyRepr,
    };

    // Domain types
    pub use crate::domain::analytics::{health_factor, net_apy, totals, PortfolioTotals};
    pub use crate::domain::lending::{
        LendingAction, LendingAggregator, LendingBackend, LendingEntry, LendingPosition,
        LendingReceipt, LendingSnapshot, LendingSource,
    };
    pub use crate::domain::market_data::{
        MarketDataAggregator, MarketDataBackend, MarketSnapshot, RiskLevel, SafetyReport,
        TokenOverview,
    };
    pub use crate::domain::pools::{
        CreatePoolParams, PoolAction, PoolAggregator, PoolBackend, PoolCreation, PoolEntry,
        PoolPosition, PoolReceipt, PoolSnapshot, PoolSource,
    };
    pub use crate::domain::snapshot::Snapshot;
    pub use crate::domain::{
        ActionReceipt, AggregatedEntry, EntryKind, PositionSide, Protocol, SourceTag,
        UserPosition,
    };

    // Wallet
    pub use crate::wallet::{
        AppIdentity, AuthToken, AuthorizationResult, AuthorizedAccount, AuthorizationSession,
        Balance, Cluster, SessionConfig, SessionKind, SessionState, UnavailableAdapter, Wallet,
        WalletAdapter, WalletSession,
    };

    #[cfg(feature = "native-auth")]
    pub use crate::wallet::native::KeypairWalletAdapter;

    // Network
    pub use crate::rpc::{ChainRpc, Commitment, ConfirmationStatus};

    #[cfg(feature = "solana-rpc")]
    pub use crate::rpc::SolanaRpc;

    // Errors
    pub use crate::error::{AddressError, AggregatorError, HttpError, RpcError, SdkError, WalletError};

    // HTTP client + high-level client
    #[cfg(feature = "http")]
    pub use crate::client::{WalletHubClient, WalletHubClientBuilder};
    #[cfg(feature = "http")]
    pub use crate::http::{RetryConfig, RetryPolicy, UpstreamHttp};
}
