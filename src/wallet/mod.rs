//! Wallet layer — mobile wallet-adapter protocol types, the authorization
//! session state machine and the facade the application talks to.
//!
//! ## Security Model
//!
//! - The auth token issued by the wallet lives in memory only. [`AuthToken`]
//!   has no `Serialize` impl and its `Debug` output is redacted.
//! - A [`WalletSession`] of kind [`SessionKind::Demo`] is a placeholder for
//!   view-only flows. It never carries a real token and cannot sign.

pub mod facade;
pub mod session;

#[cfg(feature = "native-auth")]
pub mod native;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::shared::{CanonicalAddress, PublicKeyRepr};

pub use facade::{Balance, Wallet};
pub use session::{AuthorizationSession, SessionConfig, SessionState};

/// Label given to placeholder sessions.
pub const DEMO_SESSION_LABEL: &str = "Demo Wallet";

/// Label used when the wallet does not name the authorized account.
pub const DEFAULT_ACCOUNT_LABEL: &str = "Mobile Wallet";

// ============================================================================
// Protocol types
// ============================================================================

/// Cluster the wallet should authorize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    MainnetBeta,
    Devnet,
    Testnet,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mainnet-beta" | "mainnet" => Some(Self::MainnetBeta),
            "devnet" => Some(Self::Devnet),
            "testnet" => Some(Self::Testnet),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of the dApp shown by the wallet during authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl AppIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: None,
            icon: None,
        }
    }
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self::new("DeFi Wallet")
    }
}

/// Opaque credential returned by the wallet's authorize call.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for adapters forwarding it to the wallet.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// One account granted by the wallet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorizedAccount {
    /// Base64-encoded public key in the wallet-adapter wire format.
    pub address: PublicKeyRepr,
    #[serde(default)]
    pub label: Option<String>,
}

/// Result of `authorize` / `reauthorize`.
///
/// Wallets either return an `accounts` list or, in older protocol versions,
/// a single `public_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationResult {
    pub auth_token: AuthToken,
    #[serde(default)]
    pub accounts: Vec<AuthorizedAccount>,
    #[serde(default, alias = "publicKey")]
    pub public_key: Option<PublicKeyRepr>,
    #[serde(default)]
    pub wallet_uri_base: Option<String>,
}

impl AuthorizationResult {
    /// The key the session should use: first account, else the single public key.
    pub fn primary_key(&self) -> Option<(&PublicKeyRepr, Option<&str>)> {
        if let Some(account) = self.accounts.first() {
            return Some((&account.address, account.label.as_deref()));
        }
        self.public_key.as_ref().map(|pk| (pk, None))
    }
}

// ============================================================================
// Session types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Backed by a real wallet authorization.
    Connected,
    /// Placeholder for view-only flows after a failed normalization.
    Demo,
}

/// An authorized wallet session.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSession {
    pub address: CanonicalAddress,
    pub label: String,
    pub kind: SessionKind,
    pub wallet_uri_base: Option<String>,
    pub(crate) auth_token: AuthToken,
}

impl WalletSession {
    pub(crate) fn demo() -> Self {
        Self {
            address: CanonicalAddress::system_placeholder(),
            label: DEMO_SESSION_LABEL.to_string(),
            kind: SessionKind::Demo,
            wallet_uri_base: None,
            auth_token: AuthToken::new(""),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.kind == SessionKind::Demo
    }
}

// ============================================================================
// Adapter trait
// ============================================================================

/// The wallet signing protocol, as exposed by a platform bridge.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Whether the native signing module is present.
    fn is_available(&self) -> bool;

    async fn authorize(
        &self,
        cluster: Cluster,
        identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError>;

    async fn reauthorize(
        &self,
        auth_token: &AuthToken,
        identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError>;

    async fn deauthorize(&self, auth_token: &AuthToken) -> Result<(), WalletError>;

    /// Sign serialized transactions; returns the signed serialized transactions.
    async fn sign_transactions(
        &self,
        transactions: Vec<Vec<u8>>,
        auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError>;

    /// Sign arbitrary messages; returns one signature per message.
    async fn sign_messages(
        &self,
        messages: Vec<Vec<u8>>,
        address: &CanonicalAddress,
        auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError>;
}

/// Adapter for platforms without a signing module. The session stays
/// view-only: `connect` fails fast with [`WalletError::CapabilityUnavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAdapter;

#[async_trait]
impl WalletAdapter for UnavailableAdapter {
    fn is_available(&self) -> bool {
        false
    }

    async fn authorize(
        &self,
        _cluster: Cluster,
        _identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError> {
        Err(WalletError::CapabilityUnavailable)
    }

    async fn reauthorize(
        &self,
        _auth_token: &AuthToken,
        _identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError> {
        Err(WalletError::CapabilityUnavailable)
    }

    async fn deauthorize(&self, _auth_token: &AuthToken) -> Result<(), WalletError> {
        Err(WalletError::CapabilityUnavailable)
    }

    async fn sign_transactions(
        &self,
        _transactions: Vec<Vec<u8>>,
        _auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        Err(WalletError::CapabilityUnavailable)
    }

    async fn sign_messages(
        &self,
        _messages: Vec<Vec<u8>>,
        _address: &CanonicalAddress,
        _auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        Err(WalletError::CapabilityUnavailable)
    }
}
