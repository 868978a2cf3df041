//! Wallet authorization session — the `Disconnected → Authorizing →
//! Authorized → Disconnecting → Disconnected` state machine.
//!
//! Every operation is a single attempt. Failures are returned to the caller;
//! the only local recovery is the optional demo fallback when the wallet's
//! public key cannot be normalized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_lock::RwLock;
use solana_signature::Signature;

use super::{
    AppIdentity, AuthorizationResult, Cluster, SessionKind, WalletAdapter, WalletSession,
    DEFAULT_ACCOUNT_LABEL,
};
use crate::error::{SdkError, WalletError};
use crate::rpc::ChainRpc;
use crate::shared::{normalize_public_key, CanonicalAddress};

/// Current state of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Disconnected,
    Authorizing,
    Authorized(WalletSession),
    Disconnecting,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Authorizing => "authorizing",
            Self::Authorized(_) => "authorized",
            Self::Disconnecting => "disconnecting",
        }
    }
}

/// Authorization parameters.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub cluster: Cluster,
    pub identity: AppIdentity,
    /// Publish a placeholder [`SessionKind::Demo`] session when the wallet's
    /// public key cannot be normalized, instead of failing.
    pub demo_fallback: bool,
}

/// Lifecycle of one wallet-adapter authorization.
pub struct AuthorizationSession {
    adapter: Arc<dyn WalletAdapter>,
    rpc: Arc<dyn ChainRpc>,
    config: SessionConfig,
    state: RwLock<SessionState>,
    /// Counter numbering each `connect()` handshake.
    attempts: AtomicU64,
    /// Number of the handshake currently awaited, 0 when none is.
    in_flight: AtomicU64,
}

impl AuthorizationSession {
    pub fn new(
        adapter: Arc<dyn WalletAdapter>,
        rpc: Arc<dyn ChainRpc>,
        config: SessionConfig,
    ) -> Self {
        Self {
            adapter,
            rpc,
            config,
            state: RwLock::new(SessionState::Disconnected),
            attempts: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The active session, demo or connected.
    pub async fn session(&self) -> Option<WalletSession> {
        match &*self.state.read().await {
            SessionState::Authorized(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Address of a real (non-demo) session.
    pub async fn connected_address(&self) -> Option<CanonicalAddress> {
        match &*self.state.read().await {
            SessionState::Authorized(session) if session.kind == SessionKind::Connected => {
                Some(session.address)
            }
            _ => None,
        }
    }

    pub async fn is_authorized(&self) -> bool {
        matches!(&*self.state.read().await, SessionState::Authorized(_))
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Authorize with the wallet.
    ///
    /// Already authorized: returns the existing session without a handshake.
    /// A handshake in flight: [`WalletError::AuthorizationInProgress`].
    ///
    /// Dropping the returned future before it resolves abandons the handshake
    /// and returns the session to `Disconnected`.
    pub async fn connect(&self) -> Result<WalletSession, WalletError> {
        let attempt = {
            let mut state = self.state.write().await;
            if matches!(&*state, SessionState::Authorizing)
                && self.in_flight.load(Ordering::SeqCst) == 0
            {
                tracing::debug!("clearing abandoned authorization");
                *state = SessionState::Disconnected;
            }
            match &*state {
                SessionState::Authorized(session) => {
                    tracing::debug!(address = %session.address, "already authorized");
                    return Ok(session.clone());
                }
                SessionState::Authorizing | SessionState::Disconnecting => {
                    return Err(WalletError::AuthorizationInProgress);
                }
                SessionState::Disconnected => {}
            }

            if !self.adapter.is_available() {
                tracing::warn!("wallet signing capability unavailable");
                return Err(WalletError::CapabilityUnavailable);
            }
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.in_flight.store(attempt, Ordering::SeqCst);
            *state = SessionState::Authorizing;
            attempt
        };
        let mut handshake = Handshake {
            state: &self.state,
            in_flight: &self.in_flight,
            attempt,
            settled: false,
        };

        tracing::debug!(cluster = %self.config.cluster, "requesting wallet authorization");
        let outcome = match self
            .adapter
            .authorize(self.config.cluster, &self.config.identity)
            .await
        {
            Ok(result) => self.session_from(result).await,
            Err(e) => Err(handshake_error(e)),
        };

        let mut state = self.state.write().await;
        handshake.settled = true;
        if !matches!(&*state, SessionState::Authorizing)
            || self.in_flight.load(Ordering::SeqCst) != attempt
        {
            // disconnect() ran while the handshake was in flight
            drop(state);
            if let Ok(session) = &outcome {
                self.best_effort_deauthorize(session).await;
            }
            return Err(WalletError::AuthorizationFailed(
                "authorization cancelled".to_string(),
            ));
        }

        match outcome {
            Ok(session) => {
                tracing::info!(
                    address = %session.address,
                    kind = ?session.kind,
                    "wallet authorized"
                );
                *state = SessionState::Authorized(session.clone());
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet authorization failed");
                *state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Refresh the auth token of the current session.
    ///
    /// On failure the local session is cleared.
    pub async fn reauthorize(&self) -> Result<WalletSession, WalletError> {
        let current = self.connected_session().await?;

        match self
            .adapter
            .reauthorize(&current.auth_token, &self.config.identity)
            .await
        {
            Ok(result) => {
                let mut session = current;
                if let Some((repr, label)) = result.primary_key() {
                    match normalize_public_key(repr) {
                        Ok(address) => session.address = address,
                        Err(e) => tracing::warn!(
                            error = %e,
                            address = %session.address,
                            "reauthorized key does not normalize, keeping session address"
                        ),
                    }
                    if let Some(label) = label {
                        session.label = label.to_string();
                    }
                }
                session.auth_token = result.auth_token;
                if result.wallet_uri_base.is_some() {
                    session.wallet_uri_base = result.wallet_uri_base;
                }

                let mut state = self.state.write().await;
                if !matches!(&*state, SessionState::Authorized(_)) {
                    return Err(WalletError::NotConnected);
                }
                *state = SessionState::Authorized(session.clone());
                tracing::debug!(address = %session.address, "wallet reauthorized");
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet reauthorization failed, clearing session");
                *self.state.write().await = SessionState::Disconnected;
                Err(handshake_error(e))
            }
        }
    }

    /// Deauthorize remotely (best effort) and clear local state unconditionally.
    pub async fn disconnect(&self) {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, SessionState::Disconnecting)
        };

        if let SessionState::Authorized(session) = previous {
            self.best_effort_deauthorize(&session).await;
        }

        *self.state.write().await = SessionState::Disconnected;
        tracing::info!("wallet disconnected");
    }

    // ── Signing ──────────────────────────────────────────────────────────

    /// Sign exactly one transaction with the wallet and submit it.
    ///
    /// Returns the transaction signature assigned by the network.
    pub async fn sign_and_submit(&self, transaction: Vec<u8>) -> Result<Signature, SdkError> {
        let signed = self.sign_transactions(vec![transaction]).await?;
        let signed_tx = signed
            .into_iter()
            .next()
            .ok_or(WalletError::UnexpectedSignatureCount {
                expected: 1,
                actual: 0,
            })?;

        let signature = self.rpc.send_raw_transaction(&signed_tx).await?;
        tracing::info!(%signature, "transaction submitted");
        Ok(signature)
    }

    /// Sign transactions without submitting them.
    pub async fn sign_transactions(
        &self,
        transactions: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        let session = self.signing_session().await?;
        let expected = transactions.len();
        let signed = self
            .adapter
            .sign_transactions(transactions, &session.auth_token)
            .await?;
        if signed.len() != expected {
            return Err(WalletError::UnexpectedSignatureCount {
                expected,
                actual: signed.len(),
            });
        }
        Ok(signed)
    }

    /// Sign arbitrary messages with the session's account.
    pub async fn sign_messages(&self, messages: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, WalletError> {
        let session = self.signing_session().await?;
        let expected = messages.len();
        let signatures = self
            .adapter
            .sign_messages(messages, &session.address, &session.auth_token)
            .await?;
        if signatures.len() != expected {
            return Err(WalletError::UnexpectedSignatureCount {
                expected,
                actual: signatures.len(),
            });
        }
        Ok(signatures)
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn session_from(&self, result: AuthorizationResult) -> Result<WalletSession, WalletError> {
        let (repr, label) = result
            .primary_key()
            .ok_or(WalletError::NoAddressReceived)?;

        match normalize_public_key(repr) {
            Ok(address) => Ok(WalletSession {
                address,
                label: label.unwrap_or(DEFAULT_ACCOUNT_LABEL).to_string(),
                kind: SessionKind::Connected,
                wallet_uri_base: result.wallet_uri_base.clone(),
                auth_token: result.auth_token.clone(),
            }),
            Err(e) if self.config.demo_fallback => {
                tracing::warn!(error = %e, "address normalization failed, falling back to demo session");
                if let Err(e) = self.adapter.deauthorize(&result.auth_token).await {
                    tracing::debug!(error = %e, "deauthorize after demo fallback failed");
                }
                Ok(WalletSession::demo())
            }
            Err(e) => Err(WalletError::AddressNormalizationFailed(e)),
        }
    }

    async fn connected_session(&self) -> Result<WalletSession, WalletError> {
        match &*self.state.read().await {
            SessionState::Authorized(session) if session.kind == SessionKind::Connected => {
                Ok(session.clone())
            }
            _ => Err(WalletError::NotConnected),
        }
    }

    async fn signing_session(&self) -> Result<WalletSession, WalletError> {
        let session = self.connected_session().await?;
        if !self.adapter.is_available() {
            return Err(WalletError::CapabilityUnavailable);
        }
        Ok(session)
    }

    async fn best_effort_deauthorize(&self, session: &WalletSession) {
        if session.kind != SessionKind::Connected {
            return;
        }
        if let Err(e) = self.adapter.deauthorize(&session.auth_token).await {
            tracing::warn!(error = %e, "remote deauthorization failed");
        }
    }
}

/// Releases the in-flight marker of one `connect()` handshake. When the
/// handshake is dropped before it settles, a session still `Authorizing` for
/// it goes back to `Disconnected`.
struct Handshake<'a> {
    state: &'a RwLock<SessionState>,
    in_flight: &'a AtomicU64,
    attempt: u64,
    settled: bool,
}

impl Drop for Handshake<'_> {
    fn drop(&mut self) {
        let ours = self
            .in_flight
            .compare_exchange(self.attempt, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if self.settled || !ours {
            return;
        }
        tracing::debug!("authorization handshake abandoned");
        // A contended lock leaves `Authorizing` behind; the next connect()
        // clears it because nothing is in flight.
        if let Some(mut state) = self.state.try_write() {
            if matches!(&*state, SessionState::Authorizing) {
                *state = SessionState::Disconnected;
            }
        }
    }
}

fn handshake_error(e: WalletError) -> WalletError {
    match e {
        WalletError::CapabilityUnavailable | WalletError::AuthorizationFailed(_) => e,
        other => WalletError::AuthorizationFailed(other.to_string()),
    }
}
