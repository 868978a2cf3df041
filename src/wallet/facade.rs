//! Wallet facade — connect / disconnect / balance / sign for the application.
//!
//! Wraps an [`AuthorizationSession`] and keeps the balance of the connected
//! account fresh: it is fetched right after authorization and then polled on
//! a fixed interval until the session ends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_lock::RwLock;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use solana_signature::Signature;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::session::AuthorizationSession;
use super::{SessionKind, WalletSession};
use crate::error::{SdkError, WalletError};
use crate::network::DEFAULT_BALANCE_POLL_INTERVAL;
use crate::rpc::{ChainRpc, Commitment, ConfirmationStatus};
use crate::shared::{lamports_to_sol, CanonicalAddress};

/// Most recent successful balance poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub address: CanonicalAddress,
    pub lamports: u64,
    pub sol: Decimal,
    pub fetched_at: DateTime<Utc>,
}

/// Application-facing wallet handle.
pub struct Wallet {
    session: Arc<AuthorizationSession>,
    rpc: Arc<dyn ChainRpc>,
    balance: Arc<RwLock<Option<Balance>>>,
    poll_interval: Duration,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Wallet {
    pub fn new(session: Arc<AuthorizationSession>, rpc: Arc<dyn ChainRpc>) -> Self {
        Self::assemble(session, rpc, DEFAULT_BALANCE_POLL_INTERVAL)
    }

    /// Poll the balance every `poll_interval` instead of every 30 s.
    /// A zero interval is rejected.
    pub fn with_poll_interval(
        session: Arc<AuthorizationSession>,
        rpc: Arc<dyn ChainRpc>,
        poll_interval: Duration,
    ) -> Result<Self, SdkError> {
        if poll_interval.is_zero() {
            return Err(SdkError::Validation(
                "balance poll interval must be non-zero".into(),
            ));
        }
        Ok(Self::assemble(session, rpc, poll_interval))
    }

    fn assemble(
        session: Arc<AuthorizationSession>,
        rpc: Arc<dyn ChainRpc>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            session,
            rpc,
            balance: Arc::new(RwLock::new(None)),
            poll_interval,
            poll_task: Mutex::new(None),
        }
    }

    /// Shared handle to the underlying session, for aggregators that need the
    /// connected address.
    pub fn session_handle(&self) -> Arc<AuthorizationSession> {
        self.session.clone()
    }

    pub async fn session(&self) -> Option<WalletSession> {
        self.session.session().await
    }

    pub async fn is_connected(&self) -> bool {
        self.session.is_authorized().await
    }

    /// Last polled balance, if any.
    pub async fn balance(&self) -> Option<Balance> {
        self.balance.read().await.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Connect the wallet.
    ///
    /// Returns `Ok(None)` when the signing capability is unavailable; the
    /// application continues view-only in that case.
    pub async fn connect(&self) -> Result<Option<WalletSession>, SdkError> {
        let session = match self.session.connect().await {
            Ok(session) => session,
            Err(WalletError::CapabilityUnavailable) => {
                tracing::info!("signing capability unavailable, continuing view-only");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if session.kind == SessionKind::Connected {
            match self.refresh_balance().await {
                Ok(_) => {}
                Err(SdkError::Wallet(WalletError::NotConnected)) => {
                    tracing::debug!("disconnected before the first balance arrived");
                    return Ok(Some(session));
                }
                Err(e) => tracing::warn!(error = %e, "initial balance fetch failed"),
            }
            self.start_polling();
        }

        Ok(Some(session))
    }

    /// Stop polling, deauthorize, clear balance. Always ends disconnected.
    pub async fn disconnect(&self) {
        self.stop_polling();
        self.session.disconnect().await;
        *self.balance.write().await = None;
    }

    /// Poll the balance once.
    pub async fn refresh_balance(&self) -> Result<Balance, SdkError> {
        let address = self
            .session
            .connected_address()
            .await
            .ok_or(WalletError::NotConnected)?;
        let balance = fetch_balance(self.rpc.as_ref(), address).await?;
        let mut slot = self.balance.write().await;
        // disconnect() may have run while the query was pending
        if self.session.connected_address().await != Some(address) {
            return Err(WalletError::NotConnected.into());
        }
        *slot = Some(balance.clone());
        Ok(balance)
    }

    // ── Signing ──────────────────────────────────────────────────────────

    /// Sign one serialized transaction with the wallet and submit it.
    pub async fn sign_and_send(&self, transaction: Vec<u8>) -> Result<Signature, SdkError> {
        self.session.sign_and_submit(transaction).await
    }

    /// Sign, submit, then query the confirmation status once.
    pub async fn sign_and_confirm(
        &self,
        transaction: Vec<u8>,
        commitment: Commitment,
    ) -> Result<(Signature, ConfirmationStatus), SdkError> {
        let signature = self.session.sign_and_submit(transaction).await?;
        let status = self.rpc.confirm_transaction(&signature, commitment).await?;
        Ok((signature, status))
    }

    pub async fn sign_messages(&self, messages: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, SdkError> {
        Ok(self.session.sign_messages(messages).await?)
    }

    // ── Balance poll ─────────────────────────────────────────────────────

    fn start_polling(&self) {
        let Ok(mut guard) = self.poll_task.lock() else {
            return;
        };
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let session = self.session.clone();
        let rpc = self.rpc.clone();
        let balance = self.balance.clone();
        let interval = self.poll_interval;

        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately; connect() already fetched
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(address) = session.connected_address().await else {
                    tracing::debug!("session ended, stopping balance poll");
                    break;
                };
                match fetch_balance(rpc.as_ref(), address).await {
                    Ok(fresh) => {
                        let mut slot = balance.write().await;
                        if session.connected_address().await == Some(address) {
                            *slot = Some(fresh);
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "balance poll failed"),
                }
            }
        }));
        tracing::debug!(interval_secs = interval.as_secs(), "balance poll started");
    }

    fn stop_polling(&self) {
        if let Ok(mut guard) = self.poll_task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
                tracing::debug!("balance poll stopped");
            }
        }
    }
}

impl Drop for Wallet {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn fetch_balance(rpc: &dyn ChainRpc, address: CanonicalAddress) -> Result<Balance, SdkError> {
    let lamports = rpc.get_balance(&address).await?;
    Ok(Balance {
        address,
        lamports,
        sol: lamports_to_sol(lamports),
        fetched_at: Utc::now(),
    })
}
