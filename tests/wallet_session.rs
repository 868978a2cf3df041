//! Authorization session lifecycle against an in-memory wallet adapter.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{base64_key, session_with, wallet_address, MockAdapter, MockRpc, WALLET_BYTES};
use defi_wallet_sdk::error::{SdkError, WalletError};
use defi_wallet_sdk::shared::{CanonicalAddress, PublicKeyRepr};
use defi_wallet_sdk::wallet::{SessionKind, SessionState, DEMO_SESSION_LABEL};
use tokio_test::{assert_err, assert_ok};

fn parts() -> (Arc<MockAdapter>, Arc<MockRpc>) {
    (Arc::new(MockAdapter::new()), Arc::new(MockRpc::new(0)))
}

#[tokio::test]
async fn base64_account_becomes_canonical_address() {
    let (adapter, rpc) = parts();
    let session = session_with(adapter, rpc, false);

    let s = assert_ok!(session.connect().await);
    assert_eq!(s.address, CanonicalAddress::from_bytes(WALLET_BYTES));
    assert_eq!(s.address.to_string(), bs58::encode(WALLET_BYTES).into_string());
    assert_eq!(s.kind, SessionKind::Connected);
    assert_eq!(s.label, "Phantom");
    assert_eq!(session.state().await.as_str(), "authorized");
}

#[tokio::test]
async fn connect_when_authorized_skips_handshake() {
    let (adapter, rpc) = parts();
    let session = session_with(adapter.clone(), rpc, false);

    let first = assert_ok!(session.connect().await);
    let second = assert_ok!(session.connect().await);
    assert_eq!(first, second);
    assert_eq!(adapter.authorize_calls(), 1);
}

#[tokio::test]
async fn concurrent_connect_is_rejected() {
    let (adapter, rpc) = parts();
    *adapter.authorize_delay.lock().unwrap() = Some(Duration::from_millis(50));
    let session = session_with(adapter.clone(), rpc, false);

    let (first, second) = tokio::join!(session.connect(), async {
        tokio::task::yield_now().await;
        session.connect().await
    });

    assert_ok!(first);
    assert!(matches!(second, Err(WalletError::AuthorizationInProgress)));
    assert_eq!(adapter.authorize_calls(), 1);
}

#[tokio::test]
async fn unavailable_capability_fails_fast() {
    let adapter = Arc::new(MockAdapter::unavailable());
    let session = session_with(adapter.clone(), Arc::new(MockRpc::new(0)), false);

    let err = assert_err!(session.connect().await);
    assert!(matches!(err, WalletError::CapabilityUnavailable));
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert_eq!(adapter.authorize_calls(), 0);
}

#[tokio::test]
async fn declined_authorization_leaves_disconnected() {
    let (adapter, rpc) = parts();
    adapter.fail_authorize.store(true, Ordering::SeqCst);
    let session = session_with(adapter, rpc, false);

    let err = assert_err!(session.connect().await);
    assert!(matches!(err, WalletError::AuthorizationFailed(_)));
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(session.session().await.is_none());
}

#[tokio::test]
async fn missing_account_is_reported() {
    let adapter = Arc::new(MockAdapter::new());
    *adapter.account.lock().unwrap() = None;
    let session = session_with(adapter, Arc::new(MockRpc::new(0)), false);

    assert!(matches!(
        session.connect().await,
        Err(WalletError::NoAddressReceived)
    ));
}

#[tokio::test]
async fn bad_key_without_fallback_fails() {
    let adapter = Arc::new(MockAdapter::with_account(PublicKeyRepr::from("not-a-key!!")));
    let session = session_with(adapter, Arc::new(MockRpc::new(0)), false);

    assert!(matches!(
        session.connect().await,
        Err(WalletError::AddressNormalizationFailed(_))
    ));
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn bad_key_with_fallback_yields_demo_session_that_cannot_sign() {
    let adapter = Arc::new(MockAdapter::with_account(PublicKeyRepr::Bytes(vec![1; 31])));
    let rpc = Arc::new(MockRpc::new(0));
    let session = session_with(adapter.clone(), rpc.clone(), true);

    let s = assert_ok!(session.connect().await);
    assert_eq!(s.kind, SessionKind::Demo);
    assert!(s.is_demo());
    assert!(s.address.is_placeholder());
    assert_eq!(s.label, DEMO_SESSION_LABEL);
    assert!(session.connected_address().await.is_none());

    let err = assert_err!(session.sign_and_submit(vec![1, 2, 3]).await);
    assert!(matches!(err, SdkError::Wallet(WalletError::NotConnected)));
    assert!(rpc.submitted.lock().unwrap().is_empty());
    assert_eq!(adapter.sign_calls.load(Ordering::SeqCst), 0);

    // demo sessions never call the wallet on disconnect
    let deauth_before = adapter.deauthorize_calls();
    session.disconnect().await;
    assert_eq!(adapter.deauthorize_calls(), deauth_before);
}

#[tokio::test]
async fn disconnect_always_ends_disconnected() {
    let (adapter, rpc) = parts();
    adapter.fail_deauthorize.store(true, Ordering::SeqCst);
    let session = session_with(adapter.clone(), rpc, false);

    assert_ok!(session.connect().await);
    session.disconnect().await;

    assert_eq!(adapter.deauthorize_calls(), 1);
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(session.session().await.is_none());

    // a second disconnect is a local no-op
    session.disconnect().await;
    assert_eq!(adapter.deauthorize_calls(), 1);
}

#[tokio::test]
async fn disconnect_during_handshake_cancels_connect() {
    let (adapter, rpc) = parts();
    *adapter.authorize_delay.lock().unwrap() = Some(Duration::from_millis(50));
    let session = session_with(adapter.clone(), rpc, false);

    let (connect, ()) = tokio::join!(session.connect(), async {
        tokio::task::yield_now().await;
        session.disconnect().await
    });

    assert!(matches!(connect, Err(WalletError::AuthorizationFailed(_))));
    assert_eq!(session.state().await, SessionState::Disconnected);
    // the token issued for the cancelled handshake is given back
    assert_eq!(adapter.deauthorize_calls(), 1);
}

#[tokio::test]
async fn abandoned_connect_does_not_block_the_next_one() {
    let (adapter, rpc) = parts();
    *adapter.authorize_delay.lock().unwrap() = Some(Duration::from_millis(200));
    let session = session_with(adapter.clone(), rpc, false);

    let timed_out = tokio::time::timeout(Duration::from_millis(20), session.connect()).await;
    assert!(timed_out.is_err());
    assert_eq!(session.state().await, SessionState::Disconnected);

    *adapter.authorize_delay.lock().unwrap() = None;
    let connected = assert_ok!(session.connect().await);
    assert_eq!(connected.address, wallet_address());
    assert_eq!(adapter.authorize_calls(), 2);
}

#[tokio::test]
async fn sign_and_submit_returns_network_signature() {
    let (adapter, rpc) = parts();
    let session = session_with(adapter, rpc.clone(), false);
    assert_ok!(session.connect().await);

    let signature = assert_ok!(session.sign_and_submit(vec![1, 2, 3]).await);
    assert_eq!(signature, rpc.signature);
    assert_eq!(*rpc.submitted.lock().unwrap(), vec![vec![1, 2, 3, 0xff]]);
}

#[tokio::test]
async fn sign_and_submit_requires_exactly_one_payload() {
    let (adapter, rpc) = parts();
    adapter.extra_signed.store(1, Ordering::SeqCst);
    let session = session_with(adapter, rpc.clone(), false);
    assert_ok!(session.connect().await);

    let err = assert_err!(session.sign_and_submit(vec![1]).await);
    assert!(matches!(
        err,
        SdkError::Wallet(WalletError::UnexpectedSignatureCount {
            expected: 1,
            actual: 2
        })
    ));
    assert!(rpc.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signing_requires_connection_and_capability() {
    let (adapter, rpc) = parts();
    let session = session_with(adapter.clone(), rpc, false);

    assert!(matches!(
        session.sign_messages(vec![b"hi".to_vec()]).await,
        Err(WalletError::NotConnected)
    ));

    assert_ok!(session.connect().await);
    adapter.available.store(false, Ordering::SeqCst);
    assert!(matches!(
        session.sign_transactions(vec![vec![1]]).await,
        Err(WalletError::CapabilityUnavailable)
    ));
}

#[tokio::test]
async fn reauthorize_rotates_token_and_keeps_address() {
    let (adapter, rpc) = parts();
    let session = session_with(adapter, rpc, false);
    let before = assert_ok!(session.connect().await);

    let after = assert_ok!(session.reauthorize().await);
    assert_eq!(after.address, before.address);
    assert_ne!(after, before);
    assert_eq!(session.session().await, Some(after));
}

#[tokio::test]
async fn reauthorize_with_unreadable_key_keeps_address() {
    let (adapter, rpc) = parts();
    let session = session_with(adapter.clone(), rpc, false);
    let before = assert_ok!(session.connect().await);

    *adapter.account.lock().unwrap() = Some(PublicKeyRepr::Bytes(vec![1, 2, 3]));
    let after = assert_ok!(session.reauthorize().await);
    assert_eq!(after.address, before.address);
    assert_eq!(after.kind, SessionKind::Connected);
    assert_eq!(session.connected_address().await, Some(before.address));
}

#[tokio::test]
async fn failed_reauthorize_clears_session() {
    let (adapter, rpc) = parts();
    adapter.fail_reauthorize.store(true, Ordering::SeqCst);
    let session = session_with(adapter, rpc, false);
    assert_ok!(session.connect().await);

    assert_err!(session.reauthorize().await);
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn legacy_public_key_wrapper_is_accepted() {
    let json = format!(r#"{{ "publicKey": "{}" }}"#, base64_key(&WALLET_BYTES));
    let repr: PublicKeyRepr = serde_json::from_str(&json).unwrap();
    let adapter = Arc::new(MockAdapter::with_account(repr));
    let session = session_with(adapter, Arc::new(MockRpc::new(0)), false);

    let s = assert_ok!(session.connect().await);
    assert_eq!(s.address, wallet_address());
}
