//! Native wallet adapter — signs with a local keypair.
//!
//! Only available with the `native-auth` feature. Speaks the same protocol as
//! a mobile wallet (base64 account addresses, opaque auth tokens) so CLIs and
//! integration environments can drive the session without a device.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use solana_keypair::Keypair;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;

use super::{
    AppIdentity, AuthToken, AuthorizationResult, AuthorizedAccount, Cluster, WalletAdapter,
};
use crate::error::WalletError;
use crate::shared::{CanonicalAddress, PublicKeyRepr};

/// Label reported for the keypair account.
pub const KEYPAIR_ACCOUNT_LABEL: &str = "Local Keypair";

/// [`WalletAdapter`] backed by an in-process keypair.
pub struct KeypairWalletAdapter {
    keypair: Keypair,
    issued_tokens: Mutex<HashSet<String>>,
}

impl KeypairWalletAdapter {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            issued_tokens: Mutex::new(HashSet::new()),
        }
    }

    pub fn address(&self) -> CanonicalAddress {
        CanonicalAddress::from(self.keypair.pubkey())
    }

    fn issue_token(&self) -> Result<AuthToken, WalletError> {
        let token = format!("{:032x}", rand::random::<u128>());
        self.issued_tokens
            .lock()
            .map_err(|_| WalletError::AuthorizationFailed("token store poisoned".into()))?
            .insert(token.clone());
        Ok(AuthToken::new(token))
    }

    fn check_token(&self, auth_token: &AuthToken) -> Result<(), WalletError> {
        let tokens = self
            .issued_tokens
            .lock()
            .map_err(|_| WalletError::AuthorizationFailed("token store poisoned".into()))?;
        if tokens.contains(auth_token.as_str()) {
            Ok(())
        } else {
            Err(WalletError::AuthorizationFailed("unknown auth token".into()))
        }
    }

    fn revoke_token(&self, auth_token: &AuthToken) -> Result<bool, WalletError> {
        Ok(self
            .issued_tokens
            .lock()
            .map_err(|_| WalletError::AuthorizationFailed("token store poisoned".into()))?
            .remove(auth_token.as_str()))
    }

    fn authorization(&self, auth_token: AuthToken) -> AuthorizationResult {
        AuthorizationResult {
            auth_token,
            accounts: vec![AuthorizedAccount {
                address: PublicKeyRepr::Text(self.address().to_base64()),
                label: Some(KEYPAIR_ACCOUNT_LABEL.to_string()),
            }],
            public_key: None,
            wallet_uri_base: None,
        }
    }

    fn sign_transaction(&self, bytes: &[u8]) -> Result<Vec<u8>, WalletError> {
        let mut tx: VersionedTransaction = bincode::deserialize(bytes)
            .map_err(|e| WalletError::SigningFailed(format!("invalid transaction: {e}")))?;

        let signer = self.keypair.pubkey();
        let required = tx.message.header().num_required_signatures as usize;
        let index = tx
            .message
            .static_account_keys()
            .iter()
            .take(required)
            .position(|key| *key == signer)
            .ok_or_else(|| {
                WalletError::SigningFailed(format!("{signer} is not a required signer"))
            })?;

        if tx.signatures.len() < required {
            tx.signatures.resize(required, Default::default());
        }
        tx.signatures[index] = self.keypair.sign_message(&tx.message.serialize());

        bincode::serialize(&tx)
            .map_err(|e| WalletError::SigningFailed(format!("serialize failed: {e}")))
    }
}

#[async_trait]
impl WalletAdapter for KeypairWalletAdapter {
    fn is_available(&self) -> bool {
        true
    }

    async fn authorize(
        &self,
        cluster: Cluster,
        identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError> {
        tracing::debug!(%cluster, app = %identity.name, "keypair adapter authorizing");
        Ok(self.authorization(self.issue_token()?))
    }

    async fn reauthorize(
        &self,
        auth_token: &AuthToken,
        _identity: &AppIdentity,
    ) -> Result<AuthorizationResult, WalletError> {
        if !self.revoke_token(auth_token)? {
            return Err(WalletError::AuthorizationFailed("unknown auth token".into()));
        }
        Ok(self.authorization(self.issue_token()?))
    }

    async fn deauthorize(&self, auth_token: &AuthToken) -> Result<(), WalletError> {
        if self.revoke_token(auth_token)? {
            Ok(())
        } else {
            Err(WalletError::AuthorizationFailed("unknown auth token".into()))
        }
    }

    async fn sign_transactions(
        &self,
        transactions: Vec<Vec<u8>>,
        auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        self.check_token(auth_token)?;
        transactions
            .iter()
            .map(|tx| self.sign_transaction(tx))
            .collect()
    }

    async fn sign_messages(
        &self,
        messages: Vec<Vec<u8>>,
        address: &CanonicalAddress,
        auth_token: &AuthToken,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        self.check_token(auth_token)?;
        if *address != self.address() {
            return Err(WalletError::SigningFailed(format!(
                "{address} is not managed by this adapter"
            )));
        }
        Ok(messages
            .iter()
            .map(|m| self.keypair.sign_message(m).as_ref().to_vec())
            .collect())
    }
}
