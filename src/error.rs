//! Unified SDK error types.

use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Aggregator error: {0}")]
    Aggregator(#[from] AggregatorError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// HTTP-layer errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Timeout")]
    Timeout,

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Public-key normalization errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58 address: {0}")]
    InvalidBase58(String),

    #[error("invalid base64 public key: {0}")]
    InvalidBase64(String),

    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),

    #[error("empty public key")]
    Empty,
}

/// Wallet-adapter session errors.
#[derive(Error, Debug)]
pub enum WalletError {
    /// The native signing module is not present (sandboxed or preview runtime).
    #[error("Wallet signing capability unavailable")]
    CapabilityUnavailable,

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Authorization already in progress")]
    AuthorizationInProgress,

    #[error("No address received from wallet")]
    NoAddressReceived,

    #[error("Address normalization failed: {0}")]
    AddressNormalizationFailed(#[source] AddressError),

    #[error("Not connected")]
    NotConnected,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Expected {expected} signed payload(s), wallet returned {actual}")]
    UnexpectedSignatureCount { expected: usize, actual: usize },
}

/// Network-layer (balance / submission / confirmation) errors.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Balance query failed: {0}")]
    Balance(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Confirmation query failed: {0}")]
    Confirmation(String),

    #[error("Invalid transaction bytes: {0}")]
    InvalidTransaction(String),
}

/// Aggregator refresh and action-dispatch errors.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// One upstream call in a refresh batch (or an action call) failed.
    #[error("Upstream {source_tag} request failed: {message}")]
    UpstreamRequestFailed { source_tag: String, message: String },

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// The id is listed by more than one source.
    #[error("Entry {id} is listed by several sources ({sources})")]
    AmbiguousEntry { id: String, sources: String },

    /// The (source, action) pair has no upstream endpoint.
    #[error("Unsupported action {action} for {source_tag}")]
    UnsupportedAction { source_tag: String, action: String },
}

impl AggregatorError {
    pub(crate) fn upstream(source_tag: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        AggregatorError::UpstreamRequestFailed {
            source_tag: source_tag.to_string(),
            message: err.to_string(),
        }
    }
}
