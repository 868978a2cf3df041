//! Domain modules organized as vertical slices.
//!
//! Each aggregator sub-module contains:
//! - `mod.rs` — Source/action enums, exhaustive routing, the aggregator itself
//! - `convert.rs` — Opaque upstream JSON → tagged domain records
//! - `upstream.rs` — HTTP backend for the real services (feature `http`)
//!
//! All aggregator state is refresh-replace: a refresh publishes a brand new
//! [`snapshot::Snapshot`] or nothing at all.

pub mod analytics;
pub mod lending;
pub mod market_data;
pub mod pools;
pub mod snapshot;

use std::fmt;

use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SdkError;

// ============================================================================
// Protocol tags
// ============================================================================

/// Upstream protocol a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Kamino,
    MarginFi,
    Meteora,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kamino => "kamino",
            Self::MarginFi => "marginfi",
            Self::Meteora => "meteora",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of product an entry is within its protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Lend,
    Vault,
    Liquidity,
    Bank,
    Market,
}

/// A closed set of upstream sources. Every source maps to exactly one
/// protocol and one entry kind.
pub trait SourceTag: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn protocol(&self) -> Protocol;
    fn kind(&self) -> EntryKind;
}

// ============================================================================
// Aggregated records
// ============================================================================

/// One market / vault / pool listed by an upstream, tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEntry<S> {
    pub id: String,
    pub source: S,
    pub name: String,
    pub apy: Option<Decimal>,
    pub tvl: Option<Decimal>,
    pub collateral_factor: Option<Decimal>,
    pub utilization: Option<Decimal>,
    /// The upstream record, untouched.
    pub raw: Value,
}

impl<S: SourceTag> AggregatedEntry<S> {
    pub fn protocol(&self) -> Protocol {
        self.source.protocol()
    }

    pub fn kind(&self) -> EntryKind {
        self.source.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Supply,
    Borrow,
}

/// A user's holding in one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPosition<S> {
    pub source: S,
    pub entry_id: String,
    pub side: PositionSide,
    pub amount: Decimal,
    /// Value in USD.
    pub value: Decimal,
    pub apy: Decimal,
    pub earned: Decimal,
    pub liquidation_threshold: Option<Decimal>,
    pub raw: Value,
}

// ============================================================================
// Action receipts
// ============================================================================

/// Result of a dispatched action: the upstream response, untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReceipt<S, A> {
    pub source: S,
    pub action: A,
    pub entry_id: String,
    pub response: Value,
}

const TRANSACTION_KEYS: [&str; 4] = ["transaction", "tx", "serializedTransaction", "serialized_tx"];

impl<S, A> ActionReceipt<S, A> {
    /// The base64 transaction the upstream built for the wallet to sign, if any.
    pub fn transaction(&self) -> Result<Option<Vec<u8>>, SdkError> {
        extract_transaction(&self.response)
    }
}

/// Decode the base64 transaction carried by an upstream builder response,
/// either at the top level or under `data`.
pub fn extract_transaction(response: &Value) -> Result<Option<Vec<u8>>, SdkError> {
    let encoded = TRANSACTION_KEYS.iter().find_map(|k| {
        response
            .get(*k)
            .or_else(|| response.get("data").and_then(|d| d.get(*k)))
            .and_then(Value::as_str)
    });
    match encoded {
        None => Ok(None),
        Some(s) => base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map(Some)
            .map_err(|e| SdkError::Validation(format!("invalid base64 transaction: {e}"))),
    }
}
