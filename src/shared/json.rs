//! Field extraction from opaque upstream JSON records.
//!
//! Upstream payloads are passed through untouched; these helpers pull the few
//! typed metrics the SDK needs out of them. Numbers may arrive as JSON numbers
//! or as numeric strings, and field names vary between services, so every
//! lookup takes a list of candidate keys and returns the first usable one.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// First string value among `keys`.
pub fn str_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(|v| v.as_str().map(str::to_string))
}

/// First numeric value among `keys`, accepting numbers and numeric strings.
pub fn decimal_field(record: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(value_to_decimal)
}

/// Look up a dotted path such as `"stats.apy"`.
pub fn path<'a>(record: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(record, |current, key| current.get(key))
}

pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::from_str(&f.to_string()).ok())
            }
        }
        Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .ok(),
        _ => None,
    }
}

/// Unwrap a list payload that may be a bare array or wrapped in a data key.
pub fn list_payload(payload: Value, keys: &[&str]) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
