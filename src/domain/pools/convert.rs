//! Meteora pool records → tagged [`PoolEntry`] / [`PoolPosition`].

use serde_json::Value;

use super::{PoolEntry, PoolPosition, PoolSource};
use crate::domain::{AggregatedEntry, PositionSide, UserPosition};
use crate::shared::json::{decimal_field, str_field};

pub fn entries(source: PoolSource, records: Vec<Value>) -> Vec<PoolEntry> {
    records
        .into_iter()
        .filter_map(|raw| entry(source, raw))
        .collect()
}

pub fn entry(source: PoolSource, raw: Value) -> Option<PoolEntry> {
    let id = str_field(&raw, &["address", "pool_address", "pair_address", "pubkey"])?;
    let name = str_field(&raw, &["name", "pool_name"]).unwrap_or_else(|| id.clone());
    let apy = decimal_field(&raw, &["apy", "apr", "daily_base_apy"]);
    let tvl = decimal_field(&raw, &["liquidity", "pool_tvl", "tvl"]);

    Some(AggregatedEntry {
        id,
        source,
        name,
        apy,
        tvl,
        collateral_factor: None,
        utilization: None,
        raw,
    })
}

/// Liquidity positions are always on the supply side.
pub fn positions(source: PoolSource, records: Vec<Value>) -> Vec<PoolPosition> {
    records
        .into_iter()
        .filter_map(|raw| {
            let entry_id = str_field(&raw, &["pair_address", "pool_address", "pool", "lb_pair"])?;
            Some(UserPosition {
                source,
                entry_id,
                side: PositionSide::Supply,
                amount: decimal_field(&raw, &["amount", "liquidity", "lp_amount"])
                    .unwrap_or_default(),
                value: decimal_field(&raw, &["total_value_usd", "value_usd", "value"])
                    .unwrap_or_default(),
                apy: decimal_field(&raw, &["apy", "apr"]).unwrap_or_default(),
                earned: decimal_field(&raw, &["fee_earned_usd", "total_fee_usd_claimed", "earned"])
                    .unwrap_or_default(),
                liquidation_threshold: None,
                raw,
            })
        })
        .collect()
}
