//! Upstream lending records → tagged [`LendingEntry`] / [`LendingPosition`].

use rust_decimal::Decimal;
use serde_json::Value;

use super::{LendingEntry, LendingPosition, LendingSource};
use crate::domain::{AggregatedEntry, PositionSide, Protocol, UserPosition};
use crate::shared::json::{decimal_field, list_payload, path, str_field, value_to_decimal};

const ID_KEYS: &[&str] = &["reserve", "address", "strategy", "bankAddress", "group", "id", "pubkey"];

// ── Entries ──────────────────────────────────────────────────────────────────

/// Tag every listed record with `source`. Records without an id are dropped.
pub fn entries(source: LendingSource, records: Vec<Value>) -> Vec<LendingEntry> {
    records
        .into_iter()
        .filter_map(|raw| {
            let entry = entry(source, raw);
            if entry.is_none() {
                tracing::debug!(%source, "dropping upstream record without id");
            }
            entry
        })
        .collect()
}

pub fn entry(source: LendingSource, raw: Value) -> Option<LendingEntry> {
    let id = str_field(&raw, ID_KEYS)?;
    let name = entry_name(source, &raw).unwrap_or_else(|| id.clone());

    let apy = match source {
        LendingSource::KaminoLend => decimal_field(&raw, &["supplyApy", "supply_apy", "apy"]),
        LendingSource::KaminoVault => decimal_field(&raw, &["apy", "apy7d", "apy24h"])
            .or_else(|| path(&raw, "metrics.apy").and_then(value_to_decimal)),
        LendingSource::KaminoLiquidity => path(&raw, "apy.vault.totalApy")
            .and_then(value_to_decimal)
            .or_else(|| decimal_field(&raw, &["apy", "totalApy"])),
        LendingSource::MarginFiBank => {
            decimal_field(&raw, &["lendingRate", "depositRate", "supplyApy", "apy"])
        }
        LendingSource::MarginFiMarket => decimal_field(&raw, &["apy", "averageApy"]),
    };

    let tvl = decimal_field(
        &raw,
        &["totalSupplyUsd", "tvl", "totalValueLocked", "totalDepositsUsd", "tvlUsd"],
    );

    let collateral_factor = match source {
        LendingSource::KaminoLend => decimal_field(&raw, &["maxLtv", "loanToValue"]),
        LendingSource::MarginFiBank => {
            decimal_field(&raw, &["assetWeightInit", "collateralFactor"])
        }
        LendingSource::KaminoVault
        | LendingSource::KaminoLiquidity
        | LendingSource::MarginFiMarket => None,
    };

    let utilization = decimal_field(&raw, &["utilization", "utilizationRate"])
        .or_else(|| utilization_from_totals(&raw));

    Some(AggregatedEntry {
        id,
        source,
        name,
        apy,
        tvl,
        collateral_factor,
        utilization,
        raw,
    })
}

fn entry_name(source: LendingSource, raw: &Value) -> Option<String> {
    match source {
        LendingSource::KaminoLend => str_field(raw, &["liquidityToken", "symbol", "name"]),
        LendingSource::KaminoVault => str_field(raw, &["name"])
            .or_else(|| path(raw, "state.name").and_then(Value::as_str).map(str::to_string)),
        LendingSource::KaminoLiquidity => {
            match (str_field(raw, &["tokenA"]), str_field(raw, &["tokenB"])) {
                (Some(a), Some(b)) => Some(format!("{a}-{b}")),
                _ => str_field(raw, &["name"]),
            }
        }
        LendingSource::MarginFiBank => str_field(raw, &["tokenSymbol", "symbol", "name"]),
        LendingSource::MarginFiMarket => str_field(raw, &["name", "label"]),
    }
}

fn utilization_from_totals(raw: &Value) -> Option<Decimal> {
    let borrowed = decimal_field(raw, &["totalBorrow", "totalBorrows", "totalBorrowUsd"])?;
    let supplied = decimal_field(raw, &["totalSupply", "totalDeposits", "totalSupplyUsd"])?;
    if supplied.is_zero() {
        return None;
    }
    borrowed.checked_div(supplied)
}

// ── Positions ────────────────────────────────────────────────────────────────

/// Flatten one protocol's account payload into positions.
pub fn positions(protocol: Protocol, records: Vec<Value>) -> Vec<LendingPosition> {
    match protocol {
        Protocol::Kamino => records.iter().flat_map(kamino_obligation).collect(),
        Protocol::MarginFi => records.iter().flat_map(marginfi_account).collect(),
        Protocol::Meteora => Vec::new(),
    }
}

fn kamino_obligation(obligation: &Value) -> Vec<LendingPosition> {
    let threshold = decimal_field(obligation, &["liquidationLtv", "liquidationThreshold"])
        .or_else(|| path(obligation, "refreshedStats.liquidationLtv").and_then(value_to_decimal));
    let state = obligation.get("state").unwrap_or(obligation);

    let mut out = Vec::new();
    for (key, side) in [("deposits", PositionSide::Supply), ("borrows", PositionSide::Borrow)] {
        let items = state
            .get(key)
            .or_else(|| obligation.get(key))
            .cloned()
            .map(|v| list_payload(v, &[]))
            .unwrap_or_default();
        out.extend(items.into_iter().filter_map(|raw| {
            balance(
                LendingSource::KaminoLend,
                side,
                raw,
                &["reserve", "depositReserve", "borrowReserve", "reserveAddress"],
                threshold,
            )
        }));
    }
    out
}

fn marginfi_account(account: &Value) -> Vec<LendingPosition> {
    let items = account
        .get("balances")
        .cloned()
        .map(|v| list_payload(v, &[]))
        .unwrap_or_default();
    items
        .into_iter()
        .filter_map(|raw| {
            let side = match str_field(&raw, &["side", "type"]).as_deref() {
                Some("borrow" | "borrowing" | "liability" | "liabilities") => PositionSide::Borrow,
                _ => PositionSide::Supply,
            };
            let threshold = decimal_field(&raw, &["assetWeightMaint", "liquidationThreshold"]);
            balance(
                LendingSource::MarginFiBank,
                side,
                raw,
                &["bankAddress", "bank", "address"],
                threshold,
            )
        })
        .collect()
}

fn balance(
    source: LendingSource,
    side: PositionSide,
    raw: Value,
    id_keys: &[&str],
    liquidation_threshold: Option<Decimal>,
) -> Option<LendingPosition> {
    let entry_id = str_field(&raw, id_keys)?;
    let amount = decimal_field(
        &raw,
        &["amount", "depositedAmount", "borrowedAmount", "assetShares", "liabilityShares"],
    )
    .unwrap_or_default();
    let value = decimal_field(
        &raw,
        &["marketValueUsd", "marketValueRefreshed", "valueUsd", "usdValue", "value"],
    )
    .unwrap_or_default();
    let apy = decimal_field(&raw, &["apy", "supplyApy", "borrowApy", "rate"]).unwrap_or_default();
    let earned =
        decimal_field(&raw, &["earned", "interestEarned", "earnedUsd"]).unwrap_or_default();

    Some(UserPosition {
        source,
        entry_id,
        side,
        amount,
        value,
        apy,
        earned,
        liquidation_threshold,
        raw,
    })
}
