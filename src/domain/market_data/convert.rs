//! DexScreener pairs and RugCheck summaries → [`TokenOverview`] / [`SafetyReport`].

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::{RiskLevel, SafetyReport, SafetyRisk, TokenOverview};
use crate::shared::json::{decimal_field, path, str_field, value_to_decimal};
use crate::shared::CanonicalAddress;

fn nested_decimal(raw: &Value, dotted: &str) -> Option<Decimal> {
    path(raw, dotted).and_then(value_to_decimal)
}

/// Base-token mint of a pair, if it is a valid address.
pub fn pair_mint(pair: &Value) -> Option<CanonicalAddress> {
    path(pair, "baseToken.address")
        .and_then(Value::as_str)
        .and_then(|s| CanonicalAddress::from_str(s).ok())
}

pub fn overview_from_pair(mint: CanonicalAddress, pair: &Value) -> TokenOverview {
    let base = pair.get("baseToken").unwrap_or(&Value::Null);
    TokenOverview {
        mint,
        symbol: str_field(base, &["symbol"]),
        name: str_field(base, &["name"]),
        price_usd: decimal_field(pair, &["priceUsd"]),
        liquidity_usd: nested_decimal(pair, "liquidity.usd"),
        volume_24h: nested_decimal(pair, "volume.h24"),
        price_change_24h: nested_decimal(pair, "priceChange.h24"),
        pair_address: str_field(pair, &["pairAddress"]),
        dex: str_field(pair, &["dexId"]),
        safety: None,
    }
}

/// Deepest pair per base mint, in first-seen order.
pub fn best_pairs(pairs: &[Value]) -> Vec<(CanonicalAddress, &Value)> {
    let mut order = Vec::new();
    let mut best: HashMap<CanonicalAddress, &Value> = HashMap::new();
    for pair in pairs {
        let Some(mint) = pair_mint(pair) else {
            continue;
        };
        let liquidity = nested_decimal(pair, "liquidity.usd").unwrap_or_default();
        let deeper = match best.get(&mint) {
            None => {
                order.push(mint);
                true
            }
            Some(current) => {
                liquidity > nested_decimal(current, "liquidity.usd").unwrap_or_default()
            }
        };
        if deeper {
            best.insert(mint, pair);
        }
    }
    order
        .into_iter()
        .filter_map(|mint| best.get(&mint).map(|pair| (mint, *pair)))
        .collect()
}

pub fn safety_report(raw: &Value) -> SafetyReport {
    let risks: Vec<SafetyRisk> = raw
        .get("risks")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(risk).collect())
        .unwrap_or_default();

    let score = decimal_field(raw, &["score_normalised", "scoreNormalised", "score_normalized"]);

    let risk_level = match risks.iter().map(|r| r.level).max() {
        Some(level) => level,
        None if score.is_some() => RiskLevel::Good,
        None => RiskLevel::Unknown,
    };

    SafetyReport {
        score,
        risk_level,
        risks,
    }
}

fn risk(raw: &Value) -> SafetyRisk {
    SafetyRisk {
        name: str_field(raw, &["name"]).unwrap_or_default(),
        description: str_field(raw, &["description"]),
        level: match str_field(raw, &["level"]).as_deref() {
            Some("danger") => RiskLevel::Danger,
            Some("warn" | "warning") => RiskLevel::Warning,
            Some(_) => RiskLevel::Good,
            None => RiskLevel::Unknown,
        },
        score: decimal_field(raw, &["score"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn pair(mint: &str, liquidity: f64, dex: &str) -> Value {
        json!({
            "dexId": dex,
            "pairAddress": format!("{dex}-pair"),
            "baseToken": { "address": mint, "symbol": "BONK", "name": "Bonk" },
            "priceUsd": "0.00002",
            "liquidity": { "usd": liquidity },
            "volume": { "h24": 1000 },
            "priceChange": { "h24": -3.5 }
        })
    }

    #[test]
    fn test_best_pair_is_deepest() {
        let pairs = vec![pair(BONK, 10.0, "orca"), pair(BONK, 500.0, "raydium"), pair("bad", 1e9, "x")];
        let best = best_pairs(&pairs);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].1["dexId"], "raydium");
    }

    #[test]
    fn test_overview_fields() {
        let mint = CanonicalAddress::from_str(BONK).unwrap();
        let o = overview_from_pair(mint, &pair(BONK, 500.0, "raydium"));
        assert_eq!(o.symbol.as_deref(), Some("BONK"));
        assert_eq!(o.price_usd, Some(Decimal::from_str("0.00002").unwrap()));
        assert_eq!(o.price_change_24h, Some(Decimal::from_str("-3.5").unwrap()));
        assert_eq!(o.dex.as_deref(), Some("raydium"));
    }

    #[test]
    fn test_safety_uses_normalised_score_and_worst_level() {
        let raw = json!({
            "score": 4101,
            "score_normalised": 41,
            "risks": [
                { "name": "Low liquidity", "level": "warn", "score": 100 },
                { "name": "Mutable metadata", "level": "danger", "score": 4000 }
            ]
        });
        let report = safety_report(&raw);
        assert_eq!(report.score, Some(Decimal::from(41)));
        assert_eq!(report.risk_level, RiskLevel::Danger);
        assert_eq!(report.risks.len(), 2);
    }

    #[test]
    fn test_safety_without_score_is_none() {
        let report = safety_report(&json!({ "score": 12 }));
        assert_eq!(report.score, None);
        assert_eq!(report.risk_level, RiskLevel::Unknown);
    }
}
