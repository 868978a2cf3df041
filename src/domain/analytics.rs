//! Portfolio analytics over user positions.
//!
//! Pure functions over [`UserPosition`]s from any aggregator. Everything is
//! computed in `Decimal`; no value is estimated or randomized.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{PositionSide, UserPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PortfolioTotals {
    pub supplied: Decimal,
    pub borrowed: Decimal,
    pub earned: Decimal,
}

impl PortfolioTotals {
    pub fn net_value(&self) -> Decimal {
        self.supplied.saturating_sub(self.borrowed)
    }
}

/// Value-weighted net APY.
///
/// Supply positions add `value * apy`, borrow positions subtract it; the sum
/// is divided by the total supplied value. With only supply positions this is
/// the plain value-weighted average. `None` when nothing is supplied or the
/// weighted sums leave the `Decimal` range.
pub fn net_apy<'a, S: 'a>(positions: impl IntoIterator<Item = &'a UserPosition<S>>) -> Option<Decimal> {
    let mut weighted = Decimal::ZERO;
    let mut supplied = Decimal::ZERO;
    for p in positions {
        let weight = p.value.checked_mul(p.apy)?;
        match p.side {
            PositionSide::Supply => {
                weighted = weighted.checked_add(weight)?;
                supplied = supplied.checked_add(p.value)?;
            }
            PositionSide::Borrow => weighted = weighted.checked_sub(weight)?,
        }
    }
    if supplied.is_zero() {
        return None;
    }
    weighted.checked_div(supplied)
}

/// `Σ supply·threshold / Σ borrow`. Supplies without a liquidation threshold
/// count at full value. `None` when there is nothing borrowed or the sums
/// overflow.
pub fn health_factor<'a, S: 'a>(
    positions: impl IntoIterator<Item = &'a UserPosition<S>>,
) -> Option<Decimal> {
    let mut collateral = Decimal::ZERO;
    let mut debt = Decimal::ZERO;
    for p in positions {
        match p.side {
            PositionSide::Supply => {
                let weighted = p
                    .value
                    .checked_mul(p.liquidation_threshold.unwrap_or(Decimal::ONE))?;
                collateral = collateral.checked_add(weighted)?;
            }
            PositionSide::Borrow => debt = debt.checked_add(p.value)?,
        }
    }
    if debt.is_zero() {
        return None;
    }
    collateral.checked_div(debt)
}

/// Sums saturate at the `Decimal` bounds.
pub fn totals<'a, S: 'a>(positions: impl IntoIterator<Item = &'a UserPosition<S>>) -> PortfolioTotals {
    positions
        .into_iter()
        .fold(PortfolioTotals::default(), |mut acc, p| {
            match p.side {
                PositionSide::Supply => acc.supplied = acc.supplied.saturating_add(p.value),
                PositionSide::Borrow => acc.borrowed = acc.borrowed.saturating_add(p.value),
            }
            acc.earned = acc.earned.saturating_add(p.earned);
            acc
        })
}
