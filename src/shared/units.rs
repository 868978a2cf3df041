//! Pure conversions between on-chain integer units and display amounts.

use rust_decimal::Decimal;

use crate::network::LAMPORTS_PER_SOL;

/// Convert lamports to SOL without rounding.
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_lamports_to_sol_exact() {
        assert_eq!(lamports_to_sol(0), Decimal::ZERO);
        assert_eq!(lamports_to_sol(1_000_000_000), Decimal::ONE);
        assert_eq!(
            lamports_to_sol(1_500_000_001),
            Decimal::from_str("1.500000001").unwrap()
        );
        assert_eq!(
            lamports_to_sol(1),
            Decimal::from_str("0.000000001").unwrap()
        );
    }

    #[test]
    fn test_lamports_to_sol_large_balance() {
        assert_eq!(
            lamports_to_sol(u64::MAX),
            Decimal::from_str("18446744073.709551615").unwrap()
        );
    }
}
