//! Balance entity - account state read fresh from the exchange each cycle

use crate::domain::value_objects::price::Price;
use serde::Serialize;

/// Quote/base holdings of the account for the traded market
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BalanceSnapshot {
    /// Quote currency available (KRW)
    pub quote_balance: f64,
    /// Base asset held (BTC)
    pub base_balance: f64,
    /// Average buy price of the base asset in quote currency
    pub base_avg_buy_price: f64,
}

impl BalanceSnapshot {
    pub fn new(quote_balance: f64, base_balance: f64, base_avg_buy_price: f64) -> Self {
        Self {
            quote_balance,
            base_balance,
            base_avg_buy_price,
        }
    }

    /// Zero snapshot returned when the exchange cannot be read
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total account value in quote currency at `price`
    pub fn total_value(&self, price: Price) -> f64 {
        self.quote_balance + self.base_balance * price.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_value() {
        let balances = BalanceSnapshot::new(100_000.0, 0.5, 80_000_000.0);
        let price = Price::new(90_000_000.0).unwrap();
        assert_eq!(balances.total_value(price), 45_100_000.0);
    }

    #[test]
    fn test_empty_snapshot_is_zero() {
        let balances = BalanceSnapshot::empty();
        assert_eq!(balances.quote_balance, 0.0);
        assert_eq!(balances.base_balance, 0.0);
        assert_eq!(balances.total_value(Price::new(1.0).unwrap()), 0.0);
    }
}
