//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Trade ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TradeRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub decision: String, // "buy", "sell" or "hold"
    pub percentage: i64,
    pub reason: String,
    pub base_balance: f64,
    pub quote_balance: f64,
    pub base_avg_buy_price: f64,
    pub base_price: f64,
    pub total_asset: f64,
    pub reflection: String,
}

impl TradeRecord {
    /// Account value recomputed from the row's balances and price
    pub fn total_value(&self) -> f64 {
        self.quote_balance + self.base_balance * self.base_price
    }
}

/// Create trade input
#[derive(Debug, Clone)]
pub struct NewTradeRecord {
    pub timestamp: DateTime<Utc>,
    pub decision: String,
    pub percentage: i64,
    pub reason: String,
    pub base_balance: f64,
    pub quote_balance: f64,
    pub base_avg_buy_price: f64,
    pub base_price: f64,
    pub total_asset: f64,
    pub reflection: String,
}
