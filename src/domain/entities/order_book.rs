use serde::Serialize;

/// Top-of-book summary for one market
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OrderBookSnapshot {
    pub best_ask_price: f64,
    pub best_bid_price: f64,
    pub total_ask_size: f64,
    pub total_bid_size: f64,
}

impl OrderBookSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.best_ask_price == 0.0 && self.best_bid_price == 0.0
    }
}
