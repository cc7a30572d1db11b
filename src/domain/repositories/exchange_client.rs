//! Exchange Client Trait
//!
//! Interface the trading cycle uses to read market state and submit orders.
//! The read operations never fail: implementations log transport, status and
//! parse problems and return an empty or zero value so the cycle always has
//! something usable. Order placement is the only fallible call.

use crate::domain::entities::balance::BalanceSnapshot;
use crate::domain::entities::market::{CandleInterval, Market};
use crate::domain::entities::order::{OrderReceipt, OrderRequest};
use crate::domain::entities::order_book::OrderBookSnapshot;
use crate::domain::errors::ExchangeError;
use crate::domain::services::indicators::CandleSeries;
use crate::domain::value_objects::price::Price;
use async_trait::async_trait;

/// Common result type for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the name of this exchange
    fn name(&self) -> &str;

    /// Quote/base balances for the configured market, zero on failure
    async fn get_balances(&self) -> BalanceSnapshot;

    /// Last trade price, [`Price::ZERO`] on failure
    async fn get_current_price(&self, market: &Market) -> Price;

    /// Top of book, empty on failure
    async fn get_order_book(&self, market: &Market) -> OrderBookSnapshot;

    /// Up to `count` candles ascending by timestamp, empty on failure
    async fn get_candles(
        &self,
        market: &Market,
        interval: CandleInterval,
        count: u32,
    ) -> CandleSeries;

    /// Submit a market order
    ///
    /// # Returns
    /// The exchange acknowledgement; `ExchangeError::OrderRejected` carries
    /// the status and body of a non-success response.
    async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderReceipt>;
}
