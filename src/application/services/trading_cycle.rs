//! One decision cycle: read market state, decide, execute, record.

use crate::application::services::decision_oracle::{DecisionInput, DecisionOracle};
use crate::application::services::order_executor::{ExecutionOutcome, OrderExecutor};
use crate::domain::entities::balance::BalanceSnapshot;
use crate::domain::entities::decision::Decision;
use crate::domain::entities::market::{CandleInterval, Market};
use crate::domain::errors::OracleError;
use crate::domain::repositories::context_source::ContextSource;
use crate::domain::repositories::exchange_client::ExchangeClient;
use crate::domain::services::indicators::enrich;
use crate::persistence::models::{NewTradeRecord, TradeRecord};
use crate::persistence::repository::TradeLedger;
use crate::persistence::DatabaseError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Trade ledger error: {0}")]
    Ledger(#[from] DatabaseError),
}

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub market: Market,
    pub daily_candle_count: u32,
    pub hourly_candle_count: u32,
    pub hourly_interval: CandleInterval,
    pub recent_window: chrono::Duration,
    pub settle_delay: Duration,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            market: Market::default(),
            daily_candle_count: 30,
            hourly_candle_count: 24,
            hourly_interval: CandleInterval::Minutes(60),
            recent_window: chrono::Duration::days(7),
            settle_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub decision: Decision,
    pub outcome: ExecutionOutcome,
    pub record: TradeRecord,
}

pub struct TradingCycle {
    exchange: Arc<dyn ExchangeClient>,
    oracle: DecisionOracle,
    executor: OrderExecutor,
    ledger: Arc<TradeLedger>,
    context_sources: Vec<Box<dyn ContextSource>>,
    settings: CycleSettings,
}

impl TradingCycle {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        oracle: DecisionOracle,
        executor: OrderExecutor,
        ledger: Arc<TradeLedger>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            exchange,
            oracle,
            executor,
            ledger,
            context_sources: Vec::new(),
            settings,
        }
    }

    pub fn with_context_source(mut self, source: Box<dyn ContextSource>) -> Self {
        self.context_sources.push(source);
        self
    }

    async fn gather_context(&self) -> Vec<(String, String)> {
        let mut sections = Vec::new();
        for source in &self.context_sources {
            if let Some(text) = source.fetch().await {
                sections.push((source.name().to_string(), text));
            }
        }
        sections
    }

    /// Run one cycle. A row is appended for every parsed decision; a
    /// malformed decision aborts before any order or row.
    pub async fn run_once(&self) -> Result<CycleReport, CycleError> {
        let market = &self.settings.market;

        let balances = self.exchange.get_balances().await;
        let order_book = self.exchange.get_order_book(market).await;
        let price = self.exchange.get_current_price(market).await;
        debug!(
            "{}: {:.0} {} / {:.8} {} at {:.0}",
            market,
            balances.quote_balance,
            market.quote,
            balances.base_balance,
            market.base,
            price.value()
        );

        let daily = self
            .exchange
            .get_candles(market, CandleInterval::Day, self.settings.daily_candle_count)
            .await;
        let hourly = self
            .exchange
            .get_candles(
                market,
                self.settings.hourly_interval,
                self.settings.hourly_candle_count,
            )
            .await;

        let input = DecisionInput {
            asset: market.base.clone(),
            balances,
            order_book,
            daily: enrich(&daily),
            hourly: enrich(&hourly),
            recent_trades: self.ledger.recent(self.settings.recent_window).await?,
            context: self.gather_context().await,
        };

        let verdict = self.oracle.decide(&input).await?;
        let outcome = self
            .executor
            .execute(&verdict.decision, &balances, price)
            .await;
        info!("Execution outcome: {}", outcome);

        tokio::time::sleep(self.settings.settle_delay).await;
        let settled: BalanceSnapshot = self.exchange.get_balances().await;
        if settled_read_failed(&balances, &settled) {
            warn!(
                "Post-trade balances for {} came back empty; recording a zero total asset",
                market
            );
        }

        let record = self
            .ledger
            .record(NewTradeRecord {
                timestamp: Utc::now(),
                decision: verdict.decision.action().as_str().to_string(),
                percentage: i64::from(verdict.decision.percentage()),
                reason: verdict.decision.reason().to_string(),
                base_balance: settled.base_balance,
                quote_balance: settled.quote_balance,
                base_avg_buy_price: settled.base_avg_buy_price,
                base_price: price.value(),
                total_asset: settled.total_value(price),
                reflection: verdict.reflection,
            })
            .await?;

        info!(
            "Recorded cycle #{}: {} {}%, total asset {:.0} {}",
            record.id, record.decision, record.percentage, record.total_asset, market.quote
        );

        Ok(CycleReport {
            decision: verdict.decision,
            outcome,
            record,
        })
    }
}

/// An all-zero snapshot after a non-empty one is the gateway's failed-read
/// value, not a real balance.
fn settled_read_failed(before: &BalanceSnapshot, settled: &BalanceSnapshot) -> bool {
    *settled == BalanceSnapshot::empty() && *before != BalanceSnapshot::empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_read_failure_detection() {
        let funded = BalanceSnapshot::new(100_000.0, 0.0, 0.0);
        let traded = BalanceSnapshot::new(50_025.0, 0.0005, 90_000_000.0);

        assert!(settled_read_failed(&funded, &BalanceSnapshot::empty()));
        assert!(!settled_read_failed(&funded, &traded));
        assert!(!settled_read_failed(
            &BalanceSnapshot::empty(),
            &BalanceSnapshot::empty()
        ));
    }
}
