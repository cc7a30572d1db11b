//! Order executor
//!
//! Turns a validated decision into at most one market order. Sizing and the
//! minimum-notional guard live in [`plan_order`]; this service performs the
//! exchange call and reports what happened. Failed submissions are logged
//! and not retried.

use crate::domain::entities::balance::BalanceSnapshot;
use crate::domain::entities::decision::{Decision, TradeAction};
use crate::domain::entities::market::Market;
use crate::domain::entities::order::{OrderReceipt, OrderRequest};
use crate::domain::repositories::exchange_client::ExchangeClient;
use crate::domain::services::order_planner::{plan_order, OrderLimits, OrderPlan};
use crate::domain::value_objects::price::Price;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Placed(OrderReceipt),
    Held,
    BelowMinimum {
        action: TradeAction,
        notional: f64,
        min_notional: f64,
    },
    Failed {
        reason: String,
    },
}

impl ExecutionOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, ExecutionOutcome::Placed(_))
    }
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionOutcome::Placed(receipt) => write!(f, "order placed ({})", receipt.uuid),
            ExecutionOutcome::Held => write!(f, "held"),
            ExecutionOutcome::BelowMinimum {
                action,
                notional,
                min_notional,
            } => write!(
                f,
                "{} skipped: {:.2} is not above the {:.0} minimum",
                action, notional, min_notional
            ),
            ExecutionOutcome::Failed { reason } => write!(f, "order failed: {}", reason),
        }
    }
}

pub struct OrderExecutor {
    exchange: Arc<dyn ExchangeClient>,
    market: Market,
    limits: OrderLimits,
}

impl OrderExecutor {
    pub fn new(exchange: Arc<dyn ExchangeClient>, market: Market, limits: OrderLimits) -> Self {
        Self {
            exchange,
            market,
            limits,
        }
    }

    /// Market buy spending `quote_amount` of the quote currency
    pub async fn buy(&self, quote_amount: f64) -> ExecutionOutcome {
        let price = self.exchange.get_current_price(&self.market).await;
        if price.is_zero() {
            warn!("No current price for {}, buy not submitted", self.market);
            return ExecutionOutcome::Failed {
                reason: format!("no current price for {}", self.market),
            };
        }

        info!(
            "Buying {} with {:.0} {} at ~{:.0}",
            self.market.base,
            quote_amount,
            self.market.quote,
            price.value()
        );

        match OrderRequest::market_buy(self.market.clone(), quote_amount) {
            Ok(order) => self.submit(order).await,
            Err(reason) => ExecutionOutcome::Failed { reason },
        }
    }

    /// Market sell of `base_amount` of the base asset
    pub async fn sell(&self, base_amount: f64) -> ExecutionOutcome {
        let price = self.exchange.get_current_price(&self.market).await;
        if price.is_zero() {
            warn!("No current price for {}, sell not submitted", self.market);
            return ExecutionOutcome::Failed {
                reason: format!("no current price for {}", self.market),
            };
        }

        info!(
            "Selling {:.8} {} at ~{:.0} {}",
            base_amount,
            self.market.base,
            price.value(),
            self.market.quote
        );

        match OrderRequest::market_sell(self.market.clone(), base_amount) {
            Ok(order) => self.submit(order).await,
            Err(reason) => ExecutionOutcome::Failed { reason },
        }
    }

    async fn submit(&self, order: OrderRequest) -> ExecutionOutcome {
        match self.exchange.place_order(&order).await {
            Ok(receipt) => {
                info!(
                    "✓ {} order accepted by {}: {}",
                    order.side,
                    self.exchange.name(),
                    receipt.uuid
                );
                ExecutionOutcome::Placed(receipt)
            }
            Err(e) => {
                error!("✗ {} order failed on {}: {}", order.side, self.exchange.name(), e);
                ExecutionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Apply the guard for `decision`, then submit if it passes
    pub async fn execute(
        &self,
        decision: &Decision,
        balances: &BalanceSnapshot,
        price: Price,
    ) -> ExecutionOutcome {
        match plan_order(decision, balances, price, &self.limits) {
            OrderPlan::Hold => {
                info!("Holding: {}", decision.reason());
                ExecutionOutcome::Held
            }
            OrderPlan::Buy { quote_amount } => self.buy(quote_amount).await,
            OrderPlan::Sell { base_amount, .. } => self.sell(base_amount).await,
            OrderPlan::BelowMinimum {
                action,
                notional,
                min_notional,
            } => {
                let outcome = ExecutionOutcome::BelowMinimum {
                    action,
                    notional,
                    min_notional,
                };
                warn!("{}", outcome);
                outcome
            }
        }
    }
}
