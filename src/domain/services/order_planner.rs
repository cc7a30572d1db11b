//! Order sizing and the minimum-notional guard.
//!
//! Pure: no I/O, the executor turns a plan into an exchange call.

use crate::domain::entities::balance::BalanceSnapshot;
use crate::domain::entities::decision::{Decision, TradeAction};
use crate::domain::value_objects::price::Price;

pub const DEFAULT_MIN_NOTIONAL: f64 = 5000.0;
/// Leaves room for the 0.05% trading fee on market buys
pub const DEFAULT_FEE_ADJUSTMENT: f64 = 0.9995;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderLimits {
    /// Smallest quote-currency value worth submitting
    pub min_notional: f64,
    /// Multiplier applied to quote amounts on buys
    pub fee_adjustment: f64,
}

impl Default for OrderLimits {
    fn default() -> Self {
        Self {
            min_notional: DEFAULT_MIN_NOTIONAL,
            fee_adjustment: DEFAULT_FEE_ADJUSTMENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderPlan {
    Hold,
    Buy {
        quote_amount: f64,
    },
    Sell {
        base_amount: f64,
        notional: f64,
    },
    /// The implied order is worth less than the minimum notional
    BelowMinimum {
        action: TradeAction,
        notional: f64,
        min_notional: f64,
    },
}

/// Size the order implied by `decision`.
///
/// Buys spend `quote * p/100 * fee_adjustment`; sells move `base * p/100`
/// valued at `price`. Either is submittable only when its quote value
/// strictly exceeds `limits.min_notional`.
pub fn plan_order(
    decision: &Decision,
    balances: &BalanceSnapshot,
    price: Price,
    limits: &OrderLimits,
) -> OrderPlan {
    match decision.action() {
        TradeAction::Hold => OrderPlan::Hold,
        TradeAction::Buy => {
            let quote_amount =
                balances.quote_balance * decision.fraction() * limits.fee_adjustment;
            if quote_amount > limits.min_notional {
                OrderPlan::Buy { quote_amount }
            } else {
                OrderPlan::BelowMinimum {
                    action: TradeAction::Buy,
                    notional: quote_amount,
                    min_notional: limits.min_notional,
                }
            }
        }
        TradeAction::Sell => {
            let base_amount = balances.base_balance * decision.fraction();
            let notional = base_amount * price.value();
            if notional > limits.min_notional {
                OrderPlan::Sell {
                    base_amount,
                    notional,
                }
            } else {
                OrderPlan::BelowMinimum {
                    action: TradeAction::Sell,
                    notional,
                    min_notional: limits.min_notional,
                }
            }
        }
    }
}
