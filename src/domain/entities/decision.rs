//! Trading decision returned by the language model

use crate::domain::errors::DecisionError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Hold => "hold",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeAction::Buy),
            "sell" => Ok(TradeAction::Sell),
            "hold" => Ok(TradeAction::Hold),
            other => Err(DecisionError::UnknownAction(other.to_string())),
        }
    }
}

/// Validated decision.
///
/// Invariant: `percentage == 0` iff `action == Hold`, otherwise `1..=100`.
/// The only way to obtain one is [`Decision::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    action: TradeAction,
    percentage: u8,
    reason: String,
}

impl Decision {
    pub fn new(
        action: TradeAction,
        percentage: i64,
        reason: impl Into<String>,
    ) -> Result<Self, DecisionError> {
        match action {
            TradeAction::Hold if percentage != 0 => {
                return Err(DecisionError::HoldWithPercentage(percentage));
            }
            TradeAction::Buy | TradeAction::Sell if !(1..=100).contains(&percentage) => {
                return Err(DecisionError::PercentageOutOfRange {
                    action: action.to_string(),
                    percentage,
                });
            }
            _ => {}
        }

        Ok(Self {
            action,
            percentage: percentage as u8,
            reason: reason.into(),
        })
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: TradeAction::Hold,
            percentage: 0,
            reason: reason.into(),
        }
    }

    pub fn action(&self) -> TradeAction {
        self.action
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    /// Percentage as a fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        f64::from(self.percentage) / 100.0
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_requires_zero() {
        assert!(Decision::new(TradeAction::Hold, 0, "flat").is_ok());
        assert_eq!(
            Decision::new(TradeAction::Hold, 5, "flat").unwrap_err(),
            DecisionError::HoldWithPercentage(5)
        );
    }

    #[test]
    fn test_buy_sell_bounds() {
        for action in [TradeAction::Buy, TradeAction::Sell] {
            assert!(Decision::new(action, 1, "").is_ok());
            assert!(Decision::new(action, 100, "").is_ok());
            assert!(Decision::new(action, 0, "").is_err());
            assert!(Decision::new(action, 101, "").is_err());
            assert!(Decision::new(action, -3, "").is_err());
        }
    }

    #[test]
    fn test_fraction() {
        let decision = Decision::new(TradeAction::Buy, 50, "momentum").unwrap();
        assert_eq!(decision.fraction(), 0.5);
        assert_eq!(decision.reason(), "momentum");
        assert_eq!(Decision::hold("wait").fraction(), 0.0);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("sell".parse::<TradeAction>().unwrap(), TradeAction::Sell);
        assert!("SELL".parse::<TradeAction>().is_err());
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let decision = Decision::new(TradeAction::Sell, 30, "overbought").unwrap();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "sell");
        assert_eq!(json["percentage"], 30);
        assert_eq!(json["reason"], "overbought");
    }
}
