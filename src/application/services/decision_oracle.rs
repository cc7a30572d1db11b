//! Decision oracle
//!
//! Two model calls per cycle: a free-text reflection on recent trades, then
//! a structured decision constrained by a strict JSON schema. The decision
//! reply is validated strictly; anything that does not match the schema and
//! the decision invariant is a [`OracleError::DecisionParse`] and no order
//! may follow from it.

use crate::domain::entities::balance::BalanceSnapshot;
use crate::domain::entities::decision::{Decision, TradeAction};
use crate::domain::entities::order_book::OrderBookSnapshot;
use crate::domain::errors::OracleError;
use crate::domain::repositories::language_model::{
    ChatMessage, ChatRequest, LanguageModel, ResponseFormat,
};
use crate::domain::services::indicators::EnrichedCandle;
use crate::persistence::models::TradeRecord;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DECISION_SCHEMA_NAME: &str = "trading_decision";

const REFLECTION_SYSTEM_PROMPT: &str = "You are an AI trading assistant tasked with analyzing \
recent trading performance and current market conditions to generate insights and \
improvements for future trading decisions.";

/// Everything the model sees for one decision
#[derive(Debug, Clone)]
pub struct DecisionInput {
    pub asset: String,
    pub balances: BalanceSnapshot,
    pub order_book: OrderBookSnapshot,
    pub daily: Vec<EnrichedCandle>,
    pub hourly: Vec<EnrichedCandle>,
    /// Ledger rows, newest first
    pub recent_trades: Vec<TradeRecord>,
    /// `(heading, text)` sections from auxiliary sources
    pub context: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleVerdict {
    pub decision: Decision,
    pub reflection: String,
}

/// Percentage change in total asset value between the two most recent
/// ledger rows. `trades` is newest first. Zero with fewer than two rows or a
/// zero baseline.
pub fn calculate_performance(trades: &[TradeRecord]) -> f64 {
    let (latest, previous) = match trades {
        [latest, previous, ..] => (latest, previous),
        _ => return 0.0,
    };

    let baseline = previous.total_value();
    if baseline == 0.0 {
        return 0.0;
    }

    (latest.total_value() - baseline) / baseline * 100.0
}

/// JSON schema the decision reply must satisfy
pub fn decision_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "decision": {"type": "string", "enum": ["buy", "sell", "hold"]},
            "percentage": {"type": "integer"},
            "reason": {"type": "string"}
        },
        "required": ["decision", "percentage", "reason"],
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDecision {
    decision: String,
    percentage: i64,
    reason: String,
}

/// Validate a decision reply
pub fn parse_decision(raw: &str) -> Result<Decision, OracleError> {
    let parse_error = |message: String| OracleError::DecisionParse {
        message,
        raw: raw.to_string(),
    };

    let reply: RawDecision =
        serde_json::from_str(raw.trim()).map_err(|e| parse_error(e.to_string()))?;
    let action: TradeAction = reply
        .decision
        .parse()
        .map_err(|e: crate::domain::errors::DecisionError| parse_error(e.to_string()))?;

    Decision::new(action, reply.percentage, reply.reason).map_err(|e| parse_error(e.to_string()))
}

pub struct DecisionOracle {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
}

impl DecisionOracle {
    pub fn new(model: Arc<dyn LanguageModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    fn market_data(input: &DecisionInput) -> Result<serde_json::Value, OracleError> {
        Ok(json!({
            "orderbook": serde_json::to_value(input.order_book)
                .map_err(|e| OracleError::Prompt(e.to_string()))?,
            "recent_daily_ohlcv": serde_json::to_value(&input.daily)
                .map_err(|e| OracleError::Prompt(e.to_string()))?,
            "recent_hourly_ohlcv": serde_json::to_value(&input.hourly)
                .map_err(|e| OracleError::Prompt(e.to_string()))?,
        }))
    }

    /// Free-text review of the recent trades. A failed request yields an
    /// empty reflection.
    pub async fn reflect(&self, input: &DecisionInput) -> Result<String, OracleError> {
        let performance = calculate_performance(&input.recent_trades);
        let trades = serde_json::to_string(&input.recent_trades)
            .map_err(|e| OracleError::Prompt(e.to_string()))?;
        let market_data = Self::market_data(input)?;

        let user_prompt = format!(
            "Recent trading data:\n{}\n\n\
             Current market data:\n{}\n\n\
             Overall performance during the last trading period: {:.2}%\n\n\
             Please analyze this data and provide:\n\
             1. A brief reflection on the recent trading decisions\n\
             2. What specific strategies or indicators were successful or unsuccessful?\n\
             3. Suggestions for improvement in future trading decisions\n\
             4. Any patterns or trends you notice in the market data\n\n\
             Limit your response to 250 words or less.",
            trades, market_data, performance
        );

        let request = ChatRequest::new(vec![
            ChatMessage::system(REFLECTION_SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ]);

        match self.model.complete(request).await {
            Ok(reflection) => {
                debug!("Reflection ({} chars)", reflection.len());
                Ok(reflection.trim().to_string())
            }
            Err(e) => {
                warn!("Reflection request failed, continuing without it: {}", e);
                Ok(String::new())
            }
        }
    }

    fn decision_request(
        &self,
        input: &DecisionInput,
        reflection: &str,
    ) -> Result<ChatRequest, OracleError> {
        let system_prompt = format!(
            "You are an expert in {asset} investing and must always incorporate the provided \
             trading strategy notes. Analyze the provided data and give priority to those \
             strategies when making your decision. Your analysis should include:\n\
             - Technical indicators and market data\n\
             - The provided strategy notes and market context\n\
             - Recent trading performance and reflection\n\n\
             Recent trading reflection:\n{reflection}\n\n\
             Response format:\n\
             1. Decision (buy, sell, or hold)\n\
             2. If the decision is 'buy', provide a percentage (1-100) of available quote \
             currency to use for buying. If the decision is 'sell', provide a percentage \
             (1-100) of held {asset} to sell. If the decision is 'hold', set the percentage to 0.\n\
             3. Reason for your decision\n\n\
             Ensure that the percentage is an integer between 1 and 100 for buy/sell \
             decisions, and exactly 0 for hold decisions. Your percentage should reflect \
             the strength of your conviction in the decision based on the analyzed data.",
            asset = input.asset,
            reflection = reflection,
        );

        let to_json = |value: serde_json::Result<String>| {
            value.map_err(|e| OracleError::Prompt(e.to_string()))
        };

        let mut user_prompt = format!(
            "Current investment status: {}\n\
             Orderbook: {}\n\
             Daily OHLCV with indicators ({} days): {}\n\
             Hourly OHLCV with indicators ({} hours): {}",
            to_json(serde_json::to_string(&input.balances))?,
            to_json(serde_json::to_string(&input.order_book))?,
            input.daily.len(),
            to_json(serde_json::to_string(&input.daily))?,
            input.hourly.len(),
            to_json(serde_json::to_string(&input.hourly))?,
        );
        for (heading, text) in &input.context {
            user_prompt.push_str(&format!("\n{}: {}", heading, text));
        }

        Ok(ChatRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ])
        .with_max_tokens(self.max_tokens)
        .with_response_format(ResponseFormat::json_schema(
            DECISION_SCHEMA_NAME,
            decision_schema(),
        )))
    }

    /// Reflect, then request and validate a decision
    pub async fn decide(&self, input: &DecisionInput) -> Result<OracleVerdict, OracleError> {
        let reflection = self.reflect(input).await?;
        let request = self.decision_request(input, &reflection)?;

        let reply = self.model.complete(request).await?;
        let decision = parse_decision(&reply).map_err(|e| {
            error!("Rejected decision reply: {}", e);
            debug!("Response content: {}", reply);
            e
        })?;

        info!(
            "AI decision ({}): {} {}% - {}",
            self.model.model(),
            decision.action(),
            decision.percentage(),
            decision.reason()
        );

        Ok(OracleVerdict {
            decision,
            reflection,
        })
    }
}
