use thiserror::Error;

/// Decision invariant violations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionError {
    #[error("Unknown action: {0} (expected buy, sell or hold)")]
    UnknownAction(String),

    #[error("Hold decisions must use percentage 0, got {0}")]
    HoldWithPercentage(i64),

    #[error("{action} decisions require a percentage between 1 and 100, got {percentage}")]
    PercentageOutOfRange { action: String, percentage: i64 },
}

#[derive(Debug, Error, Clone)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Order rejected ({status}): {body}")]
    OrderRejected { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ResponseParse(String),

    #[error("No price available for {0}")]
    PriceUnavailable(String),
}

#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("Language model request failed: {0}")]
    NetworkError(String),

    #[error("Language model timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Language model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid language model response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum OracleError {
    /// The reply did not match the decision schema; no order may be placed.
    #[error("Decision parse failure: {message}")]
    DecisionParse { message: String, raw: String },

    #[error("Decision request failed: {0}")]
    Model(#[from] LlmError),

    #[error("Failed to build prompt: {0}")]
    Prompt(String),
}

impl OracleError {
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, OracleError::DecisionParse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_error_display() {
        let error = DecisionError::PercentageOutOfRange {
            action: "buy".to_string(),
            percentage: 150,
        };
        assert_eq!(
            error.to_string(),
            "buy decisions require a percentage between 1 and 100, got 150"
        );
    }

    #[test]
    fn test_exchange_error_display() {
        let error = ExchangeError::OrderRejected {
            status: 400,
            body: "{\"error\":\"insufficient_funds\"}".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Order rejected (400): {\"error\":\"insufficient_funds\"}"
        );
    }

    #[test]
    fn test_oracle_error_from_llm() {
        let error: OracleError = LlmError::Timeout { timeout_ms: 30_000 }.into();
        assert!(!error.is_parse_failure());
        assert_eq!(
            error.to_string(),
            "Decision request failed: Language model timed out after 30000ms"
        );
    }

    #[test]
    fn test_parse_failure_flag() {
        let error = OracleError::DecisionParse {
            message: "missing field `reason`".to_string(),
            raw: "{}".to_string(),
        };
        assert!(error.is_parse_failure());
    }
}
