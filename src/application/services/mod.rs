pub mod decision_oracle;
pub mod order_executor;
pub mod performance;
pub mod trading_cycle;
