//! GPT Coin Trader Library
//!
//! Polls a Bithumb/Upbit market, asks a language model for a buy/sell/hold
//! decision, executes it as a market order and keeps an SQLite trade ledger.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod secrets;
pub mod task_runner;
