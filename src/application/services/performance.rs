//! Ledger summary: profit rate since the first trade and its annualized rate.

use crate::persistence::models::TradeRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

const HOURS_PER_YEAR: f64 = 8760.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub trade_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub hold_count: usize,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub initial_total_asset: f64,
    pub latest_total_asset: f64,
    /// `None` when the first recorded total is zero
    pub profit_rate: Option<f64>,
    pub elapsed_hours: f64,
    /// `None` when no time has elapsed or there is no profit rate
    pub annualized_return: Option<f64>,
}

/// `(latest - initial) / initial * 100`
pub fn profit_rate(initial_total: f64, latest_total: f64) -> Option<f64> {
    if initial_total == 0.0 {
        return None;
    }
    Some((latest_total - initial_total) / initial_total * 100.0)
}

/// Compound `profit_rate` (percent) over a year of 8760 hours
pub fn annualized_return(profit_rate: f64, elapsed_hours: f64) -> Option<f64> {
    if elapsed_hours <= 0.0 {
        return None;
    }
    let annualized = ((1.0 + profit_rate / 100.0).powf(HOURS_PER_YEAR / elapsed_hours) - 1.0) * 100.0;
    annualized.is_finite().then_some(annualized)
}

impl LedgerSummary {
    /// Summarize `history` (oldest first) as of `now`. `None` for an empty
    /// ledger.
    pub fn from_history(history: &[TradeRecord], now: DateTime<Utc>) -> Option<Self> {
        let first = history.first()?;
        let last = history.last()?;

        let count = |decision: &str| history.iter().filter(|r| r.decision == decision).count();

        let elapsed_hours = (now - first.timestamp).num_seconds() as f64 / 3600.0;
        let profit_rate = profit_rate(first.total_asset, last.total_asset);
        let annualized_return = profit_rate.and_then(|rate| annualized_return(rate, elapsed_hours));

        Some(Self {
            trade_count: history.len(),
            buy_count: count("buy"),
            sell_count: count("sell"),
            hold_count: count("hold"),
            first_timestamp: first.timestamp,
            last_timestamp: last.timestamp,
            initial_total_asset: first.total_asset,
            latest_total_asset: last.total_asset,
            profit_rate,
            elapsed_hours,
            annualized_return,
        })
    }
}

impl std::fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let days = (self.elapsed_hours / 24.0).floor() as i64;
        let hours = (self.elapsed_hours % 24.0).floor() as i64;

        writeln!(
            f,
            "Trades: {} (buy {}, sell {}, hold {})",
            self.trade_count, self.buy_count, self.sell_count, self.hold_count
        )?;
        writeln!(
            f,
            "Period: {} .. {} ({}d {}h since first trade)",
            self.first_timestamp.format("%Y-%m-%d %H:%M"),
            self.last_timestamp.format("%Y-%m-%d %H:%M"),
            days,
            hours
        )?;
        writeln!(
            f,
            "Total asset: {:.0} -> {:.0}",
            self.initial_total_asset, self.latest_total_asset
        )?;
        match self.profit_rate {
            Some(rate) => writeln!(f, "Profit rate: {:.2}%", rate)?,
            None => writeln!(f, "Profit rate: n/a")?,
        }
        match self.annualized_return {
            Some(rate) => write!(f, "Annualized return: {:.2}%", rate),
            None => write!(f, "Annualized return: n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(id: i64, timestamp: DateTime<Utc>, decision: &str, total: f64) -> TradeRecord {
        TradeRecord {
            id,
            timestamp,
            decision: decision.to_string(),
            percentage: 0,
            reason: String::new(),
            base_balance: 0.0,
            quote_balance: total,
            base_avg_buy_price: 0.0,
            base_price: 0.0,
            total_asset: total,
            reflection: String::new(),
        }
    }

    #[test]
    fn test_profit_rate() {
        assert_eq!(profit_rate(1_000_000.0, 1_100_000.0), Some(10.0));
        assert_eq!(profit_rate(0.0, 5.0), None);
    }

    #[test]
    fn test_annualized_return_full_year_is_identity() {
        let annualized = annualized_return(10.0, 8760.0).unwrap();
        assert!((annualized - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_annualized_return_compounds() {
        // 1% over half a year compounds to 2.01%
        let annualized = annualized_return(1.0, 4380.0).unwrap();
        assert!((annualized - 2.01).abs() < 1e-9);
        assert_eq!(annualized_return(1.0, 0.0), None);
    }

    #[test]
    fn test_summary_empty_history() {
        assert!(LedgerSummary::from_history(&[], Utc::now()).is_none());
    }

    #[test]
    fn test_summary_counts_and_rates() {
        let now = Utc::now();
        let start = now - Duration::hours(4380);
        let history = vec![
            row(1, start, "buy", 1_000_000.0),
            row(2, start + Duration::hours(1), "hold", 1_005_000.0),
            row(3, start + Duration::hours(2), "sell", 1_010_000.0),
        ];

        let summary = LedgerSummary::from_history(&history, now).unwrap();
        assert_eq!(summary.trade_count, 3);
        assert_eq!(
            (summary.buy_count, summary.sell_count, summary.hold_count),
            (1, 1, 1)
        );
        assert!((summary.profit_rate.unwrap() - 1.0).abs() < 1e-9);
        assert!((summary.elapsed_hours - 4380.0).abs() < 1e-6);
        assert!((summary.annualized_return.unwrap() - 2.01).abs() < 1e-6);

        let text = summary.to_string();
        assert!(text.contains("Profit rate: 1.00%"));
        assert!(text.contains("182d 12h"));
    }

    #[test]
    fn test_summary_zero_baseline() {
        let now = Utc::now();
        let history = vec![row(1, now - Duration::hours(1), "hold", 0.0)];
        let summary = LedgerSummary::from_history(&history, now).unwrap();
        assert!(summary.profit_rate.is_none());
        assert!(summary.annualized_return.is_none());
        assert!(summary.to_string().contains("Profit rate: n/a"));
    }
}
