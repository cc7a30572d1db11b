//! Trade ledger repository
//!
//! Append-only: `record` is the only statement that writes, and there is no
//! update or delete path.

use super::models::{NewTradeRecord, TradeRecord};
use super::{run_migrations, DatabaseError, DbPool};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

pub struct TradeLedger {
    pool: DbPool,
}

impl TradeLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the trades table if it does not exist. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<(), DatabaseError> {
        run_migrations(&self.pool).await
    }

    /// Append one cycle's outcome
    pub async fn record(&self, trade: NewTradeRecord) -> Result<TradeRecord, DatabaseError> {
        let record = sqlx::query_as::<_, TradeRecord>(
            r#"
            INSERT INTO trades (
                timestamp, decision, percentage, reason, base_balance,
                quote_balance, base_avg_buy_price, base_price, total_asset, reflection
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING *
            "#,
        )
        .bind(trade.timestamp)
        .bind(&trade.decision)
        .bind(trade.percentage)
        .bind(&trade.reason)
        .bind(trade.base_balance)
        .bind(trade.quote_balance)
        .bind(trade.base_avg_buy_price)
        .bind(trade.base_price)
        .bind(trade.total_asset)
        .bind(&trade.reflection)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to record trade: {}", e);
            DatabaseError::QueryError(format!("Failed to record trade: {}", e))
        })?;

        debug!(
            "Recorded trade #{}: {} {}%",
            record.id, record.decision, record.percentage
        );
        Ok(record)
    }

    /// Rows recorded within `window` of now, newest first
    pub async fn recent(&self, window: Duration) -> Result<Vec<TradeRecord>, DatabaseError> {
        self.recent_since(Utc::now() - window).await
    }

    /// Rows with `timestamp >= since`, newest first
    pub async fn recent_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TradeRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TradeRecord>(
            "SELECT * FROM trades WHERE timestamp >= ?1 ORDER BY id DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get recent trades: {}", e);
            DatabaseError::QueryError(format!("Failed to get recent trades: {}", e))
        })?;

        Ok(records)
    }

    /// Every row, oldest first
    pub async fn history(&self) -> Result<Vec<TradeRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TradeRecord>("SELECT * FROM trades ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get trade history: {}", e);
                DatabaseError::QueryError(format!("Failed to get trade history: {}", e))
            })?;

        Ok(records)
    }
}
