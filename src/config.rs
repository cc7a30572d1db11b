use crate::domain::entities::exchange::Exchange;
use crate::domain::entities::market::{CandleInterval, Market};
use crate::domain::services::order_planner::OrderLimits;
use crate::infrastructure::openai_client::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, OPENAI_BASE_URL};
use crate::persistence::DatabaseConfig;
use crate::secrets::{load_optional_secret, load_secret, SecretError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing or invalid credential: {0}")]
    Credential(#[from] SecretError),
}

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub exchange: Exchange,
    pub market: Market,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_max_tokens: u32,
    pub openai_timeout: Duration, // Completions with a large token budget are slow
    pub strategy_notes_path: PathBuf,
    pub database: DatabaseConfig,
    pub cycle_interval: Duration,     // Sleep after a successful cycle
    pub backoff_interval: Duration,   // Sleep after a failed cycle
    pub order_limits: OrderLimits,
    pub daily_candle_count: u32,
    pub hourly_candle_count: u32,
    pub hourly_interval: CandleInterval,
    pub recent_trades_days: i64,
    pub settle_delay: Duration, // Wait before re-reading balances after an order
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            exchange: Exchange::Bithumb,
            market: Market::default(),
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            openai_max_tokens: 4095,
            openai_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            strategy_notes_path: PathBuf::from("strategy1.txt"),
            database: DatabaseConfig::default(),
            cycle_interval: Duration::from_secs(3600),
            backoff_interval: Duration::from_secs(300),
            order_limits: OrderLimits::default(),
            daily_candle_count: 30,
            hourly_candle_count: 24,
            hourly_interval: CandleInterval::Minutes(60),
            recent_trades_days: 7,
            settle_delay: Duration::from_secs(1),
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Read `name` and parse it; on a parse failure or a value rejected by
/// `valid`, warn and keep `default`.
fn env_or<T>(name: &str, default: T, valid: impl Fn(&T) -> bool, expectation: &str) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = std::env::var(name) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} ({}), using default: {}",
                name,
                value,
                expectation,
                default
            );
            default
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} '{}': {}, using default: {}",
                name,
                raw,
                e,
                default
            );
            default
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppConfig {
        let defaults = AppConfig::default();

        let exchange = match std::env::var("EXCHANGE") {
            Ok(raw) => raw.parse::<Exchange>().unwrap_or_else(|e| {
                tracing::warn!("{}, using default: {}", e, defaults.exchange);
                defaults.exchange
            }),
            Err(_) => defaults.exchange,
        };

        let market = match std::env::var("MARKET") {
            Ok(raw) => raw.parse::<Market>().unwrap_or_else(|e| {
                tracing::warn!("{}, using default: {}", e, defaults.market);
                defaults.market.clone()
            }),
            Err(_) => defaults.market.clone(),
        };

        let openai_model = std::env::var("OPENAI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.openai_model);

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .unwrap_or(defaults.openai_base_url);

        let strategy_notes_path = std::env::var("STRATEGY_NOTES_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.strategy_notes_path);

        let cycle_interval = Duration::from_secs(env_or(
            "CYCLE_INTERVAL_SECONDS",
            defaults.cycle_interval.as_secs(),
            |v| *v > 0,
            "must be positive",
        ));

        let backoff_interval = Duration::from_secs(env_or(
            "BACKOFF_INTERVAL_SECONDS",
            defaults.backoff_interval.as_secs(),
            |v| *v > 0,
            "must be positive",
        ));

        let order_limits = OrderLimits {
            min_notional: env_or(
                "MIN_ORDER_NOTIONAL",
                defaults.order_limits.min_notional,
                |v| v.is_finite() && *v >= 0.0,
                "must be non-negative",
            ),
            fee_adjustment: env_or(
                "FEE_ADJUSTMENT",
                defaults.order_limits.fee_adjustment,
                |v| *v > 0.0 && *v <= 1.0,
                "must be in (0, 1]",
            ),
        };

        let daily_candle_count = env_or(
            "DAILY_CANDLE_COUNT",
            defaults.daily_candle_count,
            |v| (1..=200).contains(v),
            "must be between 1 and 200",
        );

        let hourly_candle_count = env_or(
            "HOURLY_CANDLE_COUNT",
            defaults.hourly_candle_count,
            |v| (1..=200).contains(v),
            "must be between 1 and 200",
        );

        let recent_trades_days = env_or(
            "RECENT_TRADES_DAYS",
            defaults.recent_trades_days,
            |v| *v > 0,
            "must be positive",
        );

        let settle_delay = Duration::from_millis(env_or(
            "SETTLE_DELAY_MILLISECONDS",
            defaults.settle_delay.as_millis() as u64,
            |_| true,
            "",
        ));

        let http_timeout = Duration::from_secs(env_or(
            "HTTP_TIMEOUT_SECONDS",
            defaults.http_timeout.as_secs(),
            |v| *v > 0,
            "must be positive",
        ));

        let openai_timeout = Duration::from_secs(env_or(
            "OPENAI_TIMEOUT_SECONDS",
            defaults.openai_timeout.as_secs(),
            |v| *v > 0,
            "must be positive",
        ));

        AppConfig {
            exchange,
            market,
            openai_model,
            openai_base_url,
            openai_max_tokens: defaults.openai_max_tokens,
            openai_timeout,
            strategy_notes_path,
            database: DatabaseConfig::from_env(),
            cycle_interval,
            backoff_interval,
            order_limits,
            daily_candle_count,
            hourly_candle_count,
            hourly_interval: defaults.hourly_interval,
            recent_trades_days,
            settle_delay,
            http_timeout,
        }
    }
}

/// API credentials; secret values are never printed
pub struct Credentials {
    pub exchange_access_key: Zeroizing<String>,
    pub exchange_secret_key: Zeroizing<String>,
    pub openai_api_key: Zeroizing<String>,
    pub serp_api_key: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("exchange_access_key", &"<REDACTED>")
            .field("exchange_secret_key", &"<REDACTED>")
            .field("openai_api_key", &"<REDACTED>")
            .field("serp_api_key", &self.serp_api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl Credentials {
    /// Load credentials for `exchange`. The exchange keys also accept the
    /// exchange-prefixed names (`BITHUMB_ACCESS_KEY`, `UPBIT_SECRET_KEY`, ...).
    pub fn from_env(exchange: Exchange) -> Result<Credentials, ConfigError> {
        let prefix = exchange.name().to_uppercase();
        let access_fallback = format!("{}_ACCESS_KEY", prefix);
        let secret_fallback = format!("{}_SECRET_KEY", prefix);

        let exchange_access_key = load_secret(&["EXCHANGE_ACCESS_KEY", &access_fallback])?;
        let exchange_secret_key = load_secret(&["EXCHANGE_SECRET_KEY", &secret_fallback])?;
        let openai_api_key = load_secret(&["OPENAI_API_KEY"])?;
        let serp_api_key = load_optional_secret(&["SERP_API_KEY"])?;

        if serp_api_key.is_none() {
            tracing::info!("SERP_API_KEY not set, news headlines disabled");
        }

        Ok(Credentials {
            exchange_access_key,
            exchange_secret_key,
            openai_api_key,
            serp_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.exchange, Exchange::Bithumb);
        assert_eq!(config.market.code(), "KRW-BTC");
        assert_eq!(config.cycle_interval, Duration::from_secs(3600));
        assert_eq!(config.backoff_interval, Duration::from_secs(300));
        assert_eq!(config.order_limits.min_notional, 5000.0);
        assert_eq!(config.order_limits.fee_adjustment, 0.9995);
        assert_eq!(config.daily_candle_count, 30);
        assert_eq!(config.hourly_candle_count, 24);
        assert_eq!(config.recent_trades_days, 7);
        assert_eq!(config.settle_delay, Duration::from_secs(1));
        assert_eq!(config.openai_timeout, Duration::from_secs(60));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_env_or_parses_and_validates() {
        std::env::set_var("TEST_CONFIG_VALID", "42");
        assert_eq!(env_or("TEST_CONFIG_VALID", 1u64, |v| *v > 0, "positive"), 42);

        std::env::set_var("TEST_CONFIG_REJECTED", "0");
        assert_eq!(env_or("TEST_CONFIG_REJECTED", 7u64, |v| *v > 0, "positive"), 7);

        std::env::set_var("TEST_CONFIG_GARBAGE", "soon");
        assert_eq!(env_or("TEST_CONFIG_GARBAGE", 3u64, |_| true, ""), 3);

        assert_eq!(env_or("TEST_CONFIG_UNSET", 9u64, |_| true, ""), 9);

        std::env::remove_var("TEST_CONFIG_VALID");
        std::env::remove_var("TEST_CONFIG_REJECTED");
        std::env::remove_var("TEST_CONFIG_GARBAGE");
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("EXCHANGE", "upbit");
        std::env::set_var("MARKET", "krw-eth");
        std::env::set_var("FEE_ADJUSTMENT", "1.5");
        std::env::set_var("CYCLE_INTERVAL_SECONDS", "600");
        std::env::set_var("OPENAI_TIMEOUT_SECONDS", "90");

        let config = AppConfig::from_env();
        assert_eq!(config.exchange, Exchange::Upbit);
        assert_eq!(config.market.code(), "KRW-ETH");
        assert_eq!(config.order_limits.fee_adjustment, 0.9995);
        assert_eq!(config.cycle_interval, Duration::from_secs(600));
        assert_eq!(config.openai_timeout, Duration::from_secs(90));

        std::env::remove_var("EXCHANGE");
        std::env::remove_var("MARKET");
        std::env::remove_var("FEE_ADJUSTMENT");
        std::env::remove_var("CYCLE_INTERVAL_SECONDS");
        std::env::remove_var("OPENAI_TIMEOUT_SECONDS");
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials {
            exchange_access_key: Zeroizing::new("access-123".to_string()),
            exchange_secret_key: Zeroizing::new("secret-456".to_string()),
            openai_api_key: Zeroizing::new("sk-789".to_string()),
            serp_api_key: None,
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("access-123"));
        assert!(!debug.contains("secret-456"));
        assert!(!debug.contains("sk-789"));
    }
}
