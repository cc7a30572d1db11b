//! # Bithumb / Upbit REST Client
//!
//! Both exchanges expose the same `/v1` API: public market data under
//! `ticker`, `orderbook` and `candles`, private endpoints under `accounts`
//! and `orders`.
//!
//! ## Authentication
//!
//! Private calls carry `Authorization: Bearer <jwt>` where the JWT is signed
//! HS256 with the secret key. Claims:
//! - `access_key`: the API access key
//! - `nonce`: random hex string, fresh per request
//! - `timestamp`: milliseconds since the epoch
//! - `query_hash` / `query_hash_alg`: SHA-512 of the url-encoded parameters,
//!   present only when the request has parameters
//!
//! Read operations never return an error. Failures are logged and mapped to
//! empty values; only order placement reports errors to the caller.

use crate::domain::entities::balance::BalanceSnapshot;
use crate::domain::entities::exchange::Exchange;
use crate::domain::entities::market::{CandleInterval, Market};
use crate::domain::entities::order::{OrderReceipt, OrderRequest};
use crate::domain::entities::order_book::OrderBookSnapshot;
use crate::domain::errors::ExchangeError;
use crate::domain::repositories::exchange_client::{ExchangeClient, ExchangeResult};
use crate::domain::services::indicators::{Candle, CandleSeries};
use crate::domain::value_objects::price::Price;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha512};
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// JWT claims for private endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JwtClaims {
    access_key: String,
    nonce: String,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_hash_alg: Option<String>,
}

/// REST client configuration
#[derive(Debug, Clone)]
pub struct ExchangeRestConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl ExchangeRestConfig {
    pub fn for_exchange(exchange: Exchange) -> Self {
        Self {
            api_base: exchange.api_base().to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct ExchangeRestClient {
    client: Client,
    exchange: Exchange,
    market: Market,
    config: ExchangeRestConfig,
    access_key: String,
    secret_key: Zeroizing<String>,
}

impl std::fmt::Debug for ExchangeRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRestClient")
            .field("exchange", &self.exchange)
            .field("market", &self.market)
            .field("config", &self.config)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

/// Entry of `GET /v1/accounts`
#[derive(Debug, Deserialize)]
pub struct AccountEntry {
    pub currency: String,
    #[serde(deserialize_with = "number_from_any")]
    pub balance: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub avg_buy_price: f64,
}

/// Entry of `GET /v1/ticker`
#[derive(Debug, Deserialize)]
pub struct TickerEntry {
    pub market: String,
    #[serde(deserialize_with = "number_from_any")]
    pub trade_price: f64,
}

/// Entry of `GET /v1/orderbook`
#[derive(Debug, Deserialize)]
pub struct OrderBookEntry {
    pub market: String,
    #[serde(default, deserialize_with = "number_from_any")]
    pub total_ask_size: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    pub total_bid_size: f64,
    #[serde(default)]
    pub orderbook_units: Vec<OrderBookUnit>,
}

#[derive(Debug, Deserialize)]
pub struct OrderBookUnit {
    #[serde(deserialize_with = "number_from_any")]
    pub ask_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub bid_price: f64,
}

/// Entry of `GET /v1/candles/...`, exchange field names
#[derive(Debug, Deserialize)]
pub struct CandleEntry {
    pub candle_date_time_utc: String,
    #[serde(deserialize_with = "number_from_any")]
    pub opening_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub high_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub low_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub trade_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    pub candle_acc_trade_volume: f64,
}

/// Numeric fields arrive as JSON numbers or as decimal strings
fn number_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Url-encode parameters in the order given
pub fn encode_query(params: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

/// Hex SHA-512 of an encoded query string
pub fn query_hash(query: &str) -> String {
    hex::encode(Sha512::digest(query.as_bytes()))
}

/// Pick the quote and base holdings for `market` out of an account listing
pub fn balances_from_accounts(accounts: &[AccountEntry], market: &Market) -> BalanceSnapshot {
    let mut snapshot = BalanceSnapshot::empty();
    for account in accounts {
        if account.currency.eq_ignore_ascii_case(&market.quote) {
            snapshot.quote_balance = account.balance;
        } else if account.currency.eq_ignore_ascii_case(&market.base) {
            snapshot.base_balance = account.balance;
            snapshot.base_avg_buy_price = account.avg_buy_price;
        }
    }
    snapshot
}

/// Best ask/bid from the first price level plus total sizes
pub fn order_book_from_entry(entry: &OrderBookEntry) -> OrderBookSnapshot {
    match entry.orderbook_units.first() {
        Some(top) => OrderBookSnapshot {
            best_ask_price: top.ask_price,
            best_bid_price: top.bid_price,
            total_ask_size: entry.total_ask_size,
            total_bid_size: entry.total_bid_size,
        },
        None => OrderBookSnapshot::empty(),
    }
}

/// Normalize exchange candles: rename fields, parse UTC timestamps, and
/// reverse the newest-first listing to ascending order. Entries with an
/// unparseable timestamp are skipped.
pub fn candles_from_entries(entries: Vec<CandleEntry>) -> CandleSeries {
    let mut series: CandleSeries = entries
        .into_iter()
        .filter_map(|entry| {
            let timestamp =
                NaiveDateTime::parse_from_str(&entry.candle_date_time_utc, "%Y-%m-%dT%H:%M:%S")
                    .map_err(|e| {
                        warn!(
                            "Skipping candle with invalid timestamp '{}': {}",
                            entry.candle_date_time_utc, e
                        )
                    })
                    .ok()?
                    .and_utc();
            Some(Candle::new(
                timestamp,
                entry.opening_price,
                entry.high_price,
                entry.low_price,
                entry.trade_price,
                entry.candle_acc_trade_volume,
            ))
        })
        .collect();
    series.sort_by_key(|c| c.timestamp);
    series
}

impl ExchangeRestClient {
    pub fn new(
        exchange: Exchange,
        market: Market,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, String> {
        Self::new_with_config(
            exchange,
            market,
            access_key,
            secret_key,
            ExchangeRestConfig::for_exchange(exchange),
        )
    }

    pub fn new_with_config(
        exchange: Exchange,
        market: Market,
        access_key: &str,
        secret_key: &str,
        config: ExchangeRestConfig,
    ) -> Result<Self, String> {
        if access_key.trim().is_empty() {
            return Err(format!("{} access key is empty", exchange));
        }
        if secret_key.trim().is_empty() {
            return Err(format!("{} secret key is empty", exchange));
        }

        let client = Client::builder()
            .user_agent("gpt-coin-trader/0.1.0")
            .timeout(config.timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            exchange,
            market,
            config,
            access_key: access_key.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
        })
    }

    /// Sign a fresh token for one request
    fn generate_jwt(&self, params: &[(&str, String)]) -> ExchangeResult<String> {
        let mut nonce_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut nonce_bytes);

        let (query_hash, query_hash_alg) = if params.is_empty() {
            (None, None)
        } else {
            (
                Some(query_hash(&encode_query(params))),
                Some("SHA512".to_string()),
            )
        };

        let claims = JwtClaims {
            access_key: self.access_key.clone(),
            nonce: hex::encode(nonce_bytes),
            timestamp: Utc::now().timestamp_millis(),
            query_hash,
            query_hash_alg,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )
        .map_err(|e| ExchangeError::AuthenticationError(format!("Failed to encode JWT: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        authenticated: bool,
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.api_base, path);
        let mut request = self.client.get(&url).query(params);
        if authenticated {
            let jwt = self.generate_jwt(params)?;
            request = request.header("Authorization", format!("Bearer {}", jwt));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("GET {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExchangeError::NetworkError(format!(
                "GET {} returned {}: {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExchangeError::ResponseParse(format!("{}: {}", path, e)))
    }

    async fn fetch_accounts(&self) -> ExchangeResult<Vec<AccountEntry>> {
        self.get_json("/v1/accounts", &[], true).await
    }

    async fn fetch_price(&self, market: &Market) -> ExchangeResult<Price> {
        let tickers: Vec<TickerEntry> = self
            .get_json("/v1/ticker", &[("markets", market.code())], false)
            .await?;
        let ticker = tickers
            .into_iter()
            .find(|t| t.market == market.code())
            .ok_or_else(|| ExchangeError::PriceUnavailable(market.code()))?;
        Price::new(ticker.trade_price).map_err(ExchangeError::ResponseParse)
    }

    async fn fetch_order_book(&self, market: &Market) -> ExchangeResult<OrderBookSnapshot> {
        let books: Vec<OrderBookEntry> = self
            .get_json("/v1/orderbook", &[("markets", market.code())], false)
            .await?;
        Ok(books
            .iter()
            .find(|b| b.market == market.code())
            .map(order_book_from_entry)
            .unwrap_or_default())
    }

    async fn fetch_candles(
        &self,
        market: &Market,
        interval: CandleInterval,
        count: u32,
    ) -> ExchangeResult<CandleSeries> {
        let path = format!("/v1/candles/{}", interval.path());
        let params = [("market", market.code()), ("count", count.to_string())];
        let entries: Vec<CandleEntry> = self.get_json(&path, &params, false).await?;
        Ok(candles_from_entries(entries))
    }
}

#[async_trait]
impl ExchangeClient for ExchangeRestClient {
    fn name(&self) -> &str {
        self.exchange.name()
    }

    async fn get_balances(&self) -> BalanceSnapshot {
        match self.fetch_accounts().await {
            Ok(accounts) => balances_from_accounts(&accounts, &self.market),
            Err(e) => {
                warn!("{}: failed to read balances: {}", self.exchange, e);
                BalanceSnapshot::empty()
            }
        }
    }

    async fn get_current_price(&self, market: &Market) -> Price {
        match self.fetch_price(market).await {
            Ok(price) => price,
            Err(e) => {
                warn!("{}: failed to read price for {}: {}", self.exchange, market, e);
                Price::ZERO
            }
        }
    }

    async fn get_order_book(&self, market: &Market) -> OrderBookSnapshot {
        match self.fetch_order_book(market).await {
            Ok(book) => book,
            Err(e) => {
                warn!(
                    "{}: failed to read order book for {}: {}",
                    self.exchange, market, e
                );
                OrderBookSnapshot::empty()
            }
        }
    }

    async fn get_candles(
        &self,
        market: &Market,
        interval: CandleInterval,
        count: u32,
    ) -> CandleSeries {
        match self.fetch_candles(market, interval, count).await {
            Ok(series) => {
                debug!("{}: {} {} candles for {}", self.exchange, series.len(), interval, market);
                series
            }
            Err(e) => {
                warn!(
                    "{}: failed to read {} candles for {}: {}",
                    self.exchange, interval, market, e
                );
                Vec::new()
            }
        }
    }

    async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderReceipt> {
        let params = order.params();
        let jwt = self.generate_jwt(&params)?;
        let url = format!("{}/v1/orders", self.config.api_base);

        info!(
            "Placing {} order: {} {} {:?}",
            self.exchange, order.side, order.market, params
        );

        let body: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
            .collect();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", jwt))
            .json(&body)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("Failed to place order: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExchangeError::OrderRejected {
                status,
                body: error_text,
            });
        }

        let receipt: OrderReceipt = response
            .json()
            .await
            .map_err(|e| ExchangeError::ResponseParse(format!("order response: {}", e)))?;

        info!("Order accepted: {}", receipt.uuid);
        Ok(receipt)
    }
}
