//! Auxiliary prompt context: strategy notes, Fear & Greed index, headlines.
//!
//! Every source is best-effort. A failure is logged and the section is left
//! out of the prompt for this cycle.

use crate::domain::repositories::context_source::ContextSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";
pub const SERP_API_URL: &str = "https://serpapi.com/search";
const NEWS_HEADLINE_COUNT: usize = 5;

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent("gpt-coin-trader/0.1.0")
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Trading strategy notes kept in a local text file
#[derive(Debug, Clone)]
pub struct StrategyNotesFile {
    path: PathBuf,
}

impl StrategyNotesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContextSource for StrategyNotesFile {
    fn name(&self) -> &str {
        "Trading strategy notes"
    }

    async fn fetch(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "Strategy notes unavailable ({}): {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FearGreedEntry {
    pub value: String,
    pub value_classification: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

pub fn format_fear_greed(entry: &FearGreedEntry) -> String {
    format!("{} ({})", entry.value, entry.value_classification)
}

/// Crypto Fear & Greed index, latest reading
#[derive(Debug, Clone)]
pub struct FearGreedIndex {
    client: Client,
    url: String,
}

impl FearGreedIndex {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: FEAR_GREED_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn latest(&self) -> Result<FearGreedEntry, String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let body: FearGreedResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid body: {}", e))?;

        body.data
            .into_iter()
            .next()
            .ok_or_else(|| "empty data".to_string())
    }
}

#[async_trait]
impl ContextSource for FearGreedIndex {
    fn name(&self) -> &str {
        "Fear and Greed Index"
    }

    async fn fetch(&self) -> Option<String> {
        match self.latest().await {
            Ok(entry) => {
                debug!("Fear and Greed Index: {}", format_fear_greed(&entry));
                Some(format_fear_greed(&entry))
            }
            Err(e) => {
                warn!("Failed to fetch Fear and Greed Index: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news_results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
pub struct NewsResult {
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// One line per headline, at most five
pub fn format_headlines(results: &[NewsResult]) -> String {
    results
        .iter()
        .take(NEWS_HEADLINE_COUNT)
        .map(|news| match &news.date {
            Some(date) => format!("- {} ({})", news.title, date),
            None => format!("- {}", news.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Search term for a base asset code
pub fn news_query_for(base: &str) -> String {
    match base.to_uppercase().as_str() {
        "BTC" => "Bitcoin".to_string(),
        "ETH" => "Ethereum".to_string(),
        "XRP" => "Ripple".to_string(),
        "SOL" => "Solana".to_string(),
        other => other.to_string(),
    }
}

/// Latest Google News headlines through SerpAPI
pub struct NewsHeadlines {
    client: Client,
    url: String,
    api_key: Zeroizing<String>,
    query: String,
}

impl std::fmt::Debug for NewsHeadlines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsHeadlines")
            .field("url", &self.url)
            .field("query", &self.query)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl NewsHeadlines {
    pub fn new(api_key: Zeroizing<String>, query: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: SERP_API_URL.to_string(),
            api_key,
            query: query.into(),
        }
    }

    async fn search(&self) -> Result<Vec<NewsResult>, String> {
        let params = [
            ("engine", "google_news"),
            ("q", self.query.as_str()),
            ("gl", "us"),
            ("hl", "en"),
            ("api_key", self.api_key.as_str()),
        ];

        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let body: NewsResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid body: {}", e))?;
        Ok(body.news_results)
    }
}

#[async_trait]
impl ContextSource for NewsHeadlines {
    fn name(&self) -> &str {
        "Latest news headlines"
    }

    async fn fetch(&self) -> Option<String> {
        match self.search().await {
            Ok(results) if !results.is_empty() => Some(format_headlines(&results)),
            Ok(_) => {
                warn!("No news results found for '{}'", self.query);
                None
            }
            Err(e) => {
                warn!("Failed to fetch news for '{}': {}", self.query, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_strategy_notes_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  buy fear, sell greed ").unwrap();

        let source = StrategyNotesFile::new(file.path());
        assert_eq!(source.fetch().await.as_deref(), Some("buy fear, sell greed"));
    }

    #[tokio::test]
    async fn test_strategy_notes_missing_file() {
        let source = StrategyNotesFile::new("/nonexistent/strategy1.txt");
        assert!(source.fetch().await.is_none());
    }

    #[test]
    fn test_fear_greed_parse_and_format() {
        let body: FearGreedResponse = serde_json::from_str(
            r#"{"name":"Fear and Greed Index","data":[
                {"value":"25","value_classification":"Extreme Fear","timestamp":"1700000000","time_until_update":"100"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(format_fear_greed(&body.data[0]), "25 (Extreme Fear)");
    }

    #[tokio::test]
    async fn test_fear_greed_unreachable_is_none() {
        let source = FearGreedIndex::new(Duration::from_millis(500)).with_url("http://127.0.0.1:1/");
        assert!(source.fetch().await.is_none());
    }

    #[test]
    fn test_headlines_capped_at_five() {
        let results: Vec<NewsResult> = (0..8)
            .map(|i| NewsResult {
                title: format!("headline {}", i),
                date: Some("01/01/2024".to_string()),
            })
            .collect();
        let text = format_headlines(&results);
        assert_eq!(text.lines().count(), 5);
        assert!(text.starts_with("- headline 0 (01/01/2024)"));
    }

    #[test]
    fn test_news_response_without_results() {
        let body: NewsResponse = serde_json::from_str(r#"{"search_metadata":{}}"#).unwrap();
        assert!(body.news_results.is_empty());
    }

    #[test]
    fn test_news_query_for_base() {
        assert_eq!(news_query_for("btc"), "Bitcoin");
        assert_eq!(news_query_for("DOGE"), "DOGE");
    }
}
