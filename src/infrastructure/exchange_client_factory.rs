//! Exchange Client Factory
//!
//! Builds the configured exchange client once at startup. The same client is
//! shared by the trading cycle (market reads) and the order executor.

use crate::config::{AppConfig, Credentials};
use crate::domain::repositories::context_source::ContextSource;
use crate::domain::repositories::exchange_client::ExchangeClient;
use crate::infrastructure::context_sources::{
    news_query_for, FearGreedIndex, NewsHeadlines, StrategyNotesFile,
};
use crate::infrastructure::exchange_rest_client::{ExchangeRestClient, ExchangeRestConfig};
use std::sync::Arc;
use tracing::{error, info};

pub struct ExchangeClientFactory;

impl ExchangeClientFactory {
    /// Create the client for `config.exchange` trading `config.market`
    pub fn create(
        config: &AppConfig,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ExchangeClient>, String> {
        let rest_config = ExchangeRestConfig {
            timeout: config.http_timeout,
            ..ExchangeRestConfig::for_exchange(config.exchange)
        };

        match ExchangeRestClient::new_with_config(
            config.exchange,
            config.market.clone(),
            &credentials.exchange_access_key,
            &credentials.exchange_secret_key,
            rest_config,
        ) {
            Ok(client) => {
                info!(
                    "✓ {} client created for {}",
                    config.exchange, config.market
                );
                Ok(Arc::new(client) as Arc<dyn ExchangeClient>)
            }
            Err(e) => {
                error!("✗ Failed to create {} client: {}", config.exchange, e);
                Err(e)
            }
        }
    }

    /// Strategy notes and Fear & Greed always; news only with a SerpAPI key
    pub fn context_sources(
        config: &AppConfig,
        credentials: &Credentials,
    ) -> Vec<Box<dyn ContextSource>> {
        let mut sources: Vec<Box<dyn ContextSource>> = vec![
            Box::new(StrategyNotesFile::new(&config.strategy_notes_path)),
            Box::new(FearGreedIndex::new(config.http_timeout)),
        ];

        if let Some(key) = &credentials.serp_api_key {
            sources.push(Box::new(NewsHeadlines::new(
                key.clone(),
                news_query_for(&config.market.base),
                config.http_timeout,
            )));
        }

        info!("{} context sources configured", sources.len());
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::exchange::Exchange;
    use zeroize::Zeroizing;

    fn credentials(serp: Option<&str>) -> Credentials {
        Credentials {
            exchange_access_key: Zeroizing::new("access".to_string()),
            exchange_secret_key: Zeroizing::new("secret".to_string()),
            openai_api_key: Zeroizing::new("sk-test".to_string()),
            serp_api_key: serp.map(|s| Zeroizing::new(s.to_string())),
        }
    }

    #[test]
    fn test_create_configured_exchange() {
        let config = AppConfig {
            exchange: Exchange::Upbit,
            ..AppConfig::default()
        };
        let client = ExchangeClientFactory::create(&config, &credentials(None)).unwrap();
        assert_eq!(client.name(), "upbit");
    }

    #[test]
    fn test_create_rejects_empty_keys() {
        let mut creds = credentials(None);
        creds.exchange_secret_key = Zeroizing::new(String::new());
        assert!(ExchangeClientFactory::create(&AppConfig::default(), &creds).is_err());
    }

    #[test]
    fn test_news_source_requires_key() {
        let config = AppConfig::default();
        assert_eq!(
            ExchangeClientFactory::context_sources(&config, &credentials(None)).len(),
            2
        );
        let sources = ExchangeClientFactory::context_sources(&config, &credentials(Some("serp")));
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[2].name(), "Latest news headlines");
    }
}
