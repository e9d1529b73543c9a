pub mod alphavantage;
pub mod analytics;
pub mod cache;
pub mod console;
pub mod data_provider;
pub mod exporter;
pub mod monitor;
pub mod presentation;
pub mod session_store;
pub mod yahoo;

#[cfg(test)]
pub(crate) mod test_server;

pub use alphavantage::*;
pub use analytics::*;
pub use cache::*;
pub use console::*;
pub use data_provider::MarketDataProvider;
pub use exporter::*;
pub use monitor::*;
pub use presentation::*;
pub use session_store::*;
pub use yahoo::*;

use crate::{
    config::{AppConfig, ProviderKind},
    error::ConfigError,
};
use std::sync::Arc;

const YAHOO_RATE_LIMIT: u32 = 60;

/// Build the configured provider behind the history cache.
pub fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    let cache = &config.cache;
    let provider: Arc<dyn MarketDataProvider> = match config.provider {
        ProviderKind::Yahoo => Arc::new(CachedProvider::new(
            YahooClient::new(YAHOO_RATE_LIMIT)?,
            &cache.dir,
            cache.ttl,
        )?),
        ProviderKind::AlphaVantage => {
            let key = config
                .alpha_vantage_api_key
                .clone()
                .ok_or(ConfigError::MissingApiKey {
                    provider: "alphavantage",
                    variable: "ALPHA_VANTAGE_API_KEY",
                })?;
            Arc::new(CachedProvider::new(
                AlphaVantageClient::new(key, FREE_TIER_RATE_LIMIT)?,
                &cache.dir,
                cache.ttl,
            )?)
        }
        ProviderKind::Quandl => return Err(ConfigError::UnsupportedProvider("quandl").into()),
    };

    tracing::info!(provider = provider.name(), "data provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphavantage_requires_key() {
        let config = AppConfig {
            provider: ProviderKind::AlphaVantage,
            ..AppConfig::default()
        };
        let err = build_provider(&config).err().unwrap();
        assert!(err.to_string().contains("ALPHA_VANTAGE_API_KEY"));
    }

    #[test]
    fn quandl_has_no_adapter() {
        let config = AppConfig {
            provider: ProviderKind::Quandl,
            ..AppConfig::default()
        };
        assert!(build_provider(&config).is_err());
    }

    #[tokio::test]
    async fn yahoo_provider_builds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.cache.dir = dir.path().to_path_buf();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "yahoo");
    }
}
