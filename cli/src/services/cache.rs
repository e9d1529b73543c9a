use super::MarketDataProvider;
use crate::{
    error::CollaboratorError,
    models::{Dataset, DateRange, Quote, Symbol},
    utils::Logger,
};
use async_trait::async_trait;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

/// File cache in front of a provider's history endpoint.
///
/// Entries are JSON datasets keyed by provider, symbol and range, and expire
/// after `ttl` based on file modification time. Quotes always pass through.
pub struct CachedProvider<P> {
    inner: P,
    cache_dir: PathBuf,
    ttl: Duration,
    logger: Logger,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P, cache_dir: impl Into<PathBuf>, ttl: Duration) -> anyhow::Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;

        let logger = Logger::new("CACHE");
        logger.debug(&format!("history cache at {}", cache_dir.display()));

        Ok(Self {
            inner,
            cache_dir,
            ttl,
            logger,
        })
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn cache_file(&self, symbol: &Symbol, range: DateRange) -> PathBuf {
        let name = format!(
            "{}_{}_{}_{}.json",
            self.inner.name(),
            symbol.as_str().replace(['^', '='], "_"),
            range.start().format("%Y%m%d"),
            range.end().format("%Y%m%d")
        );
        self.cache_dir.join(name)
    }

    fn load_from_cache(&self, cache_file: &Path) -> Option<Dataset> {
        if self.ttl.is_zero() || !cache_file.exists() {
            return None;
        }

        let age = fs::metadata(cache_file)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())?;

        if age > self.ttl {
            self.logger.debug(&format!("expired: {}", cache_file.display()));
            let _ = fs::remove_file(cache_file);
            return None;
        }

        match fs::read_to_string(cache_file).map(|content| serde_json::from_str::<Dataset>(&content)) {
            Ok(Ok(dataset)) => Some(dataset),
            Ok(Err(e)) => {
                self.logger.warn_with_error("discarding corrupt cache entry", &e);
                let _ = fs::remove_file(cache_file);
                None
            }
            Err(e) => {
                self.logger.warn_with_error("cache read failed", &e);
                None
            }
        }
    }

    fn save_to_cache(&self, cache_file: &Path, dataset: &Dataset) -> anyhow::Result<()> {
        let content = serde_json::to_string(dataset)?;
        let mut file = File::create(cache_file)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        range: DateRange,
    ) -> Result<Dataset, CollaboratorError> {
        let cache_file = self.cache_file(symbol, range);
        if let Some(dataset) = self.load_from_cache(&cache_file) {
            self.logger.debug(&format!("cache hit: {} {}", symbol, range));
            return Ok(dataset);
        }

        let dataset = self.inner.fetch_history(symbol, range).await?;

        if !self.ttl.is_zero() && !dataset.is_empty() {
            if let Err(e) = self.save_to_cache(&cache_file, &dataset) {
                self.logger.warn(&format!("failed to cache {}: {}", symbol, e));
            }
        }
        Ok(dataset)
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError> {
        self.inner.fetch_quote(symbol).await
    }
}
