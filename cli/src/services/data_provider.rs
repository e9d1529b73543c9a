use crate::{
    error::CollaboratorError,
    models::{Dataset, DateRange, Quote, Symbol},
};
use async_trait::async_trait;
use std::time::{Duration, SystemTime};
use tokio::{sync::Mutex, time::sleep};

/// Source of market data. A symbol is valid iff `fetch_history` succeeds
/// for it.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        range: DateRange,
    ) -> Result<Dataset, CollaboratorError>;

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError>;
}

/// Sliding one-minute request window shared by the HTTP adapters.
pub(crate) struct RateLimiter {
    per_minute: u32,
    timestamps: Mutex<Vec<SystemTime>>,
}

impl RateLimiter {
    pub(crate) fn new(per_minute: u32) -> Self {
        Self {
            per_minute: per_minute.max(1),
            timestamps: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn acquire(&self) {
        let window = Duration::from_secs(60);
        let mut timestamps = self.timestamps.lock().await;
        let now = SystemTime::now();

        timestamps.retain(|t| now.duration_since(*t).unwrap_or_default() < window);

        if timestamps.len() >= self.per_minute as usize {
            if let Some(oldest) = timestamps.first() {
                let wait = window.saturating_sub(now.duration_since(*oldest).unwrap_or_default());
                if !wait.is_zero() {
                    tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
                    sleep(wait + Duration::from_millis(100)).await;
                }
            }
        }

        timestamps.push(SystemTime::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_allows_requests_under_limit() {
        let limiter = RateLimiter::new(3);
        let start = std::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
