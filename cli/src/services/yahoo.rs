use super::data_provider::{MarketDataProvider, RateLimiter};
use crate::{
    error::CollaboratorError,
    models::{Dataset, DateRange, PricePoint, Quote, Symbol, SymbolMetadata},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Yahoo Finance chart API client.
pub struct YahooClient {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl YahooClient {
    pub fn new(rate_limit_per_minute: u32) -> Result<Self, CollaboratorError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: YAHOO_CHART_URL.to_string(),
            limiter: RateLimiter::new(rate_limit_per_minute),
        })
    }

    /// Sends exactly one request; errors are returned without retry.
    async fn get_chart(
        &self,
        symbol: &Symbol,
        query: &[(&str, String)],
    ) -> Result<ChartResponse, CollaboratorError> {
        let url = format!("{}/{}", self.base_url, symbol);
        self.limiter.acquire().await;

        let response = self.client.get(&url).query(query).send().await.map_err(|e| {
            tracing::debug!(%symbol, error = %e, "yahoo request failed");
            CollaboratorError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CollaboratorError::not_found(symbol.as_str()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollaboratorError::RateLimited {
                provider: "yahoo".to_string(),
            });
        }
        if !status.is_success() {
            return Err(CollaboratorError::provider(format!("yahoo returned {}", status)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| CollaboratorError::provider(format!("invalid chart response: {}", e)))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        range: DateRange,
    ) -> Result<Dataset, CollaboratorError> {
        let period1 = range.start().and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        let period2 = range.end().and_hms_opt(23, 59, 59).unwrap_or_default().and_utc().timestamp();
        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ];

        let chart = self.get_chart(symbol, &query).await?;
        chart_to_dataset(symbol, range, chart)
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError> {
        let query = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        let chart = self.get_chart(symbol, &query).await?;
        chart_to_quote(symbol, chart)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    exchange_name: Option<String>,
    #[serde(default)]
    instrument_type: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
    #[serde(default)]
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

fn first_result(symbol: &Symbol, chart: ChartResponse) -> Result<ChartResult, CollaboratorError> {
    if let Some(error) = chart.chart.error {
        let description = error.description.unwrap_or_default();
        if error.code.eq_ignore_ascii_case("Not Found") || description.contains("No data found") {
            return Err(CollaboratorError::not_found(symbol.as_str()));
        }
        return Err(CollaboratorError::provider(format!("{}: {}", error.code, description)));
    }

    chart
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| CollaboratorError::not_found(symbol.as_str()))
}

fn chart_to_dataset(
    symbol: &Symbol,
    range: DateRange,
    chart: ChartResponse,
) -> Result<Dataset, CollaboratorError> {
    let result = first_result(symbol, chart)?;
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let points: Vec<PricePoint> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::<Utc>::from_timestamp(*ts, 0)?.date_naive();
            let close = (*quote.close.get(i)?)?;
            let open = quote.open.get(i).copied().flatten().unwrap_or(close);
            let high = quote.high.get(i).copied().flatten().unwrap_or(close);
            let low = quote.low.get(i).copied().flatten().unwrap_or(close);
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
            Some(PricePoint::new(date, open, high, low, close, volume))
        })
        .filter(|p| range.contains(p.date))
        .collect();

    let meta = result.meta;
    let metadata = SymbolMetadata {
        name: meta.long_name.or(meta.short_name),
        exchange: meta.exchange_name,
        currency: meta.currency,
        instrument_type: meta.instrument_type,
    };

    Ok(Dataset::new(symbol.clone(), range, "yahoo", metadata, points))
}

fn chart_to_quote(symbol: &Symbol, chart: ChartResponse) -> Result<Quote, CollaboratorError> {
    let result = first_result(symbol, chart)?;
    let meta = result.meta;
    let price = meta
        .regular_market_price
        .ok_or_else(|| CollaboratorError::MissingData {
            symbol: symbol.to_string(),
        })?;

    Ok(Quote {
        symbol: symbol.clone(),
        price,
        previous_close: meta.chart_previous_close.or(meta.previous_close),
        volume: meta.regular_market_volume,
        currency: meta.currency,
        as_of: meta
            .regular_market_time
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now),
    })
}
