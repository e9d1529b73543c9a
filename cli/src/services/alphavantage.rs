use super::data_provider::{MarketDataProvider, RateLimiter};
use crate::{
    error::CollaboratorError,
    models::{Dataset, DateRange, PricePoint, Quote, Symbol, SymbolMetadata},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";
// Free tier allows 5 calls per minute.
pub const FREE_TIER_RATE_LIMIT: u32 = 5;

/// Alpha Vantage daily series client.
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl AlphaVantageClient {
    pub fn new(api_key: impl Into<String>, rate_limit_per_minute: u32) -> Result<Self, CollaboratorError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: ALPHA_VANTAGE_URL.to_string(),
            api_key: api_key.into(),
            limiter: RateLimiter::new(rate_limit_per_minute),
        })
    }

    async fn query(&self, function: &str, symbol: &Symbol) -> Result<Value, CollaboratorError> {
        let params = [
            ("function", function),
            ("symbol", symbol.as_str()),
            ("outputsize", "full"),
            ("apikey", self.api_key.as_str()),
        ];
        self.limiter.acquire().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollaboratorError::RateLimited {
                provider: "alphavantage".to_string(),
            });
        }
        if !status.is_success() {
            return Err(CollaboratorError::provider(format!(
                "alphavantage returned {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        check_body(symbol, body)
    }
}

/// The API answers 200 for throttling and unknown symbols; the body says
/// which.
fn check_body(symbol: &Symbol, body: Value) -> Result<Value, CollaboratorError> {
    if body.get("Note").is_some() || body.get("Information").is_some() {
        return Err(CollaboratorError::RateLimited {
            provider: "alphavantage".to_string(),
        });
    }
    if body.get("Error Message").is_some() {
        return Err(CollaboratorError::not_found(symbol.as_str()));
    }
    Ok(body)
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    fn name(&self) -> &str {
        "alphavantage"
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        range: DateRange,
    ) -> Result<Dataset, CollaboratorError> {
        let body = self.query("TIME_SERIES_DAILY", symbol).await?;
        parse_daily_series(symbol, range, body)
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError> {
        let body = self.query("GLOBAL_QUOTE", symbol).await?;
        parse_global_quote(symbol, body)
    }
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    #[serde(rename = "Meta Data", default)]
    meta: BTreeMap<String, String>,
    #[serde(rename = "Time Series (Daily)")]
    series: BTreeMap<String, DailyBar>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteBody {
    #[serde(rename = "Global Quote", default)]
    quote: BTreeMap<String, String>,
}

fn number(field: &str, raw: &str) -> Result<f64, CollaboratorError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CollaboratorError::provider(format!("bad {} value '{}'", field, raw)))
}

fn parse_daily_series(
    symbol: &Symbol,
    range: DateRange,
    body: Value,
) -> Result<Dataset, CollaboratorError> {
    let series: DailySeries = serde_json::from_value(body)
        .map_err(|e| CollaboratorError::provider(format!("invalid daily series: {}", e)))?;

    let mut points = Vec::with_capacity(series.series.len());
    for (day, bar) in &series.series {
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|_| CollaboratorError::provider(format!("bad date '{}'", day)))?;
        if !range.contains(date) {
            continue;
        }
        points.push(PricePoint::new(
            date,
            number("open", &bar.open)?,
            number("high", &bar.high)?,
            number("low", &bar.low)?,
            number("close", &bar.close)?,
            number("volume", &bar.volume)? as u64,
        ));
    }

    let metadata = SymbolMetadata {
        name: None,
        exchange: None,
        currency: None,
        instrument_type: series
            .meta
            .get("1. Information")
            .map(|_| "EQUITY".to_string()),
    };

    Ok(Dataset::new(symbol.clone(), range, "alphavantage", metadata, points))
}

fn parse_global_quote(symbol: &Symbol, body: Value) -> Result<Quote, CollaboratorError> {
    let parsed: GlobalQuoteBody = serde_json::from_value(body)
        .map_err(|e| CollaboratorError::provider(format!("invalid quote: {}", e)))?;
    let fields = parsed.quote;

    // Unknown symbols come back as an empty "Global Quote" object.
    let price = match fields.get("05. price") {
        Some(raw) => number("price", raw)?,
        None => return Err(CollaboratorError::not_found(symbol.as_str())),
    };

    Ok(Quote {
        symbol: symbol.clone(),
        price,
        previous_close: fields
            .get("08. previous close")
            .and_then(|raw| raw.parse().ok()),
        volume: fields.get("06. volume").and_then(|raw| raw.parse().ok()),
        currency: None,
        as_of: Utc::now(),
    })
}
