use super::{DateRange, Symbol};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Descriptive metadata returned with history. Its presence is what makes a
/// symbol valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub instrument_type: Option<String>,
}

/// History for one symbol over a range, owned by the data provider that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub symbol: Symbol,
    pub range: DateRange,
    pub provider: String,
    pub metadata: SymbolMetadata,
    pub points: Vec<PricePoint>,
}

impl Dataset {
    pub fn new(
        symbol: Symbol,
        range: DateRange,
        provider: impl Into<String>,
        metadata: SymbolMetadata,
        mut points: Vec<PricePoint>,
    ) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            symbol,
            range,
            provider: provider.into(),
            metadata,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

/// Latest quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub volume: Option<u64>,
    pub currency: Option<String>,
    pub as_of: DateTime<Utc>,
}

impl Quote {
    pub fn change_pct(&self) -> Option<f64> {
        self.previous_close
            .filter(|prev| *prev != 0.0)
            .map(|prev| (self.price - prev) / prev * 100.0)
    }
}
