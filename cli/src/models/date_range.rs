use crate::error::ValidationError;
use chrono::{Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookback used when the user declines custom entry.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// Inclusive calendar range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::StartNotBeforeEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings, naming the field that failed.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_date("start", start)?;
        let end = parse_date("end", end)?;
        Self::new(start, end)
    }

    /// One-year lookback ending on `today`.
    pub fn default_ending(today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(DEFAULT_LOOKBACK_DAYS),
            end: today,
        }
    }

    pub fn default_lookback() -> Self {
        Self::default_ending(Utc::now().date_naive())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::default_lookback()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

pub fn parse_date(field: &'static str, input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        input: input.trim().to_string(),
    })
}

/// Preset lookback windows accepted at date entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "2Y")]
    TwoYears,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::OneMonth,
        TimeRange::ThreeMonths,
        TimeRange::SixMonths,
        TimeRange::OneYear,
        TimeRange::TwoYears,
        TimeRange::FiveYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneMonth => "1M",
            TimeRange::ThreeMonths => "3M",
            TimeRange::SixMonths => "6M",
            TimeRange::OneYear => "1Y",
            TimeRange::TwoYears => "2Y",
            TimeRange::FiveYears => "5Y",
        }
    }

    pub fn from_str_opt(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|range| range.as_str().eq_ignore_ascii_case(input))
    }

    fn months(&self) -> u32 {
        match self {
            TimeRange::OneMonth => 1,
            TimeRange::ThreeMonths => 3,
            TimeRange::SixMonths => 6,
            TimeRange::OneYear => 12,
            TimeRange::TwoYears => 24,
            TimeRange::FiveYears => 60,
        }
    }

    pub fn ending(&self, today: NaiveDate) -> DateRange {
        let start = today
            .checked_sub_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MIN);
        DateRange { start, end: today }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_start_after_end() {
        let err = DateRange::parse("2024-06-01", "2024-01-01").unwrap_err();
        assert!(matches!(err, ValidationError::StartNotBeforeEnd { .. }));
        assert!(DateRange::parse("2024-01-01", "2024-01-01").is_err());
    }

    #[test]
    fn names_the_unparseable_field() {
        let err = DateRange::parse("2024-01-01", "tomorrow").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDate {
                field: "end",
                input: "tomorrow".to_string()
            }
        );
    }

    #[test]
    fn default_is_one_year_ending_today() {
        let range = DateRange::default_ending(date(2024, 3, 1));
        assert_eq!(range.end(), date(2024, 3, 1));
        assert_eq!(range.days(), DEFAULT_LOOKBACK_DAYS);
    }

    #[test]
    fn presets_parse_case_insensitively() {
        let range = TimeRange::from_str_opt("6m").unwrap().ending(date(2024, 8, 31));
        assert_eq!(range.start(), date(2024, 2, 29));
        assert!(TimeRange::from_str_opt("7Q").is_none());
    }

    #[test]
    fn deserializing_enforces_order() {
        let bad = r#"{"start":"2024-02-01","end":"2024-01-01"}"#;
        assert!(serde_json::from_str::<DateRange>(bad).is_err());
        let good = r#"{"start":"2024-01-01","end":"2024-02-01"}"#;
        assert_eq!(serde_json::from_str::<DateRange>(good).unwrap().days(), 31);
    }
}
