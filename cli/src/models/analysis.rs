use super::{Quote, Symbol};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Analyses offered from the analysis menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    TechnicalDashboard,
    PortfolioOptimization,
    Backtest,
    RealTimeMonitor,
    CustomBuilder,
}

impl AnalysisKind {
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisKind::TechnicalDashboard => "Technical Analysis Dashboard",
            AnalysisKind::PortfolioOptimization => "Portfolio Analysis & Optimization",
            AnalysisKind::Backtest => "Backtesting Engine",
            AnalysisKind::RealTimeMonitor => "Real-time Data Monitor",
            AnalysisKind::CustomBuilder => "Custom Analysis Builder",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    MovingAverage,
    Rsi,
    Macd,
    BollingerBands,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::MovingAverage,
        Strategy::Rsi,
        Strategy::Macd,
        Strategy::BollingerBands,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::MovingAverage => "moving_average",
            Strategy::Rsi => "rsi",
            Strategy::Macd => "macd",
            Strategy::BollingerBands => "bollinger_bands",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == input)
            .ok_or(ValidationError::InvalidSetting {
                name: "strategy",
                input,
            })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of indicators requested from the analytics engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet(Vec<String>);

impl IndicatorSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndicatorSet::default();
        for name in names {
            set.push(name);
        }
        set
    }

    /// Parse a comma or space separated list (`sma_20, rsi`).
    pub fn parse(input: &str) -> Self {
        Self::new(
            input
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into().trim().to_ascii_lowercase();
        if !name.is_empty() && !self.0.contains(&name) {
            self.0.push(name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    pub initial_capital: f64,
    pub commission_pct: f64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission_pct: 0.1,
        }
    }
}

/// Parameters collected in the analysis menu for the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisRequest {
    TechnicalDashboard {
        symbol: Symbol,
        indicators: IndicatorSet,
    },
    PortfolioOptimization {
        symbols: Vec<Symbol>,
        weights: Vec<f64>,
    },
    Backtest {
        symbols: Vec<Symbol>,
        strategy: Strategy,
        params: BacktestParams,
    },
    RealTimeMonitor {
        symbols: Vec<Symbol>,
    },
    CustomBuilder {
        symbols: Vec<Symbol>,
        indicators: IndicatorSet,
    },
}

impl AnalysisRequest {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisRequest::TechnicalDashboard { .. } => AnalysisKind::TechnicalDashboard,
            AnalysisRequest::PortfolioOptimization { .. } => AnalysisKind::PortfolioOptimization,
            AnalysisRequest::Backtest { .. } => AnalysisKind::Backtest,
            AnalysisRequest::RealTimeMonitor { .. } => AnalysisKind::RealTimeMonitor,
            AnalysisRequest::CustomBuilder { .. } => AnalysisKind::CustomBuilder,
        }
    }
}

/// Indicator values for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub symbol: Symbol,
    pub values: BTreeMap<String, f64>,
    /// Requested indicators the engine could not produce.
    pub unavailable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    pub weight: f64,
    pub period_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub holdings: Vec<Holding>,
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy: Strategy,
    pub symbols: Vec<Symbol>,
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub polls: u32,
    pub quotes: Vec<Quote>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnalysisOutput {
    Indicators(Vec<IndicatorResult>),
    Portfolio(PortfolioResult),
    Backtest(BacktestResult),
    Monitor(MonitorSummary),
}

/// Result of the last successful analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub kind: AnalysisKind,
    pub completed_at: DateTime<Utc>,
    pub output: AnalysisOutput,
}

/// Flat `(symbol, metric, value)` row used by tables and exports.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub symbol: String,
    pub metric: String,
    pub value: f64,
}

impl AnalysisResult {
    pub fn new(kind: AnalysisKind, output: AnalysisOutput) -> Self {
        Self {
            kind,
            completed_at: Utc::now(),
            output,
        }
    }

    pub fn metric_rows(&self) -> Vec<MetricRow> {
        let row = |symbol: &str, metric: &str, value: f64| MetricRow {
            symbol: symbol.to_string(),
            metric: metric.to_string(),
            value,
        };

        match &self.output {
            AnalysisOutput::Indicators(results) => results
                .iter()
                .flat_map(|r| {
                    r.values
                        .iter()
                        .map(move |(name, value)| row(r.symbol.as_str(), name, *value))
                })
                .collect(),
            AnalysisOutput::Portfolio(portfolio) => {
                let mut rows: Vec<MetricRow> = portfolio
                    .holdings
                    .iter()
                    .flat_map(|h| {
                        [
                            row(h.symbol.as_str(), "weight", h.weight),
                            row(h.symbol.as_str(), "period_return_pct", h.period_return_pct),
                        ]
                    })
                    .collect();
                rows.extend(
                    portfolio
                        .metrics
                        .iter()
                        .map(|(name, value)| row("PORTFOLIO", name, *value)),
                );
                rows
            }
            AnalysisOutput::Backtest(backtest) => backtest
                .metrics
                .iter()
                .map(|(name, value)| row(backtest.strategy.as_str(), name, *value))
                .collect(),
            AnalysisOutput::Monitor(summary) => summary
                .quotes
                .iter()
                .map(|q| row(q.symbol.as_str(), "price", q.price))
                .collect(),
        }
    }
}
