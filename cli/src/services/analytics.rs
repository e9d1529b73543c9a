use crate::{
    error::CollaboratorError,
    models::{
        AnalysisDepth, BacktestParams, BacktestResult, Dataset, Holding, IndicatorResult,
        IndicatorSet, PortfolioResult, Strategy,
    },
};
use async_trait::async_trait;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Analytics backend consulted by the controller.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn compute_indicators(
        &self,
        dataset: &Dataset,
        indicators: &IndicatorSet,
    ) -> Result<IndicatorResult, CollaboratorError>;

    async fn run_backtest(
        &self,
        datasets: &[Arc<Dataset>],
        strategy: Strategy,
        params: &BacktestParams,
    ) -> Result<BacktestResult, CollaboratorError>;

    async fn compute_portfolio_metrics(
        &self,
        datasets: &[Arc<Dataset>],
        weights: &[f64],
    ) -> Result<PortfolioResult, CollaboratorError>;
}

pub const SUMMARY_INDICATORS: [&str; 8] = [
    "last_close",
    "first_close",
    "change_pct",
    "period_high",
    "period_low",
    "avg_close",
    "avg_volume",
    "observations",
];

/// Indicators computed when the user does not pick any.
pub fn default_indicators(depth: AnalysisDepth) -> IndicatorSet {
    let names: &[&str] = match depth {
        AnalysisDepth::Basic => &["last_close", "change_pct"],
        AnalysisDepth::Standard => &["last_close", "change_pct", "period_high", "period_low", "avg_volume"],
        AnalysisDepth::Comprehensive => &SUMMARY_INDICATORS,
    };
    IndicatorSet::new(names.iter().copied())
}

/// Built-in engine computing descriptive price statistics.
///
/// Anything beyond [`SUMMARY_INDICATORS`] is reported as unavailable, and
/// strategy simulation is not provided.
#[derive(Debug, Default, Clone)]
pub struct SummaryAnalytics;

impl SummaryAnalytics {
    pub fn new() -> Self {
        Self
    }
}

fn summary_value(dataset: &Dataset, name: &str) -> Option<f64> {
    let first = dataset.first()?;
    let last = dataset.last()?;
    let n = dataset.len() as f64;

    match name {
        "last_close" => Some(last.close),
        "first_close" => Some(first.close),
        "change_pct" => period_return_pct(dataset),
        "period_high" => dataset.points.iter().map(|p| p.high).reduce(f64::max),
        "period_low" => dataset.points.iter().map(|p| p.low).reduce(f64::min),
        "avg_close" => Some(dataset.points.iter().map(|p| p.close).sum::<f64>() / n),
        "avg_volume" => Some(dataset.points.iter().map(|p| p.volume as f64).sum::<f64>() / n),
        "observations" => Some(n),
        _ => None,
    }
}

fn period_return_pct(dataset: &Dataset) -> Option<f64> {
    let first = dataset.first()?.close;
    let last = dataset.last()?.close;
    (first != 0.0).then(|| (last - first) / first * 100.0)
}

fn require_points(dataset: &Dataset) -> Result<(), CollaboratorError> {
    if dataset.is_empty() {
        return Err(CollaboratorError::MissingData {
            symbol: dataset.symbol.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl AnalysisEngine for SummaryAnalytics {
    async fn compute_indicators(
        &self,
        dataset: &Dataset,
        indicators: &IndicatorSet,
    ) -> Result<IndicatorResult, CollaboratorError> {
        require_points(dataset)?;

        let mut values = BTreeMap::new();
        let mut unavailable = Vec::new();
        for name in indicators.iter() {
            match summary_value(dataset, name) {
                Some(value) => {
                    values.insert(name.to_string(), value);
                }
                None => unavailable.push(name.to_string()),
            }
        }

        Ok(IndicatorResult {
            symbol: dataset.symbol.clone(),
            values,
            unavailable,
        })
    }

    async fn run_backtest(
        &self,
        _datasets: &[Arc<Dataset>],
        strategy: Strategy,
        _params: &BacktestParams,
    ) -> Result<BacktestResult, CollaboratorError> {
        Err(CollaboratorError::Unsupported {
            capability: format!("backtesting ({})", strategy),
        })
    }

    async fn compute_portfolio_metrics(
        &self,
        datasets: &[Arc<Dataset>],
        weights: &[f64],
    ) -> Result<PortfolioResult, CollaboratorError> {
        if datasets.is_empty() || datasets.len() != weights.len() {
            return Err(CollaboratorError::provider(format!(
                "{} weights for {} datasets",
                weights.len(),
                datasets.len()
            )));
        }
        for dataset in datasets {
            require_points(dataset)?;
        }

        let holdings: Vec<Holding> = datasets
            .par_iter()
            .zip(weights.par_iter())
            .map(|(dataset, weight)| Holding {
                symbol: dataset.symbol.clone(),
                weight: *weight,
                period_return_pct: period_return_pct(dataset).unwrap_or(0.0),
            })
            .collect();

        let weighted: f64 = holdings.iter().map(|h| h.weight * h.period_return_pct).sum();
        let best = holdings.iter().map(|h| h.period_return_pct).reduce(f64::max);
        let worst = holdings.iter().map(|h| h.period_return_pct).reduce(f64::min);

        let mut metrics = BTreeMap::new();
        metrics.insert("weighted_return_pct".to_string(), weighted);
        metrics.insert("holdings".to_string(), holdings.len() as f64);
        if let (Some(best), Some(worst)) = (best, worst) {
            metrics.insert("best_return_pct".to_string(), best);
            metrics.insert("worst_return_pct".to_string(), worst);
        }

        Ok(PortfolioResult { holdings, metrics })
    }
}
