use futures::future::join_all;
use marketlens::{
    error::{CollaboratorError, ExportError, ValidationError},
    models::{
        AnalysisDepth, AnalysisKind, AnalysisOutput, AnalysisResult, BacktestParams, DateRange,
        Dataset, MonitorSummary, OutputFormat, Quote, Settings, Strategy, Symbol, SymbolSet,
    },
    services::{default_indicators, AnalysisEngine, MarketDataProvider, ResultExporter},
    utils::{count_weekdays, file_timestamp, parse_symbol_list, Timer},
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Periods shorter than this many trading days get a warning.
pub const SHORT_PERIOD_DAYS: usize = 30;

/// Formats the batch exporter can write.
pub const BATCH_FORMATS: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Csv, OutputFormat::Html];

/// Validated options for one non-interactive run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub symbols: Vec<Symbol>,
    pub range: DateRange,
    pub benchmark: Option<Symbol>,
    pub real_time: bool,
    pub backtest: bool,
    pub strategy: Strategy,
    pub format: OutputFormat,
    pub output_dir: PathBuf,
    pub depth: AnalysisDepth,
}

/// Raw flag values before validation.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub symbols: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub benchmark: Option<String>,
    pub real_time: bool,
    pub backtest: bool,
    pub strategy: Option<String>,
    pub output: Option<String>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("none of the requested symbols could be loaded")]
    NothingLoaded,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Setup(#[from] anyhow::Error),
}

impl BatchError {
    /// Process exit status: 2 for bad input, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            BatchError::Invalid(_) => 2,
            _ => 1,
        }
    }
}

impl BatchOptions {
    /// Validate flags against the configured defaults.
    pub fn from_raw(
        raw: RawOptions,
        defaults: &Settings,
        today: chrono::NaiveDate,
    ) -> Result<Self, ValidationError> {
        let parsed = parse_symbol_list(&raw.symbols.join(","))?;
        if let Some(rejected) = parsed.rejected.into_iter().next() {
            return Err(rejected);
        }

        let range = match (raw.start_date.as_deref(), raw.end_date.as_deref()) {
            (None, None) => DateRange::default_ending(today),
            (start, end) => {
                let default = DateRange::default_ending(today);
                let start = start.map(str::to_string).unwrap_or_else(|| default.start().to_string());
                let end = end.map(str::to_string).unwrap_or_else(|| today.to_string());
                DateRange::parse(&start, &end)?
            }
        };

        let benchmark = match raw.benchmark.as_deref().map(str::trim) {
            None => Some(Symbol::parse("SPY")?),
            Some("") | Some("none") => None,
            Some(name) => Some(Symbol::parse(name)?),
        };

        let strategy = match raw.strategy.as_deref() {
            Some(name) => Strategy::parse(name)?,
            None => Strategy::default(),
        };

        let format = match raw.output.as_deref() {
            Some(name) => OutputFormat::parse(name)?,
            None => defaults.output_format,
        };
        if !BATCH_FORMATS.contains(&format) {
            return Err(ValidationError::InvalidSetting {
                name: "output format",
                input: format.extension().to_string(),
            });
        }

        Ok(Self {
            symbols: parsed.symbols.to_vec(),
            range,
            benchmark,
            real_time: raw.real_time,
            backtest: raw.backtest,
            strategy,
            format,
            output_dir: raw.output_dir.unwrap_or_else(|| defaults.export_dir.clone()),
            depth: defaults.analysis_depth,
        })
    }
}

/// Everything one run produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub loaded: Vec<Symbol>,
    pub failed: Vec<(Symbol, CollaboratorError)>,
    pub results: Vec<AnalysisResult>,
    pub warnings: Vec<String>,
    pub exported: Vec<PathBuf>,
}

/// One-shot analysis over a fixed symbol list.
pub struct BatchRunner {
    provider: Arc<dyn MarketDataProvider>,
    analytics: Arc<dyn AnalysisEngine>,
}

fn kind_slug(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::TechnicalDashboard => "indicators",
        AnalysisKind::PortfolioOptimization => "portfolio",
        AnalysisKind::Backtest => "backtest",
        AnalysisKind::RealTimeMonitor => "quotes",
        AnalysisKind::CustomBuilder => "custom",
    }
}

impl BatchRunner {
    pub fn new(provider: Arc<dyn MarketDataProvider>, analytics: Arc<dyn AnalysisEngine>) -> Self {
        Self { provider, analytics }
    }

    pub async fn run(&self, options: &BatchOptions) -> Result<BatchReport, BatchError> {
        let timer = Timer::start("batch run");
        let mut report = BatchReport::default();

        let weekdays = count_weekdays(options.range.start(), options.range.end());
        if weekdays < SHORT_PERIOD_DAYS {
            report.warnings.push(format!(
                "Short period: about {} trading days; some statistics may be unreliable",
                weekdays
            ));
        }

        let mut wanted: SymbolSet = options.symbols.iter().cloned().collect();
        if let Some(benchmark) = &options.benchmark {
            wanted.insert(benchmark.clone());
        }

        info!(symbols = wanted.len(), range = %options.range, "loading history");
        let datasets = self.load(&wanted.to_vec(), options.range, &mut report).await;

        // The benchmark is context only; analyses need at least one requested symbol.
        let analyzed: Vec<Arc<Dataset>> = datasets
            .iter()
            .filter(|d| options.symbols.contains(&d.symbol))
            .cloned()
            .collect();
        if analyzed.is_empty() {
            return Err(BatchError::NothingLoaded);
        }

        let indicators = default_indicators(options.depth);
        let mut per_symbol = Vec::with_capacity(datasets.len());
        for dataset in &datasets {
            per_symbol.push(self.analytics.compute_indicators(dataset, &indicators).await?);
        }
        report.results.push(AnalysisResult::new(
            AnalysisKind::TechnicalDashboard,
            AnalysisOutput::Indicators(per_symbol),
        ));

        if analyzed.len() > 1 {
            let weights = vec![1.0 / analyzed.len() as f64; analyzed.len()];
            let portfolio = self
                .analytics
                .compute_portfolio_metrics(&analyzed, &weights)
                .await?;
            report.results.push(AnalysisResult::new(
                AnalysisKind::PortfolioOptimization,
                AnalysisOutput::Portfolio(portfolio),
            ));
        }

        if options.real_time {
            let symbols: Vec<Symbol> = analyzed.iter().map(|d| d.symbol.clone()).collect();
            let snapshot = self.quote_snapshot(&symbols).await;
            if !snapshot.errors.is_empty() {
                report.warnings.extend(snapshot.errors.iter().cloned());
            }
            report.results.push(AnalysisResult::new(
                AnalysisKind::RealTimeMonitor,
                AnalysisOutput::Monitor(snapshot),
            ));
        }

        if options.backtest {
            match self
                .analytics
                .run_backtest(&analyzed, options.strategy, &BacktestParams::default())
                .await
            {
                Ok(backtest) => report.results.push(AnalysisResult::new(
                    AnalysisKind::Backtest,
                    AnalysisOutput::Backtest(backtest),
                )),
                Err(e @ CollaboratorError::Unsupported { .. }) => {
                    report.warnings.push(format!("Backtest skipped: {}", e))
                }
                Err(e) => return Err(e.into()),
            }
        }

        timer.log_elapsed("BATCH");
        Ok(report)
    }

    async fn load(
        &self,
        symbols: &[Symbol],
        range: DateRange,
        report: &mut BatchReport,
    ) -> Vec<Arc<Dataset>> {
        let results = join_all(
            symbols
                .iter()
                .map(|symbol| self.provider.fetch_history(symbol, range)),
        )
        .await;

        let mut datasets = Vec::with_capacity(symbols.len());
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(dataset) if !dataset.is_empty() => {
                    debug!(%symbol, bars = dataset.len(), "history loaded");
                    report.loaded.push(symbol.clone());
                    datasets.push(Arc::new(dataset));
                }
                Ok(_) => {
                    warn!(%symbol, "no history in range");
                    report.failed.push((
                        symbol.clone(),
                        CollaboratorError::MissingData {
                            symbol: symbol.to_string(),
                        },
                    ));
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "history load failed");
                    report.failed.push((symbol.clone(), e));
                }
            }
        }
        datasets
    }

    /// A single poll of current quotes.
    async fn quote_snapshot(&self, symbols: &[Symbol]) -> MonitorSummary {
        let results = join_all(symbols.iter().map(|s| self.provider.fetch_quote(s))).await;

        let mut quotes: Vec<Quote> = Vec::new();
        let mut errors = Vec::new();
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => errors.push(format!("{}: {}", symbol, e)),
            }
        }
        MonitorSummary {
            polls: 1,
            quotes,
            errors,
        }
    }

    /// Write each result as `analysis_<timestamp>_<kind>.<ext>`.
    pub fn export(
        &self,
        report: &mut BatchReport,
        options: &BatchOptions,
    ) -> Result<(), BatchError> {
        let exporter = ResultExporter::new(&options.output_dir);
        let stamp = file_timestamp();
        for result in &report.results {
            let path = options.output_dir.join(format!(
                "analysis_{}_{}.{}",
                stamp,
                kind_slug(result.kind),
                options.format.extension()
            ));
            let written = exporter.export(result, options.format, Some(&path))?;
            report.exported.push(written);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use marketlens::{
        models::{PricePoint, SymbolMetadata},
        services::SummaryAnalytics,
    };

    struct FakeProvider;

    fn dataset(symbol: &Symbol, range: DateRange, base: f64) -> Dataset {
        let points = (0..40)
            .filter_map(|i| {
                let date = range.start() + chrono::Duration::days(i);
                range.contains(date).then(|| {
                    let close = base + i as f64;
                    PricePoint::new(date, close, close + 1.0, close - 1.0, close, 1_000)
                })
            })
            .collect();
        let metadata = SymbolMetadata {
            name: Some(symbol.to_string()),
            ..SymbolMetadata::default()
        };
        Dataset::new(symbol.clone(), range, "fake", metadata, points)
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_history(
            &self,
            symbol: &Symbol,
            range: DateRange,
        ) -> Result<Dataset, CollaboratorError> {
            match symbol.as_str() {
                "ZZZZ" => Err(CollaboratorError::not_found("ZZZZ")),
                "SPY" => Ok(dataset(symbol, range, 400.0)),
                _ => Ok(dataset(symbol, range, 100.0)),
            }
        }

        async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError> {
            Err(CollaboratorError::network(format!("{} offline", symbol)))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn raw(symbols: &[&str]) -> RawOptions {
        RawOptions {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-02-01".into()),
            ..RawOptions::default()
        }
    }

    fn runner() -> BatchRunner {
        BatchRunner::new(Arc::new(FakeProvider), Arc::new(SummaryAnalytics::new()))
    }

    #[test]
    fn options_validate_dates_and_symbols() {
        let settings = Settings::default();

        let mut reversed = raw(&["AAPL"]);
        reversed.start_date = Some("2024-06-01".into());
        reversed.end_date = Some("2024-01-01".into());
        let err = BatchOptions::from_raw(reversed, &settings, today()).unwrap_err();
        assert!(err.to_string().contains("start date must precede end date"));
        assert_eq!(BatchError::from(err).exit_code(), 2);

        assert!(BatchOptions::from_raw(raw(&[]), &settings, today()).is_err());
        assert!(BatchOptions::from_raw(raw(&["AAPL", "??"]), &settings, today()).is_err());

        let options = BatchOptions::from_raw(raw(&["aapl", "msft aapl"]), &settings, today()).unwrap();
        assert_eq!(options.symbols.len(), 2);
        assert_eq!(options.benchmark.as_ref().map(|s| s.as_str()), Some("SPY"));
        assert_eq!(options.format, OutputFormat::Json);
    }

    #[test]
    fn pdf_output_is_rejected_as_bad_input() {
        let mut options = raw(&["AAPL"]);
        options.output = Some("pdf".into());
        let err = BatchOptions::from_raw(options, &Settings::default(), today()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSetting { name: "output format", .. }));
        assert_eq!(BatchError::from(err).exit_code(), 2);

        let pdf_default = Settings {
            output_format: OutputFormat::Pdf,
            ..Settings::default()
        };
        assert!(BatchOptions::from_raw(raw(&["AAPL"]), &pdf_default, today()).is_err());

        let mut html = raw(&["AAPL"]);
        html.output = Some("html".into());
        let options = BatchOptions::from_raw(html, &Settings::default(), today()).unwrap();
        assert_eq!(options.format, OutputFormat::Html);
    }

    #[test]
    fn missing_dates_default_to_a_year() {
        let mut options = raw(&["AAPL"]);
        options.start_date = None;
        options.end_date = None;
        let options = BatchOptions::from_raw(options, &Settings::default(), today()).unwrap();
        assert_eq!(options.range, DateRange::default_ending(today()));
    }

    #[tokio::test]
    async fn run_skips_unknown_symbols_and_warns_on_short_periods() {
        let mut raw = raw(&["AAPL", "MSFT", "ZZZZ"]);
        raw.real_time = true;
        raw.backtest = true;
        let options = BatchOptions::from_raw(raw, &Settings::default(), today()).unwrap();

        let report = runner().run(&options).await.unwrap();
        assert_eq!(report.loaded.len(), 3); // AAPL, MSFT, SPY
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.to_string().contains("symbol not found"));

        let kinds: Vec<AnalysisKind> = report.results.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AnalysisKind::TechnicalDashboard,
                AnalysisKind::PortfolioOptimization,
                AnalysisKind::RealTimeMonitor,
            ]
        );
        assert!(report.warnings.iter().any(|w| w.starts_with("Short period")));
        assert!(report.warnings.iter().any(|w| w.starts_with("Backtest skipped")));
        assert!(report.warnings.iter().any(|w| w.contains("offline")));
    }

    #[tokio::test]
    async fn run_fails_when_nothing_loads() {
        let options = BatchOptions::from_raw(raw(&["ZZZZ"]), &Settings::default(), today()).unwrap();
        let err = runner().run(&options).await.unwrap_err();
        assert!(matches!(err, BatchError::NothingLoaded));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn export_writes_one_file_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = raw(&["AAPL"]);
        raw.output = Some("csv".into());
        raw.output_dir = Some(dir.path().to_path_buf());
        let options = BatchOptions::from_raw(raw, &Settings::default(), today()).unwrap();

        let runner = runner();
        let mut report = runner.run(&options).await.unwrap();
        runner.export(&mut report, &options).unwrap();

        assert_eq!(report.exported.len(), report.results.len());
        let first = std::fs::read_to_string(&report.exported[0]).unwrap();
        assert!(first.starts_with("Symbol,Metric,Value"));
        assert!(first.contains("AAPL,last_close"));
    }
}
