use async_trait::async_trait;
use chrono::{Duration, Utc};
use marketlens::{
    config::AppConfig,
    error::CollaboratorError,
    models::{
        AnalysisKind, AnalysisOutput, DateRange, Dataset, PricePoint, Quote, RefreshInterval,
        Symbol, SymbolMetadata,
    },
    services::{
        AnalysisEngine, ConsolePresenter, MarketDataProvider, ScriptedConsole, SessionStore,
        SharedBuffer, SummaryAnalytics,
    },
    state_machine::{Collaborators, SessionController, StateContext, StateName},
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Serves 60 daily bars ending at the requested end date. `ZZZZ` does not
/// exist.
struct FakeProvider;

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
        if symbol.as_str() == "ZZZZ" {
            return Err(CollaboratorError::not_found(symbol.as_str()));
        }
        let points = (0..60)
            .map(|i| range.end() - Duration::days(i))
            .filter(|date| range.contains(*date))
            .enumerate()
            .map(|(i, date)| {
                let close = 200.0 - i as f64;
                PricePoint::new(date, close, close + 2.0, close - 2.0, close, 10_000)
            })
            .collect();
        let metadata = SymbolMetadata {
            name: Some(format!("{} Inc.", symbol)),
            ..SymbolMetadata::default()
        };
        Ok(Dataset::new(symbol.clone(), range, "fake", metadata, points))
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError> {
        if symbol.as_str() == "ZZZZ" {
            return Err(CollaboratorError::not_found(symbol.as_str()));
        }
        Ok(Quote {
            symbol: symbol.clone(),
            price: 201.5,
            previous_close: Some(200.0),
            volume: Some(1_000),
            currency: Some("USD".to_string()),
            as_of: Utc::now(),
        })
    }
}

struct Harness {
    controller: SessionController,
    output: SharedBuffer,
    dir: TempDir,
}

impl Harness {
    fn new(script: &[&str]) -> Self {
        Self::with_config(script, |_| {})
    }

    fn with_config(script: &[&str], tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.settings.export_dir = dir.path().to_path_buf();
        config.settings.color = false;
        config.settings.emoji = false;
        config.settings_file = dir.path().join("settings.json");
        tweak(&mut config);

        let output = SharedBuffer::new();
        let analytics: Arc<dyn AnalysisEngine> = Arc::new(SummaryAnalytics::new());
        let collaborators = Collaborators {
            provider: Arc::new(FakeProvider),
            analytics,
            presenter: Box::new(ConsolePresenter::with_writer(
                Box::new(output.clone()),
                &config.settings,
            )),
            console: Box::new(ScriptedConsole::new(script.iter().copied())),
        };
        let context =
            StateContext::new(&config, collaborators).with_monitor_max_polls(Some(1));

        Self {
            controller: SessionController::new(context),
            output,
            dir,
        }
    }

    async fn run(&mut self) {
        self.controller.run().await.unwrap();
    }

    async fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.controller.step().await.unwrap();
        }
    }

    fn symbols(&self) -> Vec<String> {
        self.controller
            .session()
            .symbols
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn text(&self) -> String {
        self.output.contents()
    }
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(ext))
        .collect()
}

#[tokio::test]
async fn symbols_are_uppercased_and_deduplicated() {
    let mut h = Harness::new(&["1", "aapl, googl , msft aapl", "n", "0"]);
    h.run().await;

    assert_eq!(h.symbols(), vec!["AAPL", "GOOGL", "MSFT"]);
    assert_eq!(h.controller.session().datasets.len(), 3);
    assert_eq!(h.controller.current_state_name(), StateName::Exiting);
}

#[tokio::test]
async fn reversed_dates_are_rejected_and_range_is_kept() {
    let mut h = Harness::new(&["1", "aapl", "y", "2024-06-01", "2024-01-01", "back", "0"]);
    let before = h.controller.session().date_range;
    h.run().await;

    assert!(h.text().contains("start date must precede end date"));
    assert_eq!(h.controller.session().date_range, before);
    assert_eq!(h.controller.current_state_name(), StateName::Exiting);
}

#[tokio::test]
async fn rejected_range_asks_for_dates_again() {
    let mut h = Harness::new(&[
        "1",
        "aapl",
        "y",
        "2024-06-01",
        "2024-01-01",
        "2024-01-01",
        "2024-06-01",
        "0",
    ]);
    h.run().await;

    assert!(h.text().contains("start date must precede end date"));
    let range = h.controller.session().date_range;
    assert_eq!(range.start().to_string(), "2024-01-01");
    assert_eq!(range.end().to_string(), "2024-06-01");
    assert!(!h.text().contains("invalid selection"));
    assert_eq!(h.controller.current_state_name(), StateName::Exiting);
}

#[tokio::test]
async fn custom_dates_replace_the_range_and_reload() {
    let mut h = Harness::new(&["1", "aapl", "y", "2024-01-01", "2024-06-01", "0"]);
    h.run().await;

    let range = h.controller.session().date_range;
    assert_eq!(range.start().to_string(), "2024-01-01");
    assert_eq!(range.end().to_string(), "2024-06-01");
    let dataset = h
        .controller
        .session()
        .dataset(&Symbol::parse("AAPL").unwrap())
        .unwrap();
    assert_eq!(dataset.range, range);
    assert!(h.text().contains("Close Prices"));
}

#[tokio::test]
async fn short_preset_warns() {
    let mut h = Harness::new(&["1", "aapl", "1M", "0"]);
    h.run().await;
    assert!(h.text().contains("Short period"));
}

#[tokio::test]
async fn zero_exits_successfully() {
    let mut h = Harness::new(&["0"]);
    assert!(!h.controller.step().await.unwrap());
    assert_eq!(h.controller.current_state_name(), StateName::Exiting);
    assert!(h.text().contains("Goodbye"));

    // Terminal: further steps do nothing.
    assert!(!h.controller.step().await.unwrap());
    assert_eq!(h.controller.get_stats().transition_count, 1);
}

#[tokio::test]
async fn end_of_input_exits() {
    let mut h = Harness::new(&[]);
    h.run().await;
    assert_eq!(h.controller.current_state_name(), StateName::Exiting);
}

#[tokio::test]
async fn unknown_symbol_is_reported_and_excluded() {
    let mut h = Harness::new(&["1", "ZZZZ"]);
    h.steps(2).await;

    assert_eq!(h.controller.current_state_name(), StateName::SymbolEntry);
    assert!(h.text().contains("symbol not found"));
    assert!(h.symbols().is_empty());
}

#[tokio::test]
async fn partial_failures_keep_the_valid_symbols() {
    let mut h = Harness::new(&["1", "aapl zzzz 12$"]);
    h.steps(2).await;

    assert_eq!(h.controller.current_state_name(), StateName::DateRangeEntry);
    assert_eq!(h.symbols(), vec!["AAPL"]);
    let text = h.text();
    assert!(text.contains("symbol not found: ZZZZ"));
    assert!(text.contains("invalid symbol '12$'"));
}

#[tokio::test]
async fn invalid_menu_choice_stays_in_main_menu() {
    let mut h = Harness::new(&["42", "abc"]);
    h.steps(2).await;

    assert_eq!(h.controller.current_state_name(), StateName::MainMenu);
    assert!(h.text().contains("invalid selection '42'"));
    assert!(h.controller.transition_history().is_empty());
}

#[tokio::test]
async fn analysis_requires_loaded_symbols() {
    let mut h = Harness::new(&["2", "0"]);
    h.run().await;

    assert!(h.text().contains("No symbols loaded"));
    assert!(h.controller.session().last_result.is_none());
}

#[tokio::test]
async fn dashboard_runs_and_displays() {
    let mut h = Harness::new(&["1", "aapl", "n", "2", "n", "0"]);
    h.run().await;

    let result = h.controller.session().last_result.as_ref().unwrap();
    assert_eq!(result.kind, AnalysisKind::TechnicalDashboard);
    match &result.output {
        AnalysisOutput::Indicators(results) => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].symbol.as_str(), "AAPL");
            assert!(results[0].values.contains_key("last_close"));
        }
        other => panic!("unexpected output {:?}", other),
    }
    assert!(h.text().contains("Price Trend"));
}

#[tokio::test]
async fn collaborator_failure_keeps_last_result() {
    // Dashboard succeeds, then the bundled engine declines the backtest.
    let mut h = Harness::new(&["1", "aapl", "n", "2", "n", "4", "", "0"]);
    h.run().await;

    let text = h.text();
    assert!(text.contains("Analysis failed"));
    let result = h.controller.session().last_result.as_ref().unwrap();
    assert_eq!(result.kind, AnalysisKind::TechnicalDashboard);

    let history = h.controller.transition_history();
    assert!(history.iter().any(|t| t.from == StateName::RunningAnalysis.to_string()
        && t.to == StateName::MainMenu.to_string()));
}

#[tokio::test]
async fn portfolio_uses_entered_weights() {
    let mut h = Harness::new(&["1", "aapl msft", "n", "3", "3, 1", "n", "0"]);
    h.run().await;

    let result = h.controller.session().last_result.as_ref().unwrap();
    match &result.output {
        AnalysisOutput::Portfolio(portfolio) => {
            let weights: Vec<f64> = portfolio.holdings.iter().map(|h| h.weight).collect();
            assert_eq!(weights, vec![0.75, 0.25]);
        }
        other => panic!("unexpected output {:?}", other),
    }
}

#[tokio::test]
async fn bad_weights_reprompt() {
    let mut h = Harness::new(&["1", "aapl msft", "n", "3", "1", "back", "0"]);
    h.run().await;

    assert!(h.text().contains("invalid weights"));
    assert!(h.controller.session().last_result.is_none());
}

#[tokio::test]
async fn custom_builder_reports_unavailable_indicators() {
    let mut h = Harness::new(&["1", "aapl", "n", "6", "last_close, rsi", "n", "0"]);
    h.run().await;

    let result = h.controller.session().last_result.as_ref().unwrap();
    assert_eq!(result.kind, AnalysisKind::CustomBuilder);
    assert!(h.text().contains("not available from this engine: rsi"));
}

#[tokio::test]
async fn monitor_polls_and_records_quotes() {
    let mut h = Harness::with_config(&["1", "aapl", "n", "5", "n", "0"], |config| {
        config.settings.refresh = RefreshInterval::Every(1);
    });
    h.run().await;

    let result = h.controller.session().last_result.as_ref().unwrap();
    match &result.output {
        AnalysisOutput::Monitor(summary) => {
            assert_eq!(summary.polls, 1);
            assert_eq!(summary.quotes.len(), 1);
            assert_eq!(summary.quotes[0].price, 201.5);
        }
        other => panic!("unexpected output {:?}", other),
    }
    assert!(h.text().contains("Live Quotes (poll #1)"));
}

#[tokio::test]
async fn monitor_requires_refresh() {
    let mut h = Harness::with_config(&["1", "aapl", "n", "5", "0"], |config| {
        config.settings.refresh = RefreshInterval::Disabled;
    });
    h.run().await;

    assert!(h.text().contains("Real-time refresh is disabled"));
    assert!(h.controller.session().last_result.is_none());
}

#[tokio::test]
async fn results_export_in_requested_format() {
    let mut h = Harness::new(&["1", "aapl", "n", "2", "csv", "0"]);
    h.run().await;

    let exported = files_with_extension(h.dir.path(), ".csv");
    assert_eq!(exported.len(), 1);
    assert!(exported[0].starts_with("analysis_"));
    let content = std::fs::read_to_string(h.dir.path().join(&exported[0])).unwrap();
    assert!(content.starts_with("Symbol,Metric,Value"));
}

#[tokio::test]
async fn pdf_export_is_reported_without_writing() {
    let mut h = Harness::new(&["1", "aapl", "n", "2", "pdf", "0"]);
    h.run().await;

    assert!(files_with_extension(h.dir.path(), ".pdf").is_empty());
    assert!(h.text().contains("PDF"));
    assert_eq!(h.controller.current_state_name(), StateName::Exiting);
    assert!(h.controller.session().last_result.is_some());
}

#[tokio::test]
async fn settings_are_edited_and_saved() {
    let mut h = Harness::new(&["8", "3", "on", "2", "off", "s", "back", "0"]);
    h.run().await;

    let settings = &h.controller.session().settings;
    assert!(settings.color);
    assert_eq!(settings.refresh, RefreshInterval::Disabled);

    let saved = SessionStore::load_settings(&h.dir.path().join("settings.json")).unwrap();
    assert_eq!(&saved, settings);
}

#[tokio::test]
async fn invalid_setting_value_is_rejected() {
    let mut h = Harness::new(&["8", "2", "-1", "back", "0"]);
    h.run().await;

    assert!(h.text().contains("invalid value '-1' for refresh interval"));
    assert_eq!(
        h.controller.session().settings.refresh,
        RefreshInterval::default()
    );
}

#[tokio::test]
async fn session_save_and_restore() {
    let mut h = Harness::new(&["1", "aapl msft", "n", "7", "s", "0"]);
    h.run().await;
    let saved_symbols = h.symbols();
    let dir = h.dir;

    let mut restored = Harness::with_config(&["7", "l", "1", "0"], |config| {
        config.settings.export_dir = dir.path().to_path_buf();
    });
    restored.run().await;

    assert_eq!(restored.symbols(), saved_symbols);
    assert_eq!(restored.controller.session().datasets.len(), 2);
    assert!(restored.text().contains("Session restored"));
}

#[tokio::test]
async fn transition_history_records_each_move() {
    let mut h = Harness::new(&["1", "back", "8", "back", "0"]);
    h.run().await;

    let moves: Vec<(String, String)> = h
        .controller
        .transition_history()
        .iter()
        .map(|t| (t.from.clone(), t.to.clone()))
        .collect();
    let expected: Vec<(String, String)> = [
        (StateName::MainMenu, StateName::SymbolEntry),
        (StateName::SymbolEntry, StateName::MainMenu),
        (StateName::MainMenu, StateName::SettingsMenu),
        (StateName::SettingsMenu, StateName::MainMenu),
        (StateName::MainMenu, StateName::Exiting),
    ]
    .iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect();
    assert_eq!(moves, expected);
}
