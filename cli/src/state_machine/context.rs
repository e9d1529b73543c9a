use crate::{
    config::AppConfig,
    error::CollaboratorError,
    models::{AnalysisKind, AnalysisRequest, Session, Settings, Symbol},
    services::{
        AnalysisEngine, Console, InterruptSignal, MarketDataProvider, MessageKind, Presenter,
        Renderable, ResultExporter, SessionStore,
    },
    utils::{Logger, Timer},
};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;

/// Keyword that backs out of any prompt below the main menu.
pub const BACK_KEYWORD: &str = "back";

/// External collaborators handed to the controller at construction.
pub struct Collaborators {
    pub provider: Arc<dyn MarketDataProvider>,
    pub analytics: Arc<dyn AnalysisEngine>,
    pub presenter: Box<dyn Presenter>,
    pub console: Box<dyn Console>,
}

/// Outcome of loading history for a batch of symbols.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<Symbol>,
    pub failed: Vec<(Symbol, CollaboratorError)>,
}

/// State context shared between all states.
///
/// Owns the session record and every collaborator; only the controller
/// mutates it.
pub struct StateContext {
    pub session: Session,
    pub provider: Arc<dyn MarketDataProvider>,
    pub analytics: Arc<dyn AnalysisEngine>,
    pub presenter: Box<dyn Presenter>,
    pub console: Box<dyn Console>,
    pub exporter: ResultExporter,
    pub store: SessionStore,
    pub interrupts: InterruptSignal,
    pub settings_file: PathBuf,
    /// Poll cap for the real-time monitor; `None` runs until interrupted.
    pub monitor_max_polls: Option<u32>,
    /// Analysis picked from the main menu, consumed by `AnalysisSelect`.
    pub pending_kind: Option<AnalysisKind>,
    /// Fully parameterized request, consumed by `RunningAnalysis`.
    pub pending_request: Option<AnalysisRequest>,
    logger: Logger,
}

impl StateContext {
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Self {
        let settings = config.settings.clone();
        let mut presenter = collaborators.presenter;
        presenter.apply_settings(&settings);

        Self {
            exporter: ResultExporter::new(&settings.export_dir),
            store: SessionStore::new(&settings.export_dir),
            session: Session::new(settings),
            provider: collaborators.provider,
            analytics: collaborators.analytics,
            presenter,
            console: collaborators.console,
            interrupts: InterruptSignal::new(),
            settings_file: config.settings_file.clone(),
            monitor_max_polls: None,
            pending_kind: None,
            pending_request: None,
            logger: Logger::new("CONTEXT"),
        }
    }

    pub fn with_interrupts(mut self, interrupts: InterruptSignal) -> Self {
        self.interrupts = interrupts;
        self
    }

    pub fn with_monitor_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.monitor_max_polls = max_polls;
        self
    }

    /// Read one trimmed line. `back` and end of input both yield `None`.
    pub async fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .read_line(prompt)
            .await?
            .filter(|line| !line.eq_ignore_ascii_case(BACK_KEYWORD)))
    }

    /// Read one trimmed line; `None` only at end of input.
    pub async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .console
            .read_line(prompt)
            .await?
            .map(|line| line.trim().to_string()))
    }

    pub fn say(&mut self, kind: MessageKind, text: &str) -> anyhow::Result<()> {
        self.presenter.message(kind, text)?;
        Ok(())
    }

    pub fn info(&mut self, text: &str) -> anyhow::Result<()> {
        self.say(MessageKind::Info, text)
    }

    pub fn success(&mut self, text: &str) -> anyhow::Result<()> {
        self.say(MessageKind::Success, text)
    }

    pub fn warn(&mut self, text: &str) -> anyhow::Result<()> {
        self.say(MessageKind::Warning, text)
    }

    pub fn error(&mut self, text: &str) -> anyhow::Result<()> {
        self.say(MessageKind::Error, text)
    }

    pub fn render(&mut self, item: &Renderable) -> anyhow::Result<()> {
        self.presenter.render(item)?;
        Ok(())
    }

    /// Replace the session settings and propagate them to the collaborators.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.presenter.apply_settings(&settings);
        self.exporter.set_export_dir(&settings.export_dir);
        self.store.set_dir(&settings.export_dir);
        self.session.settings = settings;
    }

    /// Fetch history for `symbols` over the session range. Successes join
    /// the session; failures are returned and leave the session untouched.
    pub async fn load_symbols(&mut self, symbols: &[Symbol]) -> LoadReport {
        let range = self.session.date_range;
        let timer = Timer::start("history load");
        let provider = Arc::clone(&self.provider);
        let results = join_all(symbols.iter().map(|s| provider.fetch_history(s, range))).await;

        let mut report = LoadReport::default();
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(dataset) => {
                    self.logger.debug(&format!("{}: {} bars", symbol, dataset.len()));
                    self.session.add_symbol(dataset);
                    report.loaded.push(symbol.clone());
                }
                Err(e) => {
                    self.logger.warn(&format!("{}: {}", symbol, e));
                    report.failed.push((symbol.clone(), e));
                }
            }
        }
        timer.log_elapsed("CONTEXT");
        report
    }

    /// Refetch every session symbol over the current range. A symbol whose
    /// reload fails keeps its place but loses its stale dataset.
    pub async fn reload_datasets(&mut self) -> LoadReport {
        let symbols = self.session.symbols.to_vec();
        self.session.datasets.clear();
        self.load_symbols(&symbols).await
    }

    pub fn report_failures(&mut self, report: &LoadReport) -> anyhow::Result<()> {
        for (_, error) in &report.failed {
            self.error(&error.to_string())?;
        }
        Ok(())
    }
}
