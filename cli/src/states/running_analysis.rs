use crate::{
    error::CollaboratorError,
    models::{AnalysisOutput, AnalysisRequest, AnalysisResult, Dataset, Symbol},
    services::{RealTimeMonitor, Renderable, TableView},
    state_machine::{BaseStateImpl, State, StateContext, StateName, StateTransitions, Transition},
    utils::Timer,
};
use std::sync::Arc;

/// RunningAnalysisState - dispatches the pending request to the analytics
/// engine or the monitor
pub struct RunningAnalysisState {
    base: BaseStateImpl,
}

impl Default for RunningAnalysisState {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a run produced no result.
enum RunFailure {
    Collaborator(CollaboratorError),
    Fatal(anyhow::Error),
}

impl From<CollaboratorError> for RunFailure {
    fn from(error: CollaboratorError) -> Self {
        RunFailure::Collaborator(error)
    }
}

impl From<anyhow::Error> for RunFailure {
    fn from(error: anyhow::Error) -> Self {
        RunFailure::Fatal(error)
    }
}

fn datasets_for(
    context: &StateContext,
    symbols: &[Symbol],
) -> Result<Vec<Arc<Dataset>>, CollaboratorError> {
    symbols
        .iter()
        .map(|symbol| {
            context
                .session
                .dataset(symbol)
                .ok_or_else(|| CollaboratorError::MissingData {
                    symbol: symbol.to_string(),
                })
        })
        .collect()
}

impl RunningAnalysisState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::RunningAnalysis),
        }
    }

    async fn execute(
        &self,
        context: &mut StateContext,
        request: &AnalysisRequest,
    ) -> Result<AnalysisOutput, RunFailure> {
        let analytics = Arc::clone(&context.analytics);

        match request {
            AnalysisRequest::TechnicalDashboard { symbol, indicators } => {
                let datasets = datasets_for(context, std::slice::from_ref(symbol))?;
                let mut results = Vec::with_capacity(1);
                for dataset in &datasets {
                    results.push(analytics.compute_indicators(dataset, indicators).await?);
                }
                Ok(AnalysisOutput::Indicators(results))
            }
            AnalysisRequest::CustomBuilder { symbols, indicators } => {
                let datasets = datasets_for(context, symbols)?;
                let mut results = Vec::with_capacity(datasets.len());
                for dataset in &datasets {
                    results.push(analytics.compute_indicators(dataset, indicators).await?);
                }
                Ok(AnalysisOutput::Indicators(results))
            }
            AnalysisRequest::PortfolioOptimization { symbols, weights } => {
                let datasets = datasets_for(context, symbols)?;
                let portfolio = analytics.compute_portfolio_metrics(&datasets, weights).await?;
                Ok(AnalysisOutput::Portfolio(portfolio))
            }
            AnalysisRequest::Backtest {
                symbols,
                strategy,
                params,
            } => {
                let datasets = datasets_for(context, symbols)?;
                let backtest = analytics.run_backtest(&datasets, *strategy, params).await?;
                Ok(AnalysisOutput::Backtest(backtest))
            }
            AnalysisRequest::RealTimeMonitor { symbols } => self.monitor(context, symbols).await,
        }
    }

    async fn monitor(
        &self,
        context: &mut StateContext,
        symbols: &[Symbol],
    ) -> Result<AnalysisOutput, RunFailure> {
        let Some(every) = context.session.settings.refresh.as_duration() else {
            return Err(CollaboratorError::Unsupported {
                capability: "real-time monitoring with refresh disabled".to_string(),
            }
            .into());
        };

        context.info(&format!(
            "Monitoring {} every {}s. Press Ctrl+C to stop.",
            symbols
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            every.as_secs()
        ))?;

        let monitor = RealTimeMonitor::new(Arc::clone(&context.provider), every)
            .with_max_polls(context.monitor_max_polls);
        let interrupts = context.interrupts.clone();
        let presenter = &mut context.presenter;

        let summary = monitor
            .run(symbols, &interrupts, |report| {
                let title = format!("Live Quotes (poll #{})", report.poll);
                presenter.render(&Renderable::Table(TableView::quotes(title, &report.quotes)))?;
                for (_, error) in &report.errors {
                    presenter.message(crate::services::MessageKind::Warning, &error.to_string())?;
                }
                Ok(())
            })
            .await?;

        if summary.quotes.is_empty() {
            let detail = summary
                .errors
                .first()
                .cloned()
                .unwrap_or_else(|| "no quotes received".to_string());
            return Err(CollaboratorError::provider(detail).into());
        }
        Ok(AnalysisOutput::Monitor(summary))
    }
}

#[async_trait::async_trait]
impl State for RunningAnalysisState {
    fn name(&self) -> StateName {
        StateName::RunningAnalysis
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        let Some(request) = context.pending_request.take() else {
            context.error("No analysis request pending")?;
            return Ok(self.base.transition_to(
                StateTransitions::create_state_by_name(StateName::MainMenu),
                "nothing to run",
            ));
        };

        let kind = request.kind();
        context.info(&format!("Running {}...", kind))?;
        let timer = Timer::start(kind.title());

        match self.execute(context, &request).await {
            Ok(output) => {
                timer.log_elapsed("RUNNING_ANALYSIS");
                context.session.last_result = Some(AnalysisResult::new(kind, output));
                Ok(self.base.transition_to(
                    StateTransitions::create_state_by_name(StateName::DisplayResults),
                    &format!("{} completed", kind),
                ))
            }
            Err(RunFailure::Collaborator(e)) => {
                // The previous result stays in place.
                self.base.logger.warn(&format!("{} failed: {}", kind, e));
                context.error(&format!("Analysis failed: {}", e))?;
                Ok(self.base.transition_to(
                    StateTransitions::create_state_by_name(StateName::MainMenu),
                    &format!("{} failed", kind),
                ))
            }
            Err(RunFailure::Fatal(e)) => Err(e),
        }
    }
}
