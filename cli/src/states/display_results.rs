use crate::{
    models::{AnalysisOutput, OutputFormat},
    services::{ChartView, Renderable, TableView},
    state_machine::{BaseStateImpl, State, StateContext, StateName, StateTransitions, Transition},
    utils::parse_yes_no,
};

/// DisplayResultsState - shows the last result and offers an export
pub struct DisplayResultsState {
    base: BaseStateImpl,
}

impl Default for DisplayResultsState {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayResultsState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::DisplayResults),
        }
    }

    fn done(&self, reason: &str) -> Option<Transition> {
        self.base.transition_to(
            StateTransitions::create_state_by_name(StateName::MainMenu),
            reason,
        )
    }

    fn export(&self, context: &mut StateContext, format: OutputFormat) -> anyhow::Result<()> {
        let Some(result) = context.session.last_result.as_ref() else {
            return context.warn("Nothing to export");
        };
        match context.exporter.export(result, format, None) {
            Ok(path) => context.success(&format!("Exported {} to {}", format, path.display())),
            Err(e) => context.error(&e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl State for DisplayResultsState {
    fn name(&self) -> StateName {
        StateName::DisplayResults
    }

    async fn enter(&mut self, context: &mut StateContext) -> anyhow::Result<()> {
        let Some(result) = context.session.last_result.clone() else {
            return context.warn("No results to display");
        };

        context.render(&Renderable::Table(TableView::from_result(&result)))?;

        match &result.output {
            AnalysisOutput::Indicators(results) => {
                for r in results.iter().filter(|r| !r.unavailable.is_empty()) {
                    context.warn(&format!(
                        "{}: not available from this engine: {}",
                        r.symbol,
                        r.unavailable.join(", ")
                    ))?;
                }
                let datasets: Vec<_> = results
                    .iter()
                    .filter_map(|r| context.session.dataset(&r.symbol))
                    .collect();
                if !datasets.is_empty() {
                    let chart = ChartView::closes("Price Trend", datasets.iter().map(|d| d.as_ref()));
                    context.render(&Renderable::Chart(chart))?;
                }
            }
            AnalysisOutput::Monitor(summary) => {
                context.info(&format!("Monitor stopped after {} polls", summary.polls))?;
                for error in &summary.errors {
                    context.warn(error)?;
                }
            }
            AnalysisOutput::Portfolio(_) | AnalysisOutput::Backtest(_) => {}
        }
        Ok(())
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        let default_format = context.session.settings.output_format;
        let prompt = format!(
            "Export results? [y/N] (y = {}, or json/csv/html/pdf): ",
            default_format
        );
        let Some(answer) = context.ask(&prompt).await? else {
            return Ok(self.done("acknowledged"));
        };

        if let Ok(format) = OutputFormat::parse(&answer) {
            self.export(context, format)?;
            return Ok(self.done("exported"));
        }

        match parse_yes_no(&answer, false) {
            Some(true) => {
                self.export(context, default_format)?;
                Ok(self.done("exported"))
            }
            Some(false) => Ok(self.done("acknowledged")),
            None => {
                context.error(&format!("invalid selection '{}'", answer))?;
                Ok(self.base.stay_in_state("invalid answer"))
            }
        }
    }
}
