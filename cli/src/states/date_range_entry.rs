use crate::{
    models::{DateRange, TimeRange},
    services::{ChartView, Renderable, TableView},
    state_machine::{BaseStateImpl, State, StateContext, StateName, StateTransitions, Transition},
    utils::{count_weekdays, parse_yes_no, today},
};

/// DateRangeEntryState - picks the analysis window, then reloads history
/// over it
pub struct DateRangeEntryState {
    base: BaseStateImpl,
    /// Set after a rejected custom range so the next tick asks for the
    /// dates again directly.
    retry_custom: bool,
}

impl Default for DateRangeEntryState {
    fn default() -> Self {
        Self::new()
    }
}

impl DateRangeEntryState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::DateRangeEntry),
            retry_custom: false,
        }
    }

    fn back(&self) -> Option<Transition> {
        self.base.transition_to(
            StateTransitions::create_state_by_name(StateName::MainMenu),
            "back",
        )
    }

    /// Returns `Ok(None)` when the user backed out mid-entry.
    async fn read_custom_range(
        &self,
        context: &mut StateContext,
    ) -> anyhow::Result<Option<Result<DateRange, String>>> {
        let Some(start) = context.ask("Start date (YYYY-MM-DD): ").await? else {
            return Ok(None);
        };
        let Some(end) = context.ask("End date (YYYY-MM-DD): ").await? else {
            return Ok(None);
        };
        Ok(Some(DateRange::parse(&start, &end).map_err(|e| e.to_string())))
    }

    async fn custom_entry(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        match self.read_custom_range(context).await? {
            None => Ok(self.back()),
            Some(Ok(range)) => {
                self.retry_custom = false;
                self.accept(context, range).await
            }
            Some(Err(message)) => {
                // The session range is left as it was.
                context.error(&message)?;
                self.retry_custom = true;
                Ok(self.base.stay_in_state("invalid date range"))
            }
        }
    }

    async fn accept(
        &self,
        context: &mut StateContext,
        range: DateRange,
    ) -> anyhow::Result<Option<Transition>> {
        context.session.date_range = range;

        let weekdays = count_weekdays(range.start(), range.end());
        if weekdays < 30 {
            context.warn(&format!(
                "Short period: about {} trading days; some statistics may be unreliable",
                weekdays
            ))?;
        }

        if context.session.has_symbols() {
            context.info(&format!("Loading data for {}...", range))?;
            let report = context.reload_datasets().await;
            context.report_failures(&report)?;

            let datasets = context.session.loaded_datasets();
            let summary = TableView::symbol_summary(datasets.iter().map(|d| d.as_ref()));
            context.render(&Renderable::Table(summary))?;
            let chart = ChartView::closes("Close Prices", datasets.iter().map(|d| d.as_ref()));
            context.render(&Renderable::Chart(chart))?;
        }

        Ok(self.base.transition_to(
            StateTransitions::create_state_by_name(StateName::MainMenu),
            &format!("date range set to {}", range),
        ))
    }
}

#[async_trait::async_trait]
impl State for DateRangeEntryState {
    fn name(&self) -> StateName {
        StateName::DateRangeEntry
    }

    async fn enter(&mut self, context: &mut StateContext) -> anyhow::Result<()> {
        let current = context.session.date_range;
        context.info(&format!("Current date range: {}", current))
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        if self.retry_custom {
            return self.custom_entry(context).await;
        }

        let Some(answer) = context
            .ask("Use custom date range? [y/N] (or preset 1M, 3M, 6M, 1Y, 2Y, 5Y): ")
            .await?
        else {
            return Ok(self.back());
        };

        if let Some(preset) = TimeRange::from_str_opt(&answer) {
            return self.accept(context, preset.ending(today())).await;
        }

        match parse_yes_no(&answer, false) {
            Some(false) => {
                self.accept(context, DateRange::default_ending(today()))
                    .await
            }
            Some(true) => self.custom_entry(context).await,
            None => {
                context.error(&format!("invalid selection '{}'", answer))?;
                Ok(self.base.stay_in_state("invalid answer"))
            }
        }
    }
}
