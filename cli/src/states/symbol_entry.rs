use crate::{
    state_machine::{BaseStateImpl, State, StateContext, StateName, StateTransitions, Transition},
    utils::parse_symbol_list,
};

/// SymbolEntryState - reads a symbol list and validates each symbol against
/// the data provider
pub struct SymbolEntryState {
    base: BaseStateImpl,
}

impl Default for SymbolEntryState {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolEntryState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::SymbolEntry),
        }
    }
}

#[async_trait::async_trait]
impl State for SymbolEntryState {
    fn name(&self) -> StateName {
        StateName::SymbolEntry
    }

    async fn enter(&mut self, context: &mut StateContext) -> anyhow::Result<()> {
        if context.session.has_symbols() {
            let current = context.session.symbols.joined(", ");
            context.info(&format!("Current symbols: {}", current))?;
        }
        Ok(())
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        let Some(input) = context
            .ask("Enter stock symbols (e.g. AAPL, GOOGL, MSFT): ")
            .await?
        else {
            return Ok(self.base.transition_to(
                StateTransitions::create_state_by_name(StateName::MainMenu),
                "back",
            ));
        };

        let parsed = match parse_symbol_list(&input) {
            Ok(parsed) => parsed,
            Err(e) => {
                context.error(&e.to_string())?;
                return Ok(self.base.stay_in_state("empty symbol list"));
            }
        };
        for rejected in &parsed.rejected {
            context.error(&rejected.to_string())?;
        }

        let symbols = parsed.symbols.to_vec();
        if symbols.is_empty() {
            return Ok(self.base.stay_in_state("no well-formed symbols"));
        }

        context.info(&format!("Validating {} symbols...", symbols.len()))?;
        let report = context.load_symbols(&symbols).await;
        context.report_failures(&report)?;

        if report.loaded.is_empty() {
            return Ok(self.base.stay_in_state("no valid symbols"));
        }

        let loaded: Vec<String> = report.loaded.iter().map(|s| s.to_string()).collect();
        context.success(&format!("Loaded: {}", loaded.join(", ")))?;

        Ok(self.base.transition_to(
            StateTransitions::create_state_by_name(StateName::DateRangeEntry),
            &format!("{} symbols validated", report.loaded.len()),
        ))
    }
}
