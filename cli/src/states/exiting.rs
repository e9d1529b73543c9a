use crate::state_machine::{BaseStateImpl, State, StateContext, StateName, Transition};

/// ExitingState - terminal; says goodbye and never transitions
pub struct ExitingState {
    base: BaseStateImpl,
}

impl Default for ExitingState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitingState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::Exiting),
        }
    }
}

#[async_trait::async_trait]
impl State for ExitingState {
    fn name(&self) -> StateName {
        StateName::Exiting
    }

    async fn enter(&mut self, context: &mut StateContext) -> anyhow::Result<()> {
        self.base.logger.info(&format!(
            "Session {} ending with {} symbols",
            context.session.id,
            context.session.symbols.len()
        ));
        context.success("Thank you for using MarketLens. Goodbye!")
    }

    async fn tick(&mut self, _context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        Ok(self.base.stay_in_state("session finished"))
    }
}
