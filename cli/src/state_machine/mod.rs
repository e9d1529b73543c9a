pub mod context;
pub mod states;
pub mod transitions;

pub use context::*;
pub use states::*;
pub use transitions::*;

use crate::{
    models::{Session, StateTransitionLog},
    utils::{log_state_transition, Logger},
};

const MAX_TRANSITION_HISTORY: usize = 100;

/// Drives the interactive session: one state at a time, one input at a time.
pub struct SessionController {
    current_state: Box<dyn State + Send + Sync>,
    context: StateContext,
    transition_history: Vec<StateTransitionLog>,
    tick_count: u64,
    started: bool,
    logger: Logger,
}

impl SessionController {
    pub fn new(context: StateContext) -> Self {
        Self {
            current_state: StateTransitions::create_state_by_name(StateName::MainMenu),
            context,
            transition_history: Vec::new(),
            tick_count: 0,
            started: false,
            logger: Logger::new("CONTROLLER"),
        }
    }

    /// Run until the session reaches `Exiting`.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.logger.info(&format!("Session {} started", self.context.session.id));

        while self.step().await? {}

        let stats = self.get_stats();
        self.logger.info(&format!(
            "Session ended after {} ticks and {} transitions",
            stats.tick_count, stats.transition_count
        ));
        Ok(())
    }

    /// Execute a single tick. Returns `false` once the session has exited.
    pub async fn step(&mut self) -> anyhow::Result<bool> {
        if !self.started {
            self.started = true;
            self.current_state.enter(&mut self.context).await?;
        }
        if self.current_state.name().is_terminal() {
            return Ok(false);
        }

        self.tick_count += 1;
        self.logger.debug(&format!(
            "Tick #{} in {}",
            self.tick_count,
            self.current_state.name()
        ));

        if let Some(transition) = self.current_state.tick(&mut self.context).await? {
            self.transition_to(transition).await?;
        }

        Ok(!self.current_state.name().is_terminal())
    }

    async fn transition_to(&mut self, transition: Transition) -> anyhow::Result<()> {
        let from = self.current_state.name();
        let to = transition.next.name();

        if !StateTransitions::is_valid_transition(from, to) {
            let allowed: Vec<&str> = StateTransitions::get_valid_next_states(from)
                .iter()
                .map(StateName::as_str)
                .collect();
            anyhow::bail!(
                "invalid state transition {} → {} (allowed: {})",
                from,
                to,
                allowed.join(", ")
            );
        }

        log_state_transition(from.as_str(), to.as_str(), &transition.reason);

        self.transition_history.push(StateTransitionLog::new(
            from.to_string(),
            to.to_string(),
            transition.reason,
        ));
        // Keep history manageable (last 100 transitions)
        if self.transition_history.len() > MAX_TRANSITION_HISTORY {
            self.transition_history.remove(0);
        }

        self.current_state.exit(&mut self.context).await?;
        self.current_state = transition.next;
        self.current_state.enter(&mut self.context).await?;

        Ok(())
    }

    pub fn current_state_name(&self) -> StateName {
        self.current_state.name()
    }

    pub fn transition_history(&self) -> &[StateTransitionLog] {
        &self.transition_history
    }

    pub fn session(&self) -> &Session {
        &self.context.session
    }

    pub fn context(&self) -> &StateContext {
        &self.context
    }

    pub fn get_stats(&self) -> ControllerStats {
        ControllerStats {
            current_state: self.current_state.name(),
            tick_count: self.tick_count,
            transition_count: self.transition_history.len(),
            symbol_count: self.context.session.symbols.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerStats {
    pub current_state: StateName,
    pub tick_count: u64,
    pub transition_count: usize,
    pub symbol_count: usize,
}
