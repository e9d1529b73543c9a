use super::StateContext;
use crate::utils::Logger;
use serde::{Deserialize, Serialize};

/// Result of a tick that leaves the current state.
pub struct Transition {
    pub next: Box<dyn State + Send + Sync>,
    pub reason: String,
}

/// State trait that all controller states implement.
#[async_trait::async_trait]
pub trait State {
    fn name(&self) -> StateName;

    /// Called when entering this state
    async fn enter(&mut self, _context: &mut StateContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when exiting this state
    async fn exit(&mut self, _context: &mut StateContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Process one round of user input.
    /// Returns Some(transition) to move on, or None to stay and re-prompt.
    /// Errors are fatal to the session (console or terminal failure).
    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>>;
}

/// Common helpers for concrete states
pub struct BaseStateImpl {
    pub name: StateName,
    pub logger: Logger,
}

impl BaseStateImpl {
    pub fn new(name: StateName) -> Self {
        Self {
            name,
            logger: Logger::new(name.as_str()),
        }
    }

    pub fn stay_in_state(&self, reason: &str) -> Option<Transition> {
        self.logger.debug(&format!("Staying in state: {}", reason));
        None
    }

    pub fn transition_to(
        &self,
        next: Box<dyn State + Send + Sync>,
        reason: &str,
    ) -> Option<Transition> {
        Some(Transition {
            next,
            reason: format!("{}: {}", self.name, reason),
        })
    }
}

/// State names enum for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateName {
    MainMenu,
    SymbolEntry,
    DateRangeEntry,
    AnalysisSelect,
    RunningAnalysis,
    DisplayResults,
    SettingsMenu,
    Exiting,
}

impl StateName {
    pub const ALL: [StateName; 8] = [
        StateName::MainMenu,
        StateName::SymbolEntry,
        StateName::DateRangeEntry,
        StateName::AnalysisSelect,
        StateName::RunningAnalysis,
        StateName::DisplayResults,
        StateName::SettingsMenu,
        StateName::Exiting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateName::MainMenu => "MAIN_MENU",
            StateName::SymbolEntry => "SYMBOL_ENTRY",
            StateName::DateRangeEntry => "DATE_RANGE_ENTRY",
            StateName::AnalysisSelect => "ANALYSIS_SELECT",
            StateName::RunningAnalysis => "RUNNING_ANALYSIS",
            StateName::DisplayResults => "DISPLAY_RESULTS",
            StateName::SettingsMenu => "SETTINGS_MENU",
            StateName::Exiting => "EXITING",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == StateName::Exiting
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
