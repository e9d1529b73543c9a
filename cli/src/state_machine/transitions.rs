use super::{State, StateName};
use crate::{error::ValidationError, models::AnalysisKind, states::*, utils::parse_menu_choice};

/// Numbered actions of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenuChoice {
    LoadAndAnalyze,
    Analysis(AnalysisKind),
    SaveLoad,
    Settings,
    Help,
    Exit,
}

impl MainMenuChoice {
    pub const MAX: u8 = 9;

    pub const ENTRIES: [(u8, &'static str); 10] = [
        (1, "Load & Analyze Market Data"),
        (2, "Technical Analysis Dashboard"),
        (3, "Portfolio Analysis & Optimization"),
        (4, "Backtesting Engine"),
        (5, "Real-time Data Monitor"),
        (6, "Custom Analysis Builder"),
        (7, "Save/Load Session"),
        (8, "Settings"),
        (9, "Help"),
        (0, "Exit"),
    ];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let choice = parse_menu_choice(input, Self::MAX)?;
        Ok(match choice {
            1 => MainMenuChoice::LoadAndAnalyze,
            2 => MainMenuChoice::Analysis(AnalysisKind::TechnicalDashboard),
            3 => MainMenuChoice::Analysis(AnalysisKind::PortfolioOptimization),
            4 => MainMenuChoice::Analysis(AnalysisKind::Backtest),
            5 => MainMenuChoice::Analysis(AnalysisKind::RealTimeMonitor),
            6 => MainMenuChoice::Analysis(AnalysisKind::CustomBuilder),
            7 => MainMenuChoice::SaveLoad,
            8 => MainMenuChoice::Settings,
            9 => MainMenuChoice::Help,
            _ => MainMenuChoice::Exit,
        })
    }

    /// State the choice leads to. Save/load and help stay in the main menu.
    pub fn target(&self) -> StateName {
        match self {
            MainMenuChoice::LoadAndAnalyze => StateName::SymbolEntry,
            MainMenuChoice::Analysis(_) => StateName::AnalysisSelect,
            MainMenuChoice::SaveLoad | MainMenuChoice::Help => StateName::MainMenu,
            MainMenuChoice::Settings => StateName::SettingsMenu,
            MainMenuChoice::Exit => StateName::Exiting,
        }
    }
}

/// State transition table and factory
pub struct StateTransitions;

impl StateTransitions {
    /// Create state instance by name
    pub fn create_state_by_name(name: StateName) -> Box<dyn State + Send + Sync> {
        match name {
            StateName::MainMenu => Box::new(MainMenuState::new()),
            StateName::SymbolEntry => Box::new(SymbolEntryState::new()),
            StateName::DateRangeEntry => Box::new(DateRangeEntryState::new()),
            StateName::AnalysisSelect => Box::new(AnalysisSelectState::new()),
            StateName::RunningAnalysis => Box::new(RunningAnalysisState::new()),
            StateName::DisplayResults => Box::new(DisplayResultsState::new()),
            StateName::SettingsMenu => Box::new(SettingsMenuState::new()),
            StateName::Exiting => Box::new(ExitingState::new()),
        }
    }

    /// Validate state transition
    pub fn is_valid_transition(from: StateName, to: StateName) -> bool {
        use StateName::*;

        match (from, to) {
            // From MAIN_MENU
            (MainMenu, SymbolEntry) => true,
            (MainMenu, AnalysisSelect) => true,
            (MainMenu, SettingsMenu) => true,
            (MainMenu, Exiting) => true,

            // From SYMBOL_ENTRY
            (SymbolEntry, DateRangeEntry) => true,
            (SymbolEntry, MainMenu) => true, // back

            // From DATE_RANGE_ENTRY
            (DateRangeEntry, MainMenu) => true,

            // From ANALYSIS_SELECT
            (AnalysisSelect, RunningAnalysis) => true,
            (AnalysisSelect, MainMenu) => true, // back or nothing loaded

            // From RUNNING_ANALYSIS
            (RunningAnalysis, DisplayResults) => true,
            (RunningAnalysis, MainMenu) => true, // collaborator failure

            (DisplayResults, MainMenu) => true,
            (SettingsMenu, MainMenu) => true,

            // Invalid transitions, including anything out of EXITING
            _ => false,
        }
    }

    pub fn get_valid_next_states(current: StateName) -> Vec<StateName> {
        StateName::ALL
            .into_iter()
            .filter(|to| Self::is_valid_transition(current, *to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exiting_is_only_reachable_from_main_menu() {
        for from in StateName::ALL {
            assert_eq!(
                StateTransitions::is_valid_transition(from, StateName::Exiting),
                from == StateName::MainMenu,
                "{} -> EXITING",
                from
            );
        }
        assert!(StateTransitions::get_valid_next_states(StateName::Exiting).is_empty());
    }

    #[test]
    fn every_non_terminal_state_can_reach_main_menu() {
        for from in StateName::ALL {
            if from.is_terminal() || from == StateName::MainMenu {
                continue;
            }
            assert!(StateTransitions::is_valid_transition(from, StateName::MainMenu));
        }
    }

    #[test]
    fn factory_builds_named_states() {
        for name in StateName::ALL {
            assert_eq!(StateTransitions::create_state_by_name(name).name(), name);
        }
    }

    #[test]
    fn main_menu_mapping() {
        assert_eq!(MainMenuChoice::parse("0").unwrap(), MainMenuChoice::Exit);
        assert_eq!(MainMenuChoice::parse("1").unwrap().target(), StateName::SymbolEntry);
        assert_eq!(
            MainMenuChoice::parse("4").unwrap(),
            MainMenuChoice::Analysis(AnalysisKind::Backtest)
        );
        assert_eq!(MainMenuChoice::parse("7").unwrap().target(), StateName::MainMenu);
        assert_eq!(MainMenuChoice::parse("8").unwrap().target(), StateName::SettingsMenu);
        assert!(MainMenuChoice::parse("12").is_err());
        assert!(MainMenuChoice::parse("exit").is_err());
    }
}
