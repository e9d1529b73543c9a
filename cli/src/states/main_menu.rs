use crate::{
    services::{Renderable, TableView},
    state_machine::{
        BaseStateImpl, MainMenuChoice, State, StateContext, StateName, StateTransitions,
        Transition,
    },
};

const HELP_LINES: [&str; 6] = [
    "1 loads symbols (comma or space separated) and asks for a date range.",
    "2-6 run an analysis over the loaded symbols.",
    "Date ranges accept YYYY-MM-DD pairs or presets: 1M, 3M, 6M, 1Y, 2Y, 5Y.",
    "Type 'back' at any prompt to return here.",
    "Exports go to the export directory as analysis_<timestamp>.<format>.",
    "Press Ctrl+C to stop the real-time monitor.",
];

/// MainMenuState - numbered actions, one selection per tick
pub struct MainMenuState {
    base: BaseStateImpl,
}

impl Default for MainMenuState {
    fn default() -> Self {
        Self::new()
    }
}

impl MainMenuState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::MainMenu),
        }
    }

    fn menu_table(context: &StateContext) -> TableView {
        let session = &context.session;
        let title = if session.has_symbols() {
            format!(
                "Main Menu ({} | {})",
                session.symbols.joined(", "),
                session.date_range
            )
        } else {
            "Main Menu".to_string()
        };

        let mut table = TableView::new(title, ["#", "Action"]);
        for (number, label) in MainMenuChoice::ENTRIES {
            table.push_row([number.to_string(), label.to_string()]);
        }
        table
    }

    async fn save_or_load(&self, context: &mut StateContext) -> anyhow::Result<()> {
        let Some(answer) = context.ask("[s]ave or [l]oad session: ").await? else {
            return Ok(());
        };

        match answer.to_ascii_lowercase().as_str() {
            "s" | "save" => {
                let snapshot = context.session.snapshot();
                match context.store.save_snapshot(&snapshot) {
                    Ok(path) => context.success(&format!("Session saved to {}", path.display()))?,
                    Err(e) => context.error(&e.to_string())?,
                }
            }
            "l" | "load" => self.load_session(context).await?,
            _ => context.error(&format!("invalid selection '{}'", answer))?,
        }
        Ok(())
    }

    async fn load_session(&self, context: &mut StateContext) -> anyhow::Result<()> {
        let saved = match context.store.list_snapshots() {
            Ok(saved) => saved,
            Err(e) => return context.error(&e.to_string()),
        };
        if saved.is_empty() {
            return context.warn(&format!(
                "No saved sessions in {}",
                context.store.dir().display()
            ));
        }

        let mut table = TableView::new("Saved Sessions", ["#", "File"]);
        for (i, path) in saved.iter().enumerate() {
            table.push_row([(i + 1).to_string(), path.display().to_string()]);
        }
        context.render(&Renderable::Table(table))?;

        let Some(answer) = context.ask("Session number [1]: ").await? else {
            return Ok(());
        };
        let index = if answer.is_empty() {
            0
        } else {
            match answer.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                Some(i) if i < saved.len() => i,
                _ => return context.error(&format!("invalid selection '{}'", answer)),
            }
        };

        let snapshot = match context.store.load_snapshot(&saved[index]) {
            Ok(snapshot) => snapshot,
            Err(e) => return context.error(&e.to_string()),
        };
        let settings = snapshot.settings.clone();
        context.session.restore(snapshot);
        context.apply_settings(settings);

        let report = context.reload_datasets().await;
        context.report_failures(&report)?;
        context.success(&format!(
            "Session restored: {} symbols over {}",
            context.session.symbols.len(),
            context.session.date_range
        ))
    }
}

#[async_trait::async_trait]
impl State for MainMenuState {
    fn name(&self) -> StateName {
        StateName::MainMenu
    }

    async fn enter(&mut self, context: &mut StateContext) -> anyhow::Result<()> {
        context.pending_kind = None;
        context.pending_request = None;
        Ok(())
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        context.render(&Renderable::Table(Self::menu_table(context)))?;

        let Some(input) = context.read_line("Select an option (0-9): ").await? else {
            return Ok(self.base.transition_to(
                StateTransitions::create_state_by_name(StateName::Exiting),
                "end of input",
            ));
        };

        let choice = match MainMenuChoice::parse(&input) {
            Ok(choice) => choice,
            Err(e) => {
                context.error(&e.to_string())?;
                return Ok(self.base.stay_in_state("invalid selection"));
            }
        };

        match choice {
            MainMenuChoice::SaveLoad => {
                self.save_or_load(context).await?;
                Ok(self.base.stay_in_state("save/load finished"))
            }
            MainMenuChoice::Help => {
                for line in HELP_LINES {
                    context.info(line)?;
                }
                Ok(self.base.stay_in_state("help shown"))
            }
            MainMenuChoice::Analysis(kind) => {
                context.pending_kind = Some(kind);
                Ok(self.base.transition_to(
                    StateTransitions::create_state_by_name(choice.target()),
                    &format!("selected {}", kind),
                ))
            }
            MainMenuChoice::LoadAndAnalyze | MainMenuChoice::Settings | MainMenuChoice::Exit => {
                Ok(self.base.transition_to(
                    StateTransitions::create_state_by_name(choice.target()),
                    &format!("selected option {}", input),
                ))
            }
        }
    }
}
