use crate::{
    error::ValidationError,
    models::{parse_toggle, AnalysisDepth, OutputFormat, RefreshInterval, Settings},
    services::{Renderable, SessionStore, TableView},
    state_machine::{BaseStateImpl, State, StateContext, StateName, StateTransitions, Transition},
    utils::parse_menu_choice,
};
use std::path::PathBuf;

/// SettingsMenuState - edits session settings one entry at a time
pub struct SettingsMenuState {
    base: BaseStateImpl,
}

impl Default for SettingsMenuState {
    fn default() -> Self {
        Self::new()
    }
}

const SETTING_COUNT: u8 = 6;

/// Apply `value` to setting number `index` (1-based, as rendered).
fn update_setting(
    current: &Settings,
    index: u8,
    value: &str,
) -> Result<Settings, ValidationError> {
    let mut next = current.clone();
    match index {
        1 => next.output_format = OutputFormat::parse(value)?,
        2 => next.refresh = RefreshInterval::parse(value)?,
        3 => next.color = parse_toggle("color output", value)?,
        4 => next.emoji = parse_toggle("emoji", value)?,
        5 => next.analysis_depth = AnalysisDepth::parse(value)?,
        6 => {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidSetting {
                    name: "export directory",
                    input: String::new(),
                });
            }
            next.export_dir = PathBuf::from(value.trim());
        }
        _ => {
            return Err(ValidationError::InvalidMenuSelection {
                input: index.to_string(),
            })
        }
    }
    Ok(next)
}

fn value_hint(index: u8) -> &'static str {
    match index {
        1 => "json, csv, html, pdf",
        2 => "seconds, or off",
        3 | 4 => "on/off",
        5 => "basic, standard, comprehensive",
        _ => "path",
    }
}

impl SettingsMenuState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::SettingsMenu),
        }
    }

    fn back(&self, reason: &str) -> Option<Transition> {
        self.base.transition_to(
            StateTransitions::create_state_by_name(StateName::MainMenu),
            reason,
        )
    }

    fn save(&self, context: &mut StateContext) -> anyhow::Result<()> {
        let path = context.settings_file.clone();
        match SessionStore::save_settings(&path, &context.session.settings) {
            Ok(()) => context.success(&format!("Settings saved to {}", path.display())),
            Err(e) => context.error(&e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl State for SettingsMenuState {
    fn name(&self) -> StateName {
        StateName::SettingsMenu
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        context.render(&Renderable::Table(TableView::settings(
            &context.session.settings,
        )))?;

        let Some(answer) = context
            .ask("Setting to change (1-6), 's' to save, 'back' to return: ")
            .await?
        else {
            return Ok(self.back("back"));
        };

        if answer.eq_ignore_ascii_case("s") {
            self.save(context)?;
            return Ok(self.base.stay_in_state("settings saved"));
        }

        let index = match parse_menu_choice(&answer, SETTING_COUNT) {
            Ok(0) => return Ok(self.back("done")),
            Ok(index) => index,
            Err(e) => {
                context.error(&e.to_string())?;
                return Ok(self.base.stay_in_state("invalid selection"));
            }
        };

        let prompt = format!("New value ({}): ", value_hint(index));
        let Some(value) = context.ask(&prompt).await? else {
            return Ok(self.base.stay_in_state("edit cancelled"));
        };

        match update_setting(&context.session.settings, index, &value) {
            Ok(settings) => {
                self.base
                    .logger
                    .info(&format!("setting {} changed to '{}'", index, value));
                context.apply_settings(settings);
                context.success("Setting updated")?;
            }
            Err(e) => context.error(&e.to_string())?,
        }
        Ok(self.base.stay_in_state("setting edited"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_each_setting() {
        let base = Settings::default();
        assert_eq!(
            update_setting(&base, 1, "csv").unwrap().output_format,
            OutputFormat::Csv
        );
        assert_eq!(
            update_setting(&base, 2, "off").unwrap().refresh,
            RefreshInterval::Disabled
        );
        assert!(!update_setting(&base, 3, "off").unwrap().color);
        assert!(!update_setting(&base, 4, "no").unwrap().emoji);
        assert_eq!(
            update_setting(&base, 5, "basic").unwrap().analysis_depth,
            AnalysisDepth::Basic
        );
        assert_eq!(
            update_setting(&base, 6, "/tmp/out").unwrap().export_dir,
            PathBuf::from("/tmp/out")
        );
    }

    #[test]
    fn invalid_value_leaves_settings_alone() {
        let base = Settings::default();
        assert!(update_setting(&base, 2, "-5").is_err());
        assert!(update_setting(&base, 3, "maybe").is_err());
        assert!(update_setting(&base, 6, "  ").is_err());
    }
}
