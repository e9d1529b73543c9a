use crate::{
    models::{AnalysisKind, AnalysisRequest, BacktestParams, IndicatorSet, Strategy, Symbol},
    services::default_indicators,
    state_machine::{BaseStateImpl, State, StateContext, StateName, StateTransitions, Transition},
    utils::parse_weights,
};

/// What a parameter prompt produced.
enum Collected {
    Request(AnalysisRequest),
    /// Input was invalid; the error has been reported.
    Retry,
    Back,
}

/// AnalysisSelectState - collects the parameters for the analysis chosen in
/// the main menu
pub struct AnalysisSelectState {
    base: BaseStateImpl,
}

impl Default for AnalysisSelectState {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSelectState {
    pub fn new() -> Self {
        Self {
            base: BaseStateImpl::new(StateName::AnalysisSelect),
        }
    }

    fn to_main_menu(&self, reason: &str) -> Option<Transition> {
        self.base.transition_to(
            StateTransitions::create_state_by_name(StateName::MainMenu),
            reason,
        )
    }

    async fn collect(
        &self,
        context: &mut StateContext,
        kind: AnalysisKind,
    ) -> anyhow::Result<Collected> {
        let symbols = context.session.symbols.to_vec();

        match kind {
            AnalysisKind::TechnicalDashboard => {
                let default = symbols.first().cloned();
                let symbol = match (symbols.len(), default) {
                    (1, Some(only)) => only,
                    (_, Some(first)) => {
                        let prompt = format!("Symbol to analyze [{}]: ", first);
                        let Some(answer) = context.ask(&prompt).await? else {
                            return Ok(Collected::Back);
                        };
                        match pick_symbol(&answer, &symbols, first) {
                            Ok(symbol) => symbol,
                            Err(message) => {
                                context.error(&message)?;
                                return Ok(Collected::Retry);
                            }
                        }
                    }
                    (_, None) => return Ok(Collected::Back),
                };
                Ok(Collected::Request(AnalysisRequest::TechnicalDashboard {
                    symbol,
                    indicators: default_indicators(context.session.settings.analysis_depth),
                }))
            }

            AnalysisKind::PortfolioOptimization => {
                let prompt = format!(
                    "Weights for {} (blank for equal): ",
                    context.session.symbols.joined(", ")
                );
                let Some(answer) = context.ask(&prompt).await? else {
                    return Ok(Collected::Back);
                };
                match parse_weights(&answer, symbols.len()) {
                    Ok(weights) => Ok(Collected::Request(AnalysisRequest::PortfolioOptimization {
                        symbols,
                        weights,
                    })),
                    Err(e) => {
                        context.error(&e.to_string())?;
                        Ok(Collected::Retry)
                    }
                }
            }

            AnalysisKind::Backtest => {
                let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.as_str()).collect();
                let prompt = format!(
                    "Strategy [{}] ({}): ",
                    Strategy::default(),
                    names.join(", ")
                );
                let Some(answer) = context.ask(&prompt).await? else {
                    return Ok(Collected::Back);
                };
                let strategy = if answer.is_empty() {
                    Strategy::default()
                } else {
                    match Strategy::parse(&answer) {
                        Ok(strategy) => strategy,
                        Err(e) => {
                            context.error(&e.to_string())?;
                            return Ok(Collected::Retry);
                        }
                    }
                };
                Ok(Collected::Request(AnalysisRequest::Backtest {
                    symbols,
                    strategy,
                    params: BacktestParams::default(),
                }))
            }

            AnalysisKind::RealTimeMonitor => {
                if context.session.settings.refresh.as_duration().is_none() {
                    context.warn("Real-time refresh is disabled; enable it in Settings (8)")?;
                    return Ok(Collected::Back);
                }
                Ok(Collected::Request(AnalysisRequest::RealTimeMonitor { symbols }))
            }

            AnalysisKind::CustomBuilder => {
                let Some(answer) = context
                    .ask("Indicators (comma separated, blank for defaults): ")
                    .await?
                else {
                    return Ok(Collected::Back);
                };
                let indicators = if answer.is_empty() {
                    default_indicators(context.session.settings.analysis_depth)
                } else {
                    IndicatorSet::parse(&answer)
                };
                Ok(Collected::Request(AnalysisRequest::CustomBuilder {
                    symbols,
                    indicators,
                }))
            }
        }
    }
}

fn pick_symbol(answer: &str, loaded: &[Symbol], default: Symbol) -> Result<Symbol, String> {
    if answer.is_empty() {
        return Ok(default);
    }
    let symbol = Symbol::parse(answer).map_err(|e| e.to_string())?;
    if loaded.contains(&symbol) {
        Ok(symbol)
    } else {
        Err(format!("{} is not loaded; load it with option 1 first", symbol))
    }
}

#[async_trait::async_trait]
impl State for AnalysisSelectState {
    fn name(&self) -> StateName {
        StateName::AnalysisSelect
    }

    async fn enter(&mut self, context: &mut StateContext) -> anyhow::Result<()> {
        if let Some(kind) = context.pending_kind {
            context.info(kind.title())?;
        }
        Ok(())
    }

    async fn tick(&mut self, context: &mut StateContext) -> anyhow::Result<Option<Transition>> {
        let Some(kind) = context.pending_kind else {
            return Ok(self.to_main_menu("no analysis selected"));
        };

        if !context.session.has_symbols() {
            context.warn("No symbols loaded. Use option 1 to load market data first")?;
            return Ok(self.to_main_menu("no symbols loaded"));
        }

        match self.collect(context, kind).await? {
            Collected::Request(request) => {
                context.pending_kind = None;
                context.pending_request = Some(request);
                Ok(self.base.transition_to(
                    StateTransitions::create_state_by_name(StateName::RunningAnalysis),
                    &format!("running {}", kind),
                ))
            }
            Collected::Retry => Ok(self.base.stay_in_state("invalid parameters")),
            Collected::Back => Ok(self.to_main_menu("back")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_symbol_defaults_and_checks_membership() {
        let loaded = vec![Symbol::parse("AAPL").unwrap(), Symbol::parse("MSFT").unwrap()];
        let first = loaded[0].clone();
        assert_eq!(pick_symbol("", &loaded, first.clone()).unwrap(), first);
        assert_eq!(pick_symbol("msft", &loaded, first.clone()).unwrap(), loaded[1]);
        assert!(pick_symbol("TSLA", &loaded, first).is_err());
    }
}
