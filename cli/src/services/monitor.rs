use super::MarketDataProvider;
use crate::{
    error::CollaboratorError,
    models::{MonitorSummary, Quote, Symbol},
    utils::Logger,
};
use futures::future::join_all;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// User interrupt (Ctrl+C) shared between the binary's signal listener and
/// the monitor.
///
/// Outside a monitor run the binary treats an interrupt as a request to quit.
#[derive(Clone, Debug)]
pub struct InterruptSignal {
    tx: Arc<watch::Sender<u64>>,
    monitoring: Arc<AtomicBool>,
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            tx: Arc::new(tx),
            monitoring: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_modify(|count| *count += 1);
    }

    /// Receiver that only sees interrupts raised after this call.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    fn set_monitoring(&self, active: bool) {
        self.monitoring.store(active, Ordering::SeqCst);
    }
}

/// Result of one polling round.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub poll: u32,
    pub quotes: Vec<Quote>,
    pub errors: Vec<(Symbol, CollaboratorError)>,
}

/// Cooperative polling loop over `fetch_quote`.
///
/// Runs until the stop signal fires or `max_polls` rounds have completed.
pub struct RealTimeMonitor {
    provider: Arc<dyn MarketDataProvider>,
    every: Duration,
    max_polls: Option<u32>,
    logger: Logger,
}

impl RealTimeMonitor {
    pub fn new(provider: Arc<dyn MarketDataProvider>, every: Duration) -> Self {
        Self {
            provider,
            every,
            max_polls: None,
            logger: Logger::new("MONITOR"),
        }
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    async fn poll_once(&self, poll: u32, symbols: &[Symbol]) -> PollReport {
        let results = join_all(symbols.iter().map(|s| self.provider.fetch_quote(s))).await;

        let mut report = PollReport {
            poll,
            quotes: Vec::with_capacity(symbols.len()),
            errors: Vec::new(),
        };
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(quote) => report.quotes.push(quote),
                Err(e) => {
                    self.logger.warn(&format!("quote for {} failed: {}", symbol, e));
                    report.errors.push((symbol.clone(), e));
                }
            }
        }
        report
    }

    /// Poll until stopped. `on_poll` sees every round; an error from it ends
    /// the run and is returned.
    pub async fn run<F>(
        &self,
        symbols: &[Symbol],
        interrupts: &InterruptSignal,
        mut on_poll: F,
    ) -> anyhow::Result<MonitorSummary>
    where
        F: FnMut(&PollReport) -> anyhow::Result<()>,
    {
        let mut stop = interrupts.subscribe();
        interrupts.set_monitoring(true);
        let outcome = self.poll_loop(symbols, &mut stop, &mut on_poll).await;
        interrupts.set_monitoring(false);
        outcome
    }

    async fn poll_loop<F>(
        &self,
        symbols: &[Symbol],
        stop: &mut watch::Receiver<u64>,
        on_poll: &mut F,
    ) -> anyhow::Result<MonitorSummary>
    where
        F: FnMut(&PollReport) -> anyhow::Result<()>,
    {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = MonitorSummary {
            polls: 0,
            quotes: Vec::new(),
            errors: Vec::new(),
        };
        let mut stop_open = true;

        self.logger.info(&format!(
            "monitoring {} symbols every {:?}",
            symbols.len(),
            self.every
        ));

        loop {
            if self.max_polls.is_some_and(|max| summary.polls >= max) {
                break;
            }

            tokio::select! {
                biased;
                changed = stop.changed(), if stop_open => {
                    match changed {
                        Ok(()) => {
                            self.logger.info("stop requested");
                            break;
                        }
                        Err(_) => stop_open = false,
                    }
                }
                _ = ticker.tick() => {
                    summary.polls += 1;
                    let report = self.poll_once(summary.polls, symbols).await;
                    on_poll(&report)?;

                    for quote in report.quotes {
                        match summary.quotes.iter_mut().find(|q| q.symbol == quote.symbol) {
                            Some(existing) => *existing = quote,
                            None => summary.quotes.push(quote),
                        }
                    }
                    summary.errors = report
                        .errors
                        .iter()
                        .map(|(symbol, e)| format!("{}: {}", symbol, e))
                        .collect();
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, DateRange};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicU32;

    struct TickingQuotes {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MarketDataProvider for TickingQuotes {
        fn name(&self) -> &str {
            "ticking"
        }

        async fn fetch_history(
            &self,
            symbol: &Symbol,
            _range: DateRange,
        ) -> Result<Dataset, CollaboratorError> {
            Err(CollaboratorError::not_found(symbol.as_str()))
        }

        async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, CollaboratorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol.as_str() == "ZZZZ" {
                return Err(CollaboratorError::not_found("ZZZZ"));
            }
            Ok(Quote {
                symbol: symbol.clone(),
                price: 100.0 + n as f64,
                previous_close: Some(100.0),
                volume: None,
                currency: None,
                as_of: Utc::now(),
            })
        }
    }

    fn provider() -> Arc<dyn MarketDataProvider> {
        Arc::new(TickingQuotes {
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn stops_after_max_polls() {
        let monitor = RealTimeMonitor::new(provider(), Duration::from_millis(5)).with_max_polls(Some(3));
        let symbols = vec![Symbol::parse("AAPL").unwrap(), Symbol::parse("ZZZZ").unwrap()];
        let mut seen = Vec::new();

        let summary = monitor
            .run(&symbols, &InterruptSignal::new(), |report| {
                seen.push(report.poll);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(summary.polls, 3);
        assert_eq!(summary.quotes.len(), 1);
        assert_eq!(summary.errors.len(), 1);
    }

    #[tokio::test]
    async fn interrupt_stops_the_loop() {
        let monitor = RealTimeMonitor::new(provider(), Duration::from_millis(5));
        let interrupts = InterruptSignal::new();
        let symbols = vec![Symbol::parse("AAPL").unwrap()];
        let trigger = interrupts.clone();

        let summary = monitor
            .run(&symbols, &interrupts, |report| {
                assert!(trigger.is_monitoring());
                if report.poll == 2 {
                    trigger.trigger();
                }
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(summary.polls, 2);
        assert!(!interrupts.is_monitoring());
    }

    #[tokio::test]
    async fn callback_error_ends_run() {
        let monitor = RealTimeMonitor::new(provider(), Duration::from_millis(5));
        let symbols = vec![Symbol::parse("AAPL").unwrap()];
        let result = monitor
            .run(&symbols, &InterruptSignal::new(), |_| anyhow::bail!("stdout closed"))
            .await;
        assert!(result.is_err());
    }
}
