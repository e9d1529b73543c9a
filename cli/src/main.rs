use marketlens::{
    prelude::*,
    utils::{init_logger, Logger},
};

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "marketlens")]
#[command(about = "Interactive stock market analysis session")]
pub struct Cli {
    /// Override the log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Stop the real-time monitor after this many polls
    #[arg(long)]
    max_polls: Option<u32>,
}

/// Route Ctrl+C to the monitor while it runs; otherwise end the process.
fn spawn_interrupt_listener(interrupts: InterruptSignal) {
    tokio::spawn(async move {
        let logger = Logger::new("SIGNAL");
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                logger.warn("Ctrl+C handler unavailable");
                return;
            }
            if interrupts.is_monitoring() {
                logger.info("Interrupt received, stopping monitor");
                interrupts.trigger();
            } else {
                println!();
                std::process::exit(130);
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logger(level)?;

    if !config.interactive {
        eprintln!("INTERACTIVE_MODE is disabled; use marketlens-batch for non-interactive runs");
        return Ok(ExitCode::from(2));
    }

    let collaborators = Collaborators {
        provider: build_provider(&config)?,
        analytics: Arc::new(SummaryAnalytics::new()),
        presenter: Box::new(ConsolePresenter::stdout(&config.settings)),
        console: Box::new(StdinConsole::new()),
    };

    let interrupts = InterruptSignal::new();
    spawn_interrupt_listener(interrupts.clone());

    let context = StateContext::new(&config, collaborators)
        .with_interrupts(interrupts)
        .with_monitor_max_polls(cli.max_polls);

    let mut controller = SessionController::new(context);
    controller.run().await?;

    Ok(ExitCode::SUCCESS)
}
