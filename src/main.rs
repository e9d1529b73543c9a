pub mod runner;

use crate::runner::{BatchError, BatchOptions, BatchReport, BatchRunner, RawOptions};
use clap::Parser;
use marketlens::{
    config::AppConfig,
    models::Settings,
    services::{
        build_provider, ConsolePresenter, MessageKind, Presenter, Renderable, SummaryAnalytics,
        TableView,
    },
    utils::{init_logger, today},
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};

#[derive(Parser, Debug)]
#[command(name = "marketlens-batch")]
#[command(about = "One-shot, non-interactive stock market analysis")]
struct Args {
    /// Symbols to analyze (comma or space separated)
    #[arg(long, num_args = 1.., required = true)]
    symbols: Vec<String>,

    /// Start date (YYYY-MM-DD), default one year before the end date
    #[arg(long)]
    start_date: Option<String>,

    /// End date (YYYY-MM-DD), default today
    #[arg(long)]
    end_date: Option<String>,

    /// Benchmark symbol loaded alongside the analysis; "none" to skip
    #[arg(long, default_value = "SPY")]
    benchmark: String,

    /// Take a quote snapshot of every loaded symbol
    #[arg(long)]
    real_time: bool,

    /// Run a strategy backtest
    #[arg(long)]
    backtest: bool,

    /// Backtest strategy (moving_average, rsi, macd, bollinger_bands)
    #[arg(long)]
    strategy: Option<String>,

    /// Export format (json, csv, html)
    #[arg(long)]
    output: Option<String>,

    /// Export directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<Args> for RawOptions {
    fn from(args: Args) -> Self {
        RawOptions {
            symbols: args.symbols,
            start_date: args.start_date,
            end_date: args.end_date,
            benchmark: Some(args.benchmark),
            real_time: args.real_time,
            backtest: args.backtest,
            strategy: args.strategy,
            output: args.output,
            output_dir: args.output_dir,
        }
    }
}

fn print_report(presenter: &mut ConsolePresenter, report: &BatchReport) -> std::io::Result<()> {
    for (_, error) in &report.failed {
        presenter.message(MessageKind::Error, &error.to_string())?;
    }
    for warning in &report.warnings {
        presenter.message(MessageKind::Warning, warning)?;
    }
    for result in &report.results {
        presenter.render(&Renderable::Table(TableView::from_result(result)))?;
    }
    for path in &report.exported {
        presenter.message(MessageKind::Success, &format!("Exported {}", path.display()))?;
    }
    Ok(())
}

async fn run(options: &BatchOptions, config: &AppConfig, settings: &Settings) -> Result<(), BatchError> {
    let provider = build_provider(config)?;
    let runner = BatchRunner::new(provider, Arc::new(SummaryAnalytics::new()));

    let mut report = runner.run(options).await?;
    runner.export(&mut report, options)?;

    let mut presenter = ConsolePresenter::stdout(settings);
    if let Err(e) = print_report(&mut presenter, &report) {
        tracing::warn!(error = %e, "failed to print report");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    let level = if args.verbose { "debug" } else { "info" };
    if let Err(e) = init_logger(level) {
        eprintln!("failed to initialize logging: {}", e);
    }

    let settings = config.settings.clone();
    let options = match BatchOptions::from_raw(args.into(), &settings, today()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("invalid input: {}", e);
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        symbols = options.symbols.len(),
        range = %options.range,
        format = %options.format,
        "starting batch analysis"
    );

    match run(&options, &config, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "batch analysis failed");
            eprintln!("analysis failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
