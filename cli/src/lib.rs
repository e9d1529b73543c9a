//! # MarketLens - Interactive Stock Analysis Sessions
//!
//! A Rust library that drives an interactive, menu-based market analysis
//! session:
//! - Symbol and date range validation with re-prompting
//! - Pluggable market data providers (Yahoo Finance, Alpha Vantage) with a
//!   file cache
//! - Pluggable analytics and presentation collaborators
//! - Real-time quote monitoring that stops on Ctrl+C
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketlens::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let collaborators = Collaborators {
//!         provider: build_provider(&config)?,
//!         analytics: std::sync::Arc::new(SummaryAnalytics::new()),
//!         presenter: Box::new(ConsolePresenter::stdout(&config.settings)),
//!         console: Box::new(StdinConsole::new()),
//!     };
//!     let mut controller = SessionController::new(StateContext::new(&config, collaborators));
//!     controller.run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state_machine;
pub mod utils;

mod states;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use marketlens::prelude::*;
    //! ```

    pub use crate::config::AppConfig;
    pub use crate::error::{CollaboratorError, ExportError, ValidationError};
    pub use crate::models::{
        AnalysisKind, AnalysisRequest, AnalysisResult, DateRange, Dataset, Quote, Settings,
        Symbol,
    };
    pub use crate::services::{
        build_provider, AnalysisEngine, ConsolePresenter, InterruptSignal, MarketDataProvider,
        Presenter, StdinConsole, SummaryAnalytics,
    };
    pub use crate::state_machine::{Collaborators, SessionController, StateContext, StateName};
}

// Re-export some commonly used utilities
pub use utils::{init_logger, Logger, Timer};
