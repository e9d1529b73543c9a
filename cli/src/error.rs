use chrono::NaiveDate;
use thiserror::Error;

/// Bad user input. Always recovered by re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no symbols entered")]
    EmptySymbolList,

    #[error("invalid symbol '{token}': {reason}")]
    InvalidSymbol { token: String, reason: String },

    #[error("invalid {field} date '{input}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, input: String },

    #[error("start date must precede end date (start {start}, end {end})")]
    StartNotBeforeEnd { start: NaiveDate, end: NaiveDate },

    #[error("invalid selection '{input}'")]
    InvalidMenuSelection { input: String },

    #[error("invalid value '{input}' for {name}")]
    InvalidSetting { name: &'static str, input: String },

    #[error("invalid weights: {reason}")]
    InvalidWeights { reason: String },
}

/// Failure reported by a data or analytics collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("rate limited by {provider}, try again later")]
    RateLimited { provider: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("{capability} is not available in this build")]
    Unsupported { capability: String },

    #[error("no data loaded for {symbol}")]
    MissingData { symbol: String },
}

impl CollaboratorError {
    pub fn not_found(symbol: impl Into<String>) -> Self {
        Self::NotFound {
            symbol: symbol.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(error: reqwest::Error) -> Self {
        if error.status().map(|s| s.as_u16()) == Some(429) {
            return Self::RateLimited {
                provider: error
                    .url()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| "provider".to_string()),
            };
        }
        Self::network(error.to_string())
    }
}

/// Failure while writing an export. Never changes session state.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    #[error("failed to serialize result: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ExportError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Startup configuration failure. Fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("unknown data provider '{0}'")]
    UnknownProvider(String),

    #[error("data provider '{provider}' requires {variable} to be set")]
    MissingApiKey {
        provider: &'static str,
        variable: &'static str,
    },

    #[error("data provider '{0}' is recognized but has no adapter")]
    UnsupportedProvider(&'static str),
}
