use super::{AnalysisResult, Dataset, DateRange, Settings, Symbol, SymbolSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory state of one interactive run.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub symbols: SymbolSet,
    pub date_range: DateRange,
    pub datasets: HashMap<Symbol, Arc<Dataset>>,
    pub settings: Settings,
    pub last_result: Option<AnalysisResult>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            symbols: SymbolSet::new(),
            date_range: DateRange::default_lookback(),
            datasets: HashMap::new(),
            settings,
            last_result: None,
        }
    }

    pub fn has_symbols(&self) -> bool {
        !self.symbols.is_empty()
    }

    pub fn dataset(&self, symbol: &Symbol) -> Option<Arc<Dataset>> {
        self.datasets.get(symbol).cloned()
    }

    /// Datasets for the session symbols, in symbol order. Symbols without a
    /// loaded dataset are skipped.
    pub fn loaded_datasets(&self) -> Vec<Arc<Dataset>> {
        self.symbols
            .iter()
            .filter_map(|s| self.datasets.get(s).cloned())
            .collect()
    }

    /// Add a validated symbol together with the history that validated it.
    pub fn add_symbol(&mut self, dataset: Dataset) -> bool {
        let symbol = dataset.symbol.clone();
        self.datasets.insert(symbol.clone(), Arc::new(dataset));
        self.symbols.insert(symbol)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            saved_at: Utc::now(),
            symbols: self.symbols.clone(),
            date_range: self.date_range,
            settings: self.settings.clone(),
            last_result: self.last_result.clone(),
        }
    }

    /// Restore a saved snapshot. Datasets are not persisted and must be
    /// reloaded by the caller.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.symbols = snapshot.symbols;
        self.date_range = snapshot.date_range;
        self.settings = snapshot.settings;
        self.last_result = snapshot.last_result;
        self.datasets.clear();
    }
}

/// What gets written by "save session".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub symbols: SymbolSet,
    pub date_range: DateRange,
    pub settings: Settings,
    pub last_result: Option<AnalysisResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransitionLog {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl StateTransitionLog {
    pub fn new(from: String, to: String, reason: String) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
            reason,
        }
    }
}
