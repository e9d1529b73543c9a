use crate::{
    error::ExportError,
    models::{SessionSnapshot, Settings},
    utils::file_timestamp,
};
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_PREFIX: &str = "session_";

/// Saves and restores session snapshots and persisted settings as JSON.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}{}.json", SESSION_PREFIX, file_timestamp()));
        fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
        tracing::info!(path = %path.display(), "session saved");
        Ok(path)
    }

    pub fn load_snapshot(&self, path: &Path) -> Result<SessionSnapshot, ExportError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saved sessions in the store directory, newest first.
    pub fn list_snapshots(&self) -> Result<Vec<PathBuf>, ExportError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "json")
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(SESSION_PREFIX))
            })
            .collect();
        // Timestamped names sort chronologically.
        paths.sort();
        paths.reverse();
        Ok(paths)
    }

    pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }

    pub fn load_settings(path: &Path) -> Result<Settings, ExportError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
