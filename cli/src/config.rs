use crate::{
    error::ConfigError,
    models::{AnalysisDepth, OutputFormat, RefreshInterval, Settings},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SETTINGS_FILE: &str = "marketlens.settings.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Yahoo,
    AlphaVantage,
    Quandl,
}

impl ProviderKind {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        match input.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "yahoo" | "yfinance" => Ok(ProviderKind::Yahoo),
            "alphavantage" => Ok(ProviderKind::AlphaVantage),
            "quandl" => Ok(ProviderKind::Quandl),
            _ => Err(ConfigError::UnknownProvider(input.trim().to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::AlphaVantage => "alphavantage",
            ProviderKind::Quandl => "quandl",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// Zero disables the history cache.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: env::temp_dir().join("marketlens_cache"),
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ConfigYaml {
    pub interactive_mode: Option<bool>,
    pub provider: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub quandl_api_key: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_secs: Option<u64>,
    pub settings_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub settings: Option<Settings>,
}

/// Process-wide configuration, built once at startup and handed to the
/// controller.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub interactive: bool,
    pub provider: ProviderKind,
    pub alpha_vantage_api_key: Option<String>,
    pub quandl_api_key: Option<String>,
    pub cache: CacheConfig,
    pub settings_file: PathBuf,
    pub log_level: String,
    pub settings: Settings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interactive: true,
            provider: ProviderKind::Yahoo,
            alpha_vantage_api_key: None,
            quandl_api_key: None,
            cache: CacheConfig::default(),
            settings_file: PathBuf::from(DEFAULT_SETTINGS_FILE),
            log_level: "warn".to_string(),
            settings: Settings::default(),
        }
    }
}

impl AppConfig {
    /// Load from the YAML file named by `CONFIG_FILE`, or from the
    /// environment (and `.env`) otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match env::var("CONFIG_FILE") {
            Ok(path) => Self::from_yaml(&path)?,
            Err(_) => Self::from_lookup(|key| env::var(key).ok())?,
        };
        config.apply_saved_settings();
        Ok(config)
    }

    pub fn from_yaml(file_path: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(file_path, &yaml_content)
    }

    pub fn from_yaml_str(file_path: &str, yaml_content: &str) -> Result<Self, ConfigError> {
        let yaml: ConfigYaml = serde_yaml::from_str(yaml_content).map_err(|e| ConfigError::Parse {
            path: file_path.to_string(),
            message: e.to_string(),
        })?;

        let defaults = Self::default();
        Ok(Self {
            interactive: yaml.interactive_mode.unwrap_or(defaults.interactive),
            provider: match yaml.provider {
                Some(name) => ProviderKind::parse(&name)?,
                None => defaults.provider,
            },
            alpha_vantage_api_key: yaml.alpha_vantage_api_key,
            quandl_api_key: yaml.quandl_api_key,
            cache: CacheConfig {
                dir: yaml.cache_dir.unwrap_or(defaults.cache.dir),
                ttl: yaml
                    .cache_ttl_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.cache.ttl),
            },
            settings_file: yaml.settings_file.unwrap_or(defaults.settings_file),
            log_level: yaml.log_level.unwrap_or(defaults.log_level),
            settings: yaml.settings.unwrap_or_default(),
        })
    }

    /// Build from a variable lookup. Unparseable values keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let settings = &mut config.settings;

        let flag = |key: &str| lookup(key).and_then(|v| parse_bool(key, &v));

        if let Some(interactive) = flag("INTERACTIVE_MODE") {
            config.interactive = interactive;
        }
        if let Some(color) = flag("COLOR_OUTPUT") {
            settings.color = color;
        }
        if let Some(emoji) = flag("EMOJI_SUPPORT") {
            settings.emoji = emoji;
        }
        if let Some(raw) = lookup("REAL_TIME_REFRESH") {
            match RefreshInterval::parse(&raw) {
                Ok(refresh) => settings.refresh = refresh,
                Err(e) => tracing::warn!(%e, "ignoring REAL_TIME_REFRESH"),
            }
        }
        if let Some(raw) = lookup("OUTPUT_FORMAT") {
            match OutputFormat::parse(&raw) {
                Ok(format) => settings.output_format = format,
                Err(e) => tracing::warn!(%e, "ignoring OUTPUT_FORMAT"),
            }
        }
        if let Some(raw) = lookup("ANALYSIS_DEPTH") {
            match AnalysisDepth::parse(&raw) {
                Ok(depth) => settings.analysis_depth = depth,
                Err(e) => tracing::warn!(%e, "ignoring ANALYSIS_DEPTH"),
            }
        }
        if let Some(dir) = lookup("EXPORT_DIR").filter(|s| !s.is_empty()) {
            settings.export_dir = PathBuf::from(dir);
        }

        if let Some(name) = lookup("DATA_PROVIDER").filter(|s| !s.is_empty()) {
            config.provider = ProviderKind::parse(&name)?;
        }
        config.alpha_vantage_api_key = lookup("ALPHA_VANTAGE_API_KEY").filter(|s| !s.is_empty());
        config.quandl_api_key = lookup("QUANDL_API_KEY").filter(|s| !s.is_empty());

        if let Some(dir) = lookup("CACHE_DIR").filter(|s| !s.is_empty()) {
            config.cache.dir = PathBuf::from(dir);
        }
        if let Some(ttl) = lookup("CACHE_TTL_SECS").and_then(|s| s.parse().ok()) {
            config.cache.ttl = Duration::from_secs(ttl);
        }
        if let Some(path) = lookup("SETTINGS_FILE").filter(|s| !s.is_empty()) {
            config.settings_file = PathBuf::from(path);
        }

        let debug = flag("DEBUG").unwrap_or(false) || flag("VERBOSE").unwrap_or(false);
        config.log_level = if debug {
            "debug".to_string()
        } else {
            lookup("LOG_LEVEL")
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or(config.log_level)
        };

        Ok(config)
    }

    /// Overlay settings previously saved from the settings menu, if any.
    fn apply_saved_settings(&mut self) {
        if !self.settings_file.exists() {
            return;
        }
        match crate::services::SessionStore::load_settings(&self.settings_file) {
            Ok(saved) => self.settings = saved,
            Err(e) => tracing::warn!(
                path = %self.settings_file.display(),
                error = %e,
                "ignoring unreadable settings file"
            ),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value, "ignoring non-boolean value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.interactive);
        assert_eq!(config.provider, ProviderKind::Yahoo);
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn environment_overrides_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("COLOR_OUTPUT", "false"),
            ("EMOJI_SUPPORT", "0"),
            ("REAL_TIME_REFRESH", "15"),
            ("OUTPUT_FORMAT", "csv"),
            ("INTERACTIVE_MODE", "no"),
            ("VERBOSE", "1"),
        ]))
        .unwrap();
        assert!(!config.settings.color);
        assert!(!config.settings.emoji);
        assert_eq!(config.settings.refresh, RefreshInterval::Every(15));
        assert_eq!(config.settings.output_format, OutputFormat::Csv);
        assert!(!config.interactive);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("REAL_TIME_REFRESH", "-1"),
            ("COLOR_OUTPUT", "maybe"),
        ]))
        .unwrap();
        assert_eq!(config.settings.refresh, RefreshInterval::default());
        assert!(config.settings.color);
    }

    #[test]
    fn unknown_provider_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("DATA_PROVIDER", "bloomberg")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(_)));
        let config = AppConfig::from_lookup(lookup(&[("DATA_PROVIDER", "alpha_vantage")])).unwrap();
        assert_eq!(config.provider, ProviderKind::AlphaVantage);
    }

    #[test]
    fn yaml_config() {
        let yaml = r#"
provider: alphavantage
alpha_vantage_api_key: demo
cache_ttl_secs: 0
settings:
  color: false
  refresh: disabled
"#;
        let config = AppConfig::from_yaml_str("inline.yaml", yaml).unwrap();
        assert_eq!(config.provider, ProviderKind::AlphaVantage);
        assert_eq!(config.alpha_vantage_api_key.as_deref(), Some("demo"));
        assert_eq!(config.cache.ttl, Duration::ZERO);
        assert!(!config.settings.color);
        assert_eq!(config.settings.refresh, RefreshInterval::Disabled);
    }
}
