use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REFRESH_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    Html,
    Pdf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Json,
        OutputFormat::Csv,
        OutputFormat::Html,
        OutputFormat::Pdf,
    ];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "html" | "htm" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(ValidationError::InvalidSetting {
                name: "output format",
                input: input.trim().to_string(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// Real-time refresh: a positive number of seconds, or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshInterval {
    Disabled,
    Every(u64),
}

impl RefreshInterval {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        match input.to_ascii_lowercase().as_str() {
            "0" | "off" | "disabled" | "none" => Ok(RefreshInterval::Disabled),
            other => match other.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(RefreshInterval::Every(secs)),
                _ => Err(ValidationError::InvalidSetting {
                    name: "refresh interval",
                    input: input.to_string(),
                }),
            },
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            RefreshInterval::Disabled => None,
            RefreshInterval::Every(secs) => Some(Duration::from_secs(*secs)),
        }
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        RefreshInterval::Every(DEFAULT_REFRESH_SECS)
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshInterval::Disabled => f.write_str("disabled"),
            RefreshInterval::Every(secs) => write!(f, "{}s", secs),
        }
    }
}

/// How much the bundled analytics reports per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Basic,
    #[default]
    Standard,
    Comprehensive,
}

impl AnalysisDepth {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "basic" | "1" => Ok(AnalysisDepth::Basic),
            "standard" | "2" => Ok(AnalysisDepth::Standard),
            "comprehensive" | "full" | "3" => Ok(AnalysisDepth::Comprehensive),
            _ => Err(ValidationError::InvalidSetting {
                name: "analysis depth",
                input: input.trim().to_string(),
            }),
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisDepth::Basic => "basic",
            AnalysisDepth::Standard => "standard",
            AnalysisDepth::Comprehensive => "comprehensive",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_format: OutputFormat,
    pub refresh: RefreshInterval,
    pub color: bool,
    pub emoji: bool,
    pub analysis_depth: AnalysisDepth,
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Json,
            refresh: RefreshInterval::default(),
            color: true,
            emoji: true,
            analysis_depth: AnalysisDepth::default(),
            export_dir: PathBuf::from("."),
        }
    }
}

/// Parse yes/no style toggles.
pub fn parse_toggle(name: &'static str, input: &str) -> Result<bool, ValidationError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "on" | "true" | "1" => Ok(true),
        "n" | "no" | "off" | "false" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidSetting {
            name,
            input: input.trim().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_interval_requires_positive_seconds() {
        assert_eq!(RefreshInterval::parse("10").unwrap(), RefreshInterval::Every(10));
        assert_eq!(RefreshInterval::parse("off").unwrap(), RefreshInterval::Disabled);
        assert_eq!(RefreshInterval::parse("0").unwrap(), RefreshInterval::Disabled);
        assert!(RefreshInterval::parse("-3").is_err());
        assert!(RefreshInterval::parse("soon").is_err());
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::parse(" CSV ").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::parse("xlsx").is_err());
    }

    #[test]
    fn settings_deserialize_with_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"color":false}"#).unwrap();
        assert!(!settings.color);
        assert_eq!(settings.refresh, RefreshInterval::Every(DEFAULT_REFRESH_SECS));
    }
}
