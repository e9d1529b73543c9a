use crate::{
    error::ExportError,
    models::{AnalysisResult, OutputFormat},
    utils::file_timestamp,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes analysis results to disk.
#[derive(Debug, Clone)]
pub struct ResultExporter {
    export_dir: PathBuf,
}

impl ResultExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn set_export_dir(&mut self, dir: impl Into<PathBuf>) {
        self.export_dir = dir.into();
    }

    /// `analysis_<timestamp>.<ext>` in the export directory.
    pub fn default_path(&self, format: OutputFormat) -> PathBuf {
        self.export_dir
            .join(format!("analysis_{}.{}", file_timestamp(), format.extension()))
    }

    /// Export `result` to `path`, or to [`default_path`](Self::default_path)
    /// when none is given. Returns the written path.
    pub fn export(
        &self,
        result: &AnalysisResult,
        format: OutputFormat,
        path: Option<&Path>,
    ) -> Result<PathBuf, ExportError> {
        let content = match format {
            OutputFormat::Json => serde_json::to_string_pretty(result)?,
            OutputFormat::Csv => to_csv(result)?,
            OutputFormat::Html => to_html(result),
            OutputFormat::Pdf => {
                return Err(ExportError::UnsupportedFormat {
                    format: format.to_string(),
                })
            }
        };

        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_path(format));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        tracing::info!(path = %path.display(), %format, "exported analysis result");
        Ok(path)
    }
}

fn to_csv(result: &AnalysisResult) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Symbol", "Metric", "Value"])?;
    for row in result.metric_rows() {
        writer.write_record([row.symbol, row.metric, row.value.to_string()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Serialization(e.to_string()))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn to_html(result: &AnalysisResult) -> String {
    let title = escape_html(result.kind.title());
    let mut rows = String::new();
    for row in result.metric_rows() {
        rows.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td><td>{:.4}</td></tr>\n",
            escape_html(&row.symbol),
            escape_html(&row.metric),
            row.value
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    body {{ font-family: sans-serif; margin: 2em; }}
    table {{ border-collapse: collapse; }}
    th, td {{ border: 1px solid #ccc; padding: 4px 10px; text-align: left; }}
    th {{ background: #f0f0f0; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  <p>Generated {generated}</p>
  <table>
    <thead><tr><th>Symbol</th><th>Metric</th><th>Value</th></tr></thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
"#,
        title = title,
        generated = result.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        rows = rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisKind, AnalysisOutput, IndicatorResult, Symbol};
    use std::collections::BTreeMap;

    fn result() -> AnalysisResult {
        let mut values = BTreeMap::new();
        values.insert("last_close".to_string(), 187.5);
        AnalysisResult::new(
            AnalysisKind::TechnicalDashboard,
            AnalysisOutput::Indicators(vec![IndicatorResult {
                symbol: Symbol::parse("AAPL").unwrap(),
                values,
                unavailable: vec![],
            }]),
        )
    }

    #[test]
    fn csv_export_writes_metric_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path());
        let path = exporter.export(&result(), OutputFormat::Csv, None).unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("analysis_"));
        assert_eq!(path.extension().unwrap(), "csv");
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "Symbol,Metric,Value\nAAPL,last_close,187.5\n");
    }

    #[test]
    fn json_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path());
        let target = dir.path().join("out.json");
        exporter.export(&result(), OutputFormat::Json, Some(&target)).unwrap();

        let parsed: AnalysisResult = serde_json::from_str(&fs::read_to_string(target).unwrap()).unwrap();
        assert_eq!(parsed, result());
    }

    #[test]
    fn html_export_escapes_and_lists_rows() {
        let html = to_html(&result());
        assert!(html.contains("<td>AAPL</td>"));
        assert!(html.contains("Technical Analysis Dashboard"));
    }

    #[test]
    fn pdf_is_unsupported_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path());
        let err = exporter.export(&result(), OutputFormat::Pdf, None).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let exporter = ResultExporter::new(dir.path());
        let err = exporter
            .export(&result(), OutputFormat::Json, Some(&blocker.join("out.json")))
            .unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
