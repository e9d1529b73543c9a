use crate::models::{AnalysisResult, Dataset, Quote, Settings};
use colored::{Color, Colorize};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tabled::{builder::Builder, settings::Style};

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const CHART_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A titled table of pre-formatted cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn new<H: Into<String>>(title: impl Into<String>, headers: impl IntoIterator<Item = H>) -> Self {
        Self {
            title: title.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<C: Into<String>>(&mut self, cells: impl IntoIterator<Item = C>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Symbol / Metric / Value rows of an analysis result.
    pub fn from_result(result: &AnalysisResult) -> Self {
        let mut table = TableView::new(result.kind.title(), ["Symbol", "Metric", "Value"]);
        for row in result.metric_rows() {
            table.push_row([row.symbol, row.metric, format!("{:.4}", row.value)]);
        }
        table
    }

    /// One line per loaded dataset.
    pub fn symbol_summary<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> Self {
        let mut table = TableView::new(
            "Loaded Symbols",
            ["Symbol", "Name", "Exchange", "Bars", "First", "Last", "Last Close"],
        );
        for ds in datasets {
            table.push_row([
                ds.symbol.to_string(),
                ds.metadata.name.clone().unwrap_or_else(|| "-".to_string()),
                ds.metadata.exchange.clone().unwrap_or_else(|| "-".to_string()),
                ds.len().to_string(),
                ds.first().map(|p| p.date.to_string()).unwrap_or_else(|| "-".to_string()),
                ds.last().map(|p| p.date.to_string()).unwrap_or_else(|| "-".to_string()),
                ds.last().map(|p| format!("{:.2}", p.close)).unwrap_or_else(|| "-".to_string()),
            ]);
        }
        table
    }

    pub fn quotes(title: impl Into<String>, quotes: &[Quote]) -> Self {
        let mut table = TableView::new(title, ["Symbol", "Price", "Change %", "Volume", "As Of"]);
        for quote in quotes {
            table.push_row([
                quote.symbol.to_string(),
                format!("{:.2}", quote.price),
                quote
                    .change_pct()
                    .map(|c| format!("{:+.2}%", c))
                    .unwrap_or_else(|| "-".to_string()),
                quote.volume.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                quote.as_of.format("%H:%M:%S").to_string(),
            ]);
        }
        table
    }

    pub fn settings(settings: &Settings) -> Self {
        let mut table = TableView::new("Settings", ["#", "Setting", "Value"]);
        table.push_row(["1", "Output format", settings.output_format.to_string().as_str()]);
        table.push_row(["2", "Real-time refresh", settings.refresh.to_string().as_str()]);
        table.push_row(["3", "Color output", on_off(settings.color)]);
        table.push_row(["4", "Emoji", on_off(settings.emoji)]);
        table.push_row(["5", "Analysis depth", settings.analysis_depth.to_string().as_str()]);
        table.push_row(["6", "Export directory", settings.export_dir.display().to_string().as_str()]);
        table
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Close-price series drawn as text sparklines.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub title: String,
    pub series: Vec<(String, Vec<f64>)>,
}

impl ChartView {
    pub fn closes<'a>(title: impl Into<String>, datasets: impl IntoIterator<Item = &'a Dataset>) -> Self {
        Self {
            title: title.into(),
            series: datasets
                .into_iter()
                .map(|ds| (ds.symbol.to_string(), ds.closes()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    Table(TableView),
    Chart(ChartView),
}

/// Output side of the session.
pub trait Presenter: Send {
    fn render(&mut self, item: &Renderable) -> io::Result<()>;

    fn message(&mut self, kind: MessageKind, text: &str) -> io::Result<()>;

    /// Pick up color/emoji changes made in the settings menu.
    fn apply_settings(&mut self, settings: &Settings);
}

/// Downsample to `width` buckets and map each to a block character.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let bucket = values.len().div_ceil(width);
    let sampled: Vec<f64> = values
        .chunks(bucket)
        .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
        .collect();

    let min = sampled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sampled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    sampled
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                SPARK_CHARS[SPARK_CHARS.len() / 2]
            } else {
                let idx = ((v - min) / span * (SPARK_CHARS.len() - 1) as f64).round() as usize;
                SPARK_CHARS[idx.min(SPARK_CHARS.len() - 1)]
            }
        })
        .collect()
}

/// Terminal presenter built on `tabled` and `colored`.
pub struct ConsolePresenter {
    out: Box<dyn Write + Send>,
    color: bool,
    emoji: bool,
}

impl ConsolePresenter {
    pub fn stdout(settings: &Settings) -> Self {
        Self::with_writer(Box::new(io::stdout()), settings)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, settings: &Settings) -> Self {
        Self {
            out,
            color: settings.color,
            emoji: settings.emoji,
        }
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        let painted = text.color(color);
        if bold {
            painted.bold().to_string()
        } else {
            painted.to_string()
        }
    }

    fn prefix(&self, kind: MessageKind) -> &'static str {
        match (kind, self.emoji) {
            (MessageKind::Info, true) => "ℹ️ ",
            (MessageKind::Success, true) => "✅",
            (MessageKind::Warning, true) => "⚠️ ",
            (MessageKind::Error, true) => "❌",
            (MessageKind::Info, false) => "[info]",
            (MessageKind::Success, false) => "[ok]",
            (MessageKind::Warning, false) => "[warn]",
            (MessageKind::Error, false) => "[error]",
        }
    }

    fn render_table(&mut self, view: &TableView) -> io::Result<()> {
        let title = self.paint(&view.title, Color::Cyan, true);
        writeln!(self.out, "\n{}", title)?;
        if view.is_empty() {
            writeln!(self.out, "(no rows)")?;
            return Ok(());
        }

        let mut builder = Builder::default();
        builder.push_record(view.headers.iter().cloned());
        for row in &view.rows {
            builder.push_record(row.iter().cloned());
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        writeln!(self.out, "{}", table)
    }

    fn render_chart(&mut self, view: &ChartView) -> io::Result<()> {
        let title = self.paint(&view.title, Color::Cyan, true);
        writeln!(self.out, "\n{}", title)?;
        let label_width = view.series.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

        for (name, values) in &view.series {
            let line = sparkline(values, CHART_WIDTH);
            let trend = match (values.first(), values.last()) {
                (Some(first), Some(last)) if last >= first => self.paint(&line, Color::Green, false),
                (Some(_), Some(_)) => self.paint(&line, Color::Red, false),
                _ => "(no data)".to_string(),
            };
            writeln!(self.out, "{:<width$}  {}", name, trend, width = label_width)?;
        }
        Ok(())
    }
}

impl Presenter for ConsolePresenter {
    fn render(&mut self, item: &Renderable) -> io::Result<()> {
        match item {
            Renderable::Table(view) => self.render_table(view),
            Renderable::Chart(view) => self.render_chart(view),
        }?;
        self.out.flush()
    }

    fn message(&mut self, kind: MessageKind, text: &str) -> io::Result<()> {
        let color = match kind {
            MessageKind::Info => Color::Blue,
            MessageKind::Success => Color::Green,
            MessageKind::Warning => Color::Yellow,
            MessageKind::Error => Color::Red,
        };
        let prefix = self.prefix(kind);
        let line = self.paint(text, color, kind == MessageKind::Error);
        writeln!(self.out, "{} {}", prefix, line)?;
        self.out.flush()
    }

    fn apply_settings(&mut self, settings: &Settings) {
        self.color = settings.color;
        self.emoji = settings.emoji;
    }
}

/// Cloneable in-memory writer for capturing presenter output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
