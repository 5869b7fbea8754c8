//! HTML run report
//!
//! The [`Reporter`] turns a [`MetricsSnapshot`] into files next to the
//! configured report path:
//!
//! - `success_rates.svg`: bar chart of success counts per stage
//! - `trends.svg`: stage durations over run dates (only when the series line up)
//! - `metrics.json`: the snapshot itself
//! - the HTML report embedding both charts
//!
//! Reporting never fails the run. Anything that goes wrong is logged and
//! collected in [`ReportArtifacts::warnings`].

pub mod chart;

use crate::metrics::MetricsSnapshot;
use crate::stage::StageKind;
use crate::{Error, Result};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// File name of the success-count chart
pub const SUCCESS_CHART_FILE: &str = "success_rates.svg";
/// File name of the duration trend chart
pub const TREND_CHART_FILE: &str = "trends.svg";
/// File name of the exported metrics
pub const METRICS_FILE: &str = "metrics.json";

/// Files written by one [`Reporter::generate`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportArtifacts {
    /// HTML report
    pub report: Option<PathBuf>,
    /// Success-count bar chart
    pub success_chart: Option<PathBuf>,
    /// Duration trend chart
    pub trend_chart: Option<PathBuf>,
    /// Metrics export
    pub metrics_json: Option<PathBuf>,
    /// Everything that could not be produced, and why
    pub warnings: Vec<String>,
}

impl ReportArtifacts {
    /// Whether every artifact was written
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
            && self.report.is_some()
            && self.success_chart.is_some()
            && self.trend_chart.is_some()
            && self.metrics_json.is_some()
    }
}

/// Writes the HTML report and its assets.
#[derive(Debug, Clone)]
pub struct Reporter {
    report_path: PathBuf,
}

impl Reporter {
    /// Reporter writing to `report_path`; assets go in the same directory.
    #[must_use]
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
        }
    }

    /// Target HTML path
    #[must_use]
    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Directory holding the charts and metrics export
    #[must_use]
    pub fn asset_dir(&self) -> PathBuf {
        self.report_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Write every artifact that can be produced from `snapshot`.
    pub fn generate(&self, snapshot: &MetricsSnapshot) -> ReportArtifacts {
        let mut artifacts = ReportArtifacts::default();
        let dir = self.asset_dir();

        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn(
                &mut artifacts,
                format!("Cannot create report directory {}: {e}", dir.display()),
            );
            return artifacts;
        }

        let success_path = dir.join(SUCCESS_CHART_FILE);
        match chart::success_rates_svg(snapshot)
            .map_err(|e| Error::Report(format!("Failed to render success chart: {e}")))
            .and_then(|svg| write_text(&success_path, &svg))
        {
            Ok(()) => artifacts.success_chart = Some(success_path),
            Err(e) => warn(&mut artifacts, e.to_string()),
        }

        let trend_path = dir.join(TREND_CHART_FILE);
        let mut trend_note = None;
        match snapshot.check_consistency() {
            Ok(()) => match chart::trends_svg(snapshot)
                .map_err(|e| Error::Report(format!("Failed to render trend chart: {e}")))
                .and_then(|svg| write_text(&trend_path, &svg))
            {
                Ok(()) => artifacts.trend_chart = Some(trend_path),
                Err(e) => warn(&mut artifacts, e.to_string()),
            },
            Err(e) => {
                let message = format!("Cannot plot trends: {e}");
                trend_note = Some(message.clone());
                warn(&mut artifacts, message);
            }
        }

        let metrics_path = dir.join(METRICS_FILE);
        match serde_json::to_string_pretty(snapshot)
            .map_err(Error::from)
            .and_then(|json| write_text(&metrics_path, &json))
        {
            Ok(()) => artifacts.metrics_json = Some(metrics_path),
            Err(e) => warn(&mut artifacts, e.to_string()),
        }

        let page = ReportPage {
            snapshot,
            success_chart: artifacts.success_chart.is_some().then_some(SUCCESS_CHART_FILE),
            trend_chart: artifacts.trend_chart.is_some().then_some(TREND_CHART_FILE),
            trend_note: trend_note.as_deref(),
        };
        match render_html(&page).and_then(|html| write_text(&self.report_path, &html)) {
            Ok(()) => {
                tracing::info!(path = %self.report_path.display(), "Report generated successfully.");
                artifacts.report = Some(self.report_path.clone());
            }
            Err(e) => warn(&mut artifacts, e.to_string()),
        }

        artifacts
    }
}

/// Inputs for [`render_html`]
#[derive(Debug, Clone, Copy)]
pub struct ReportPage<'a> {
    /// Metrics to summarise
    pub snapshot: &'a MetricsSnapshot,
    /// Relative link to the success chart, if written
    pub success_chart: Option<&'a str>,
    /// Relative link to the trend chart, if written
    pub trend_chart: Option<&'a str>,
    /// Why the trend chart is missing, if known
    pub trend_note: Option<&'a str>,
}

/// Render the report page.
///
/// # Errors
/// Returns [`Error::Report`] if formatting fails
pub fn render_html(page: &ReportPage<'_>) -> Result<String> {
    let mut html = String::new();
    write_document(&mut html, page)
        .map_err(|e| Error::Report(format!("Failed to render HTML: {e}")))?;
    Ok(html)
}

fn write_document(html: &mut String, page: &ReportPage<'_>) -> std::fmt::Result {
    let snapshot = page.snapshot;

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>")?;
    writeln!(html, "<head>")?;
    writeln!(html, r#"<meta charset="utf-8">"#)?;
    writeln!(html, "<title>ETL Pipeline Report</title>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h1>Automated ETL Pipeline Report</h1>")?;
    writeln!(
        html,
        "<p>Generated {} from {} run(s).</p>",
        encode_text(&snapshot.taken_at().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        snapshot.run_count()
    )?;

    writeln!(html, "<h2>Success Rates:</h2>")?;
    match page.success_chart {
        Some(src) => writeln!(
            html,
            r#"<img src="{}" alt="Success rates by stage">"#,
            encode_double_quoted_attribute(src)
        )?,
        None => writeln!(html, "<p>Success chart unavailable.</p>")?,
    }

    writeln!(html, "<table>")?;
    writeln!(
        html,
        "<tr><th>Stage</th><th>Successes</th><th>Attempts</th><th>Last duration (s)</th></tr>"
    )?;
    for kind in StageKind::SEQUENCE {
        let latest = snapshot
            .timings(kind)
            .last()
            .and_then(|timing| timing.elapsed())
            .map_or_else(|| "-".to_string(), |d| format!("{:.4}", d.as_secs_f64()));
        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{latest}</td></tr>",
            encode_text(kind.label()),
            snapshot.success_count(kind),
            snapshot.attempt_count(kind),
        )?;
    }
    writeln!(html, "</table>")?;

    writeln!(html, "<h2>Trends Over Time:</h2>")?;
    match (page.trend_chart, page.trend_note) {
        (Some(src), _) => writeln!(
            html,
            r#"<img src="{}" alt="Stage duration over time">"#,
            encode_double_quoted_attribute(src)
        )?,
        (None, Some(note)) => writeln!(html, "<p>{}</p>", encode_text(note))?,
        (None, None) => writeln!(html, "<p>Trend chart unavailable.</p>")?,
    }

    writeln!(html, "</body>")?;
    writeln!(html, "</html>")
}

fn warn(artifacts: &mut ReportArtifacts, message: String) {
    tracing::error!("{message}");
    artifacts.warnings.push(message);
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .map_err(|e| Error::Report(format!("Failed to write {}: {e}", path.display())))
}
