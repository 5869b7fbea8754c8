//! SVG chart rendering
//!
//! Both charts are self-contained SVG documents sized for embedding with an
//! `<img>` tag. Rendering is pure: callers decide where the text goes.

use crate::metrics::MetricsSnapshot;
use crate::stage::StageKind;
use html_escape::encode_text;
use std::fmt::{self, Write};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 190.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 110.0;
const Y_TICKS: usize = 5;

/// One colour per stage, in execution order
const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

const PLOT_WIDTH: f64 = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const PLOT_HEIGHT: f64 = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

fn colour(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Bar chart of success counts per stage.
///
/// # Errors
/// Only fails if writing to the output buffer fails
#[allow(clippy::cast_precision_loss)]
pub fn success_rates_svg(snapshot: &MetricsSnapshot) -> Result<String, fmt::Error> {
    let successes = snapshot.successes();
    let max = successes.iter().map(|&(_, count)| count).max().unwrap_or(0).max(1) as f64;

    let mut svg = String::new();
    open_document(&mut svg, "Success Rates by Stage")?;
    y_axis(&mut svg, max, "Successful runs", |v| format!("{v:.0}"))?;

    let slot = PLOT_WIDTH / successes.len() as f64;
    let bar_width = slot * 0.6;
    let baseline = MARGIN_TOP + PLOT_HEIGHT;

    for (index, (kind, count)) in successes.iter().enumerate() {
        let bar_height = (*count as f64 / max) * PLOT_HEIGHT;
        let x = MARGIN_LEFT + slot * index as f64 + (slot - bar_width) / 2.0;
        let y = baseline - bar_height;
        writeln!(
            svg,
            r#"  <rect x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{bar_height:.1}" fill="{}"><title>{}: {count}</title></rect>"#,
            colour(index),
            encode_text(kind.label()),
        )?;
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{count}</text>"#,
            x + bar_width / 2.0,
            y - 4.0,
        )?;
        x_label(&mut svg, x + bar_width / 2.0, kind.label())?;
    }

    close_document(&mut svg)?;
    Ok(svg)
}

/// Line chart of stage durations over run dates.
///
/// Skipped runs leave a gap in that stage's line. Callers are expected to
/// have checked [`MetricsSnapshot::check_consistency`] first.
///
/// # Errors
/// Only fails if writing to the output buffer fails
#[allow(clippy::cast_precision_loss)]
pub fn trends_svg(snapshot: &MetricsSnapshot) -> Result<String, fmt::Error> {
    let runs = snapshot.run_count();
    let max = StageKind::SEQUENCE
        .iter()
        .flat_map(|&kind| snapshot.trend(kind))
        .flatten()
        .fold(0.0_f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };

    let step = if runs > 1 {
        PLOT_WIDTH / (runs - 1) as f64
    } else {
        0.0
    };
    let x_at = |run: usize| {
        if runs > 1 {
            MARGIN_LEFT + step * run as f64
        } else {
            MARGIN_LEFT + PLOT_WIDTH / 2.0
        }
    };
    let y_at = |seconds: f64| MARGIN_TOP + PLOT_HEIGHT - (seconds / max) * PLOT_HEIGHT;

    let mut svg = String::new();
    open_document(&mut svg, "Stage Duration Over Time")?;
    y_axis(&mut svg, max, "Seconds", |v| format!("{v:.3}"))?;

    for (run, date) in snapshot.run_dates().iter().enumerate() {
        x_label(&mut svg, x_at(run), &date.format("%Y-%m-%d %H:%M:%S").to_string())?;
    }

    for (index, kind) in StageKind::SEQUENCE.iter().enumerate() {
        let mut segments: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
        for (run, point) in snapshot.trend(*kind).into_iter().enumerate() {
            match point {
                Some(seconds) => {
                    if let Some(segment) = segments.last_mut() {
                        segment.push((x_at(run), y_at(seconds)));
                    }
                }
                None => segments.push(Vec::new()),
            }
        }

        for segment in segments.iter().filter(|s| !s.is_empty()) {
            let points: Vec<String> = segment
                .iter()
                .map(|(x, y)| format!("{x:.1},{y:.1}"))
                .collect();
            writeln!(
                svg,
                r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                points.join(" "),
                colour(index),
            )?;
            for (x, y) in segment {
                writeln!(
                    svg,
                    r#"  <circle cx="{x:.1}" cy="{y:.1}" r="3" fill="{}"/>"#,
                    colour(index),
                )?;
            }
        }

        legend_entry(&mut svg, index, kind.label())?;
    }

    close_document(&mut svg)?;
    Ok(svg)
}

fn open_document(svg: &mut String, title: &str) -> fmt::Result {
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"  <text x="{:.1}" y="28" font-size="16" text-anchor="middle">{}</text>"#,
        MARGIN_LEFT + PLOT_WIDTH / 2.0,
        encode_text(title),
    )
}

fn close_document(svg: &mut String) -> fmt::Result {
    writeln!(svg, "</svg>")
}

#[allow(clippy::cast_precision_loss)]
fn y_axis(
    svg: &mut String,
    max: f64,
    caption: &str,
    format_tick: impl Fn(f64) -> String,
) -> fmt::Result {
    let left = MARGIN_LEFT;
    let bottom = MARGIN_TOP + PLOT_HEIGHT;
    let right = MARGIN_LEFT + PLOT_WIDTH;

    writeln!(
        svg,
        r##"  <line x1="{left}" y1="{MARGIN_TOP}" x2="{left}" y2="{bottom}" stroke="#333"/>"##
    )?;
    writeln!(
        svg,
        r##"  <line x1="{left}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="#333"/>"##
    )?;

    for tick in 0..=Y_TICKS {
        let value = max * tick as f64 / Y_TICKS as f64;
        let y = bottom - PLOT_HEIGHT * tick as f64 / Y_TICKS as f64;
        writeln!(
            svg,
            r##"  <line x1="{:.1}" y1="{y:.1}" x2="{right}" y2="{y:.1}" stroke="#ddd"/>"##,
            left - 4.0,
        )?;
        writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
            left - 8.0,
            y + 3.0,
            format_tick(value),
        )?;
    }

    writeln!(
        svg,
        r#"  <text x="18" y="{:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 18 {:.1})">{}</text>"#,
        MARGIN_TOP + PLOT_HEIGHT / 2.0,
        MARGIN_TOP + PLOT_HEIGHT / 2.0,
        encode_text(caption),
    )
}

fn x_label(svg: &mut String, x: f64, label: &str) -> fmt::Result {
    let y = MARGIN_TOP + PLOT_HEIGHT + 14.0;
    writeln!(
        svg,
        r#"  <text x="{x:.1}" y="{y:.1}" font-size="10" text-anchor="end" transform="rotate(-35 {x:.1} {y:.1})">{}</text>"#,
        encode_text(label),
    )
}

#[allow(clippy::cast_precision_loss)]
fn legend_entry(svg: &mut String, index: usize, label: &str) -> fmt::Result {
    let x = MARGIN_LEFT + PLOT_WIDTH + 20.0;
    let y = MARGIN_TOP + 18.0 * index as f64;
    writeln!(
        svg,
        r#"  <rect x="{x:.1}" y="{:.1}" width="12" height="12" fill="{}"/>"#,
        y - 10.0,
        colour(index),
    )?;
    writeln!(
        svg,
        r#"  <text x="{:.1}" y="{y:.1}" font-size="11">{}</text>"#,
        x + 18.0,
        encode_text(label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRecorder;
    use std::time::Duration;

    fn two_runs() -> MetricsSnapshot {
        let mut recorder = MetricsRecorder::new();
        for run in 0..2 {
            recorder.begin_run();
            for kind in StageKind::SEQUENCE {
                if run == 1 && kind >= StageKind::Transform {
                    recorder.record_skipped(kind);
                } else {
                    recorder.record_duration(kind, Duration::from_millis(10));
                    recorder.record_success(kind);
                }
            }
        }
        recorder.snapshot()
    }

    #[test]
    fn test_success_chart_has_one_bar_per_stage() {
        let svg = success_rates_svg(&two_runs()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<title>").count(), StageKind::SEQUENCE.len());
        assert!(svg.contains("Validate Cleaned: 2"));
        assert!(svg.contains("Transform: 1"));
    }

    #[test]
    fn test_success_chart_with_no_runs() {
        let snapshot = MetricsRecorder::new().snapshot();
        let svg = success_rates_svg(&snapshot).unwrap();
        assert!(svg.contains(r#"height="0.0""#));
    }

    #[test]
    fn test_trend_chart_breaks_line_on_skip() {
        let svg = trends_svg(&two_runs()).unwrap();
        // 5 stages ran twice, 3 only once
        assert_eq!(svg.matches("<polyline").count(), 8);
        assert_eq!(svg.matches("<circle").count(), 5 * 2 + 3);
        assert!(svg.contains("Persist Transformed"));
    }

    #[test]
    fn test_single_run_is_centred() {
        let mut recorder = MetricsRecorder::new();
        recorder.begin_run();
        for kind in StageKind::SEQUENCE {
            recorder.record_duration(kind, Duration::from_millis(1));
        }
        let svg = trends_svg(&recorder.snapshot()).unwrap();
        let centre = MARGIN_LEFT + PLOT_WIDTH / 2.0;
        assert!(svg.contains(&format!(r#"cx="{centre:.1}""#)));
    }
}
