//! Report rendering
//!
//! Turns a merged report into a human-viewable document.

use std::fmt::{self, Write};
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::RenderError;
use crate::models::{MergedReport, ReportStats, SuiteRecord, TestState};

/// Where and how to render a report
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub report_dir: PathBuf,
    pub report_filename: String,
    pub report_title: String,
    pub show_skipped: bool,
    pub overwrite: bool,
}

impl RenderOptions {
    pub fn new(
        report_dir: impl Into<PathBuf>,
        report_filename: impl Into<String>,
        report_title: impl Into<String>,
    ) -> Self {
        Self {
            report_dir: report_dir.into(),
            report_filename: report_filename.into(),
            report_title: report_title.into(),
            show_skipped: true,
            overwrite: true,
        }
    }

    pub fn show_skipped(mut self, show: bool) -> Self {
        self.show_skipped = show;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.report_dir.join(&self.report_filename)
    }
}

/// Title of a merged report: project name followed by the caller's context
pub fn merged_title(project: &str, context: &str) -> String {
    format!("{project} {context}").trim().to_string()
}

/// Produces a rendered document from a merged report
pub trait ReportRenderer: Send + Sync {
    /// Render and return the written path
    fn render(&self, report: &MergedReport, options: &RenderOptions)
        -> Result<PathBuf, RenderError>;
}

/// Self-contained HTML renderer
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRenderer;

impl ReportRenderer for HtmlRenderer {
    fn render(
        &self,
        report: &MergedReport,
        options: &RenderOptions,
    ) -> Result<PathBuf, RenderError> {
        let path = options.output_path();
        if !options.overwrite && path.exists() {
            return Err(RenderError::Exists(path));
        }

        let html = Self::to_html(report, options)?;

        let io_err = |source| RenderError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&options.report_dir).map_err(io_err)?;
        fs::write(&path, html).map_err(io_err)?;
        Ok(path)
    }
}

impl HtmlRenderer {
    pub fn to_html(report: &MergedReport, options: &RenderOptions) -> Result<String, fmt::Error> {
        let mut output = String::new();
        let title = escape_html(&options.report_title);
        let stats = &report.stats;

        writeln!(
            output,
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        h2 {{ color: #555; margin-top: 30px; }}
        h2 small {{ color: #999; font-weight: normal; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }}
        th {{ background: #007bff; color: white; }}
        .passed {{ color: #28a745; font-weight: bold; }}
        .failed {{ color: #dc3545; font-weight: bold; }}
        .pending {{ color: #17a2b8; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 120px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
        .stat-label {{ color: #666; font-size: 14px; }}
        pre {{ white-space: pre-wrap; margin: 0; color: #dc3545; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>"#
        )?;

        write_summary(&mut output, stats)?;

        for suite in &report.results {
            write_suite(&mut output, suite, options.show_skipped)?;
        }

        writeln!(
            output,
            r#"
        <h2>Sources</h2>
        <table>
            <tr><th>Run ID</th><th>Title</th><th>Backend</th><th>Report</th></tr>"#
        )?;
        for source in &report.sources {
            writeln!(
                output,
                "            <tr><td><code>{}</code></td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&source.run_id),
                escape_html(&source.title),
                escape_html(&source.backend),
                escape_html(&source.report_filename)
            )?;
        }
        writeln!(
            output,
            r#"        </table>
        <p>Started {} · Ended {} · Merged {}</p>
    </div>
</body>
</html>"#,
            format_datetime(&stats.start),
            format_datetime(&stats.end),
            format_datetime(&report.merged_at)
        )?;

        Ok(output)
    }
}

fn write_summary(output: &mut String, stats: &ReportStats) -> fmt::Result {
    writeln!(output, "\n        <h2>Summary</h2>")?;
    let cards = [
        (stats.suites.to_string(), "Suites"),
        (stats.tests.to_string(), "Tests"),
        (stats.passes.to_string(), "Passed"),
        (stats.failures.to_string(), "Failed"),
        (stats.pending.to_string(), "Pending"),
        (stats.skipped.to_string(), "Skipped"),
        (format!("{:.1}%", stats.pass_percent), "Pass Rate"),
        (format!("{}ms", stats.duration_ms), "Duration"),
    ];
    for (value, label) in cards {
        writeln!(
            output,
            r#"        <div class="stat-card">
            <div class="stat-value">{value}</div>
            <div class="stat-label">{label}</div>
        </div>"#
        )?;
    }
    Ok(())
}

fn write_suite(output: &mut String, suite: &SuiteRecord, show_skipped: bool) -> fmt::Result {
    writeln!(
        output,
        r#"
        <h2>{} <small>{}</small></h2>
        <table>
            <tr><th>Test</th><th>State</th><th>Duration</th></tr>"#,
        escape_html(&suite.title),
        escape_html(&suite.file)
    )?;

    for test in &suite.tests {
        if test.state == TestState::Pending && !show_skipped {
            continue;
        }
        let class = match test.state {
            TestState::Passed => "passed",
            TestState::Failed => "failed",
            TestState::Pending => "pending",
        };
        write!(
            output,
            r#"            <tr><td>{}"#,
            escape_html(&test.title)
        )?;
        if let Some(err) = &test.err {
            write!(output, "<pre>{}</pre>", escape_html(err))?;
        }
        writeln!(
            output,
            r#"</td><td class="{class}">{} {}</td><td>{}ms</td></tr>"#,
            test.state.symbol(),
            test.state,
            test.duration_ms
        )?;
    }

    writeln!(output, "        </table>")
}

/// One-line console summary
pub fn format_summary(stats: &ReportStats) -> String {
    format!(
        "Total: {} | Pass: {} | Fail: {} | Pending: {} | Skipped: {} | Pass Rate: {:.1}% | Duration: {}ms",
        stats.tests,
        stats.passes,
        stats.failures,
        stats.pending,
        stats.skipped,
        stats.pass_percent,
        stats.duration_ms
    )
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
