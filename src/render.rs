use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::report::Report;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub json: PathBuf,
    pub html: PathBuf,
}

/// Writes `report-<start>.json` and `report-<start>.html` into `reports_dir`.
pub fn write_reports(report: &Report, reports_dir: &Path) -> Result<ReportFiles> {
    std::fs::create_dir_all(reports_dir)
        .with_context(|| format!("Failed to create reports directory: {}", reports_dir.display()))?;

    let stamp = report.start_time.format("%Y%m%d-%H%M%S");
    let files = ReportFiles {
        json: reports_dir.join(format!("report-{stamp}.json")),
        html: reports_dir.join(format!("report-{stamp}.html")),
    };

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&files.json, json)
        .with_context(|| format!("Failed to write {}", files.json.display()))?;
    std::fs::write(&files.html, render_html(report))
        .with_context(|| format!("Failed to write {}", files.html.display()))?;

    Ok(files)
}

pub fn render_html(report: &Report) -> String {
    let started = report.start_time.format("%Y-%m-%d %H:%M:%S").to_string();
    let finished = report
        .end_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut out = String::with_capacity(4096 + report.results.len() * 256);
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Decompile report - {started}</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #f5f5f5; margin: 0; padding: 20px; }}
.container {{ max-width: 1200px; margin: 0 auto; background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
.header {{ background: #4a5bd4; color: #fff; padding: 24px 30px; border-radius: 8px 8px 0 0; }}
.summary {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 16px; padding: 24px 30px; }}
.card {{ background: #f8f9fa; padding: 16px; border-radius: 8px; border-left: 4px solid #4a5bd4; }}
.card .label {{ color: #6c757d; font-size: 13px; }}
.card .value {{ font-size: 26px; font-weight: bold; }}
.card.success {{ border-left-color: #28a745; }}
.card.failure {{ border-left-color: #dc3545; }}
.details {{ padding: 0 30px 30px; overflow-x: auto; }}
table {{ width: 100%; border-collapse: collapse; }}
th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid #dee2e6; font-size: 14px; }}
th {{ background: #f8f9fa; }}
.status.success {{ color: #155724; }}
.status.failure {{ color: #721c24; }}
.error {{ color: #dc3545; font-size: 12px; }}
.footer {{ padding: 16px 30px; border-top: 1px solid #dee2e6; color: #6c757d; font-size: 13px; }}
</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>Decompile report</h1>
<div>Started {started} &middot; finished {finished}</div>
</div>
<div class="summary">
<div class="card"><div class="label">Processed</div><div class="value">{processed}</div></div>
<div class="card"><div class="label">Expected</div><div class="value">{expected}</div></div>
<div class="card success"><div class="label">Succeeded</div><div class="value">{success}</div></div>
<div class="card failure"><div class="label">Failed</div><div class="value">{failure}</div></div>
<div class="card"><div class="label">Success rate</div><div class="value">{rate:.1}%</div></div>
<div class="card"><div class="label">Duration</div><div class="value">{duration:.1}s</div></div>
</div>
<div class="details">
<h2>Results</h2>
<table>
<thead><tr><th>File</th><th>Package</th><th>Status</th><th>Seconds</th><th>Error</th><th>Timestamp</th></tr></thead>
<tbody>
"#,
        processed = report.processed_count,
        expected = report.expected_count,
        success = report.success_count,
        failure = report.failure_count,
        rate = report.success_rate(),
        duration = report.duration_seconds(),
    );

    for result in &report.results {
        let (class, label) = if result.success {
            ("success", "ok")
        } else {
            ("failure", "failed")
        };
        let error = result
            .error_message
            .as_deref()
            .map(html_escape)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            r#"<tr><td>{}</td><td>{}</td><td><span class="status {class}">{label}</span></td><td>{:.3}</td><td><div class="error">{error}</div></td><td>{}</td></tr>"#,
            html_escape(&result.name),
            html_escape(&result.package),
            result.elapsed_seconds,
            result.timestamp.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    let _ = write!(
        out,
        r#"</tbody>
</table>
</div>
<div class="footer">
<p>Input: {}</p>
<p>Output: {}</p>
</div>
</div>
</body>
</html>
"#,
        html_escape(&report.input_path.to_string_lossy()),
        html_escape(&report.output_path.to_string_lossy()),
    );

    out
}

pub fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
