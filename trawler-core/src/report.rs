// Report generation for finished crawls

use crate::error::{CoreError, Result};
use colored::Colorize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use trawler_scanner::report::{CrawlReport, ReportSink};
use trawler_scanner::result::PageResult;
use trawler_scanner::sensitive::{Finding, Severity};

pub const CRAWL_REPORT_FILE: &str = "crawl_report.txt";
pub const ALL_URLS_FILE: &str = "all_urls.txt";
pub const IN_SCOPE_URLS_FILE: &str = "in_scope_urls.txt";
pub const SENSITIVE_TXT_FILE: &str = "sensitive_info.txt";
pub const SENSITIVE_JSON_FILE: &str = "sensitive_info.json";
pub const SENSITIVE_CSV_FILE: &str = "sensitive_info.csv";
pub const SENSITIVE_HTML_FILE: &str = "sensitive_info.html";
pub const SENSITIVE_SUMMARY_FILE: &str = "sensitive_summary.txt";
pub const RESULTS_JSON_FILE: &str = "results.json";

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const LIGHT_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";

fn section(report: &mut String, title: &str) {
    report.push_str(HEAVY_RULE);
    report.push_str(title);
    report.push('\n');
    report.push_str(HEAVY_RULE);
    report.push('\n');
}

pub(crate) fn status_label(status: u16, colorize: bool) -> String {
    let label = if status == 0 {
        "---".to_string()
    } else {
        status.to_string()
    };
    if !colorize {
        return label;
    }
    match status {
        200..=299 => label.green().to_string(),
        300..=399 => label.cyan().to_string(),
        400..=499 => label.yellow().to_string(),
        500..=599 => label.red().to_string(),
        _ => label.white().to_string(),
    }
}

fn severity_label(severity: Severity, colorize: bool) -> String {
    let label = format!("[{}]", severity);
    if !colorize {
        return label;
    }
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.blue().to_string(),
    }
}

fn push_list(report: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    report.push_str(&format!("  {} ({}):\n", title, items.len()));
    for item in items {
        report.push_str(&format!("    {}\n", item));
    }
}

fn page_section(report: &mut String, result: &PageResult, colorize: bool) {
    report.push_str(&format!(
        "[{}] {} {}\n",
        status_label(result.status_code, colorize),
        result.method.as_str(),
        result.url
    ));
    report.push_str(&format!(
        "  Depth: {}  Origin: {}  Attempts: {}  Time: {} ms\n",
        result.depth,
        result.origin.as_str(),
        result.attempts,
        result.response_time.as_millis()
    ));
    if let Some(ref parent) = result.parent {
        report.push_str(&format!("  Parent: {}\n", parent));
    }
    if let Some(ref content_type) = result.content_type {
        report.push_str(&format!(
            "  Content-Type: {}  Size: {} bytes{}\n",
            content_type,
            result.body_size,
            if result.truncated { " (truncated)" } else { "" }
        ));
    }
    if result.final_url != result.url {
        report.push_str(&format!("  Final URL: {}\n", result.final_url));
    }
    if result.rendered {
        report.push_str("  Rendered: yes\n");
    }
    if let Some(ref error) = result.error {
        report.push_str(&format!("  Error: {}\n", error));
    }

    push_list(report, "Redirects", &result.redirect_chain);
    push_list(report, "Links", &result.links);

    if !result.forms.is_empty() {
        report.push_str(&format!("  Forms ({}):\n", result.forms.len()));
        for form in &result.forms {
            let fields: Vec<&str> = form.fields.iter().map(|f| f.name.as_str()).collect();
            report.push_str(&format!(
                "    {} {} [{}] fields: {}\n",
                form.method.as_str(),
                form.action,
                form.enctype,
                if fields.is_empty() {
                    "(none)".to_string()
                } else {
                    fields.join(", ")
                }
            ));
        }
    }

    if !result.api_hints.is_empty() {
        report.push_str(&format!("  API endpoints ({}):\n", result.api_hints.len()));
        for hint in &result.api_hints {
            report.push_str(&format!(
                "    {} {} ({:?})\n",
                hint.method.map(|m| m.as_str()).unwrap_or("ANY"),
                hint.url,
                hint.source
            ));
        }
    }

    if !result.post_requests.is_empty() {
        report.push_str(&format!("  POST requests ({}):\n", result.post_requests.len()));
        for post in &result.post_requests {
            let params: Vec<String> = post
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            report.push_str(&format!(
                "    {} {} [{}] {}\n",
                post.method.as_str(),
                post.url,
                post.content_type,
                params.join("&")
            ));
        }
    }

    push_list(report, "Scripts", &result.scripts);
    push_list(report, "Stylesheets", &result.stylesheets);
    for (bucket, urls) in result.static_resources.buckets() {
        push_list(report, bucket, urls);
    }
    for (kind, links) in result.special_links.groups() {
        push_list(report, kind, links);
    }

    if !result.findings.is_empty() {
        report.push_str(&format!("  Sensitive findings ({}):\n", result.findings.len()));
        for finding in &result.findings {
            report.push_str(&format!(
                "    {} {}: {}\n",
                severity_label(finding.severity, colorize),
                finding.rule,
                finding.matched
            ));
        }
    }
    report.push('\n');
}

/// Full text report: run header, totals, one section per fetched page and the
/// run-wide artifact lists.
pub fn generate_crawl_report(report: &CrawlReport, colorize: bool) -> String {
    let mut out = String::new();
    out.push_str(HEAVY_RULE);
    out.push_str("                          TRAWLER CRAWL REPORT\n");
    out.push_str(HEAVY_RULE);
    out.push('\n');

    out.push_str(&format!("Run ID:       {}\n", report.run_id));
    out.push_str(&format!("Seed:         {}\n", report.seed));
    out.push_str(&format!(
        "Started:      {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Duration:     {:.1} seconds\n",
        report.duration().num_milliseconds() as f64 / 1000.0
    ));
    out.push_str(&format!("Termination:  {}\n\n", report.termination.as_str()));

    section(&mut out, "SUMMARY");
    let metrics = &report.metrics;
    out.push_str(&format!("  Pages fetched:      {}\n", report.results.len()));
    out.push_str(&format!("  Failed:             {}\n", report.failed_count()));
    out.push_str(&format!("  URLs discovered:    {}\n", report.discovered_urls.len()));
    out.push_str(&format!("  In scope:           {}\n", report.in_scope_urls.len()));
    out.push_str(&format!("  External:           {}\n", report.external_urls.len()));
    out.push_str(&format!("  API endpoints:      {}\n", report.api_endpoints.len()));
    out.push_str(&format!("  POST requests:      {}\n", report.post_requests.len()));
    out.push_str(&format!("  Scripts:            {}\n", report.scripts.len()));
    out.push_str(&format!("  Stylesheets:        {}\n", report.stylesheets.len()));
    out.push_str(&format!("  Static resources:   {}\n", report.static_resources.len()));
    out.push_str(&format!("  Sensitive findings: {}\n", report.findings.len()));
    out.push_str(&format!(
        "  Requests: {}  Retries: {}  Duplicates: {}  Mean latency: {:.0} ms\n\n",
        metrics.requests,
        metrics.retries,
        metrics.duplicates,
        metrics.latency.mean_ms()
    ));

    section(&mut out, "PAGES");
    for result in &report.results {
        page_section(&mut out, result, colorize);
    }

    if !report.api_endpoints.is_empty() {
        section(&mut out, "API ENDPOINTS");
        for hint in &report.api_endpoints {
            out.push_str(&format!(
                "  {} {}\n",
                hint.method.map(|m| m.as_str()).unwrap_or("ANY"),
                hint.url
            ));
        }
        out.push('\n');
    }

    if !report.post_requests.is_empty() {
        section(&mut out, "POST REQUESTS");
        for post in &report.post_requests {
            let names: Vec<&str> = post.params.keys().map(String::as_str).collect();
            out.push_str(&format!(
                "  {} {} [{}] params: {}\n",
                post.method.as_str(),
                post.url,
                post.content_type,
                names.join(", ")
            ));
        }
        out.push('\n');
    }

    if !report.static_resources.is_empty() {
        section(&mut out, "STATIC RESOURCES");
        for (bucket, urls) in report.static_resources.buckets() {
            push_list(&mut out, bucket, urls);
        }
        out.push('\n');
    }

    if !report.special_links.is_empty() {
        section(&mut out, "SPECIAL LINKS");
        for (kind, links) in report.special_links.groups() {
            push_list(&mut out, kind, links);
        }
        out.push('\n');
    }

    if !report.external_urls.is_empty() {
        section(&mut out, "EXTERNAL URLS");
        for url in &report.external_urls {
            out.push_str(&format!("  {}\n", url));
        }
        out.push('\n');
    }

    out.push_str(HEAVY_RULE);
    out.push_str("\nGenerated by Trawler - web reconnaissance crawler\n");
    out.push_str("For authorized security testing only.\n");
    out
}

/// One URL per line.
pub fn generate_url_list(urls: &[String]) -> String {
    let mut out = String::with_capacity(urls.iter().map(|u| u.len() + 1).sum());
    for url in urls {
        out.push_str(url);
        out.push('\n');
    }
    out
}

pub fn generate_sensitive_text(report: &CrawlReport) -> String {
    let mut out = String::new();
    section(&mut out, "SENSITIVE INFORMATION");
    out.push_str(&format!("Seed:           {}\n", report.seed));
    out.push_str(&format!("Total findings: {}\n\n", report.findings.len()));

    for (idx, finding) in report.findings.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {} {}\n",
            idx + 1,
            severity_label(finding.severity, false),
            finding.rule
        ));
        out.push_str(&format!("URL:      {}\n", finding.url));
        out.push_str(&format!("Match:    {}\n", finding.matched));
        out.push_str(&format!("Context:  {}\n", finding.context));
        if !finding.description.is_empty() {
            out.push_str("Description:\n");
            out.push_str(&wrap_text(&finding.description, 80, "  "));
        }
        out.push_str(LIGHT_RULE);
    }
    out
}

pub fn generate_sensitive_json(report: &CrawlReport) -> Result<String> {
    let by_severity = report.findings_by_severity();
    let json = serde_json::json!({
        "metadata": {
            "generator": "Trawler",
            "version": env!("CARGO_PKG_VERSION"),
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "run_id": report.run_id,
            "seed": report.seed,
            "disclaimer": "For authorized security testing only"
        },
        "summary": {
            "total_findings": report.findings.len(),
            "severity_breakdown": {
                "high": by_severity.get(&Severity::High).copied().unwrap_or(0),
                "medium": by_severity.get(&Severity::Medium).copied().unwrap_or(0),
                "low": by_severity.get(&Severity::Low).copied().unwrap_or(0),
            }
        },
        "findings": report.findings,
    });
    Ok(serde_json::to_string_pretty(&json)?)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_sensitive_csv(findings: &[Finding]) -> String {
    let mut out = String::from("severity,rule,url,match,context,description\n");
    for finding in findings {
        let row = [
            finding.severity.as_str(),
            finding.rule.as_str(),
            finding.url.as_str(),
            finding.matched.as_str(),
            finding.context.as_str(),
            finding.description.as_str(),
        ];
        let fields: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn generate_sensitive_html(report: &CrawlReport) -> String {
    let mut rows = String::new();
    for finding in &report.findings {
        rows.push_str(&format!(
            "      <tr class=\"{}\"><td>{}</td><td>{}</td><td><a href=\"{}\">{}</a></td><td><code>{}</code></td><td><code>{}</code></td></tr>\n",
            finding.severity.as_str().to_ascii_lowercase(),
            finding.severity,
            html_escape(&finding.rule),
            html_escape(&finding.url),
            html_escape(&finding.url),
            html_escape(&finding.matched),
            html_escape(&finding.context),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Trawler sensitive information report</title>
  <style>
    body {{ font-family: sans-serif; margin: 2em; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }}
    tr.high td:first-child {{ color: #b00020; font-weight: bold; }}
    tr.medium td:first-child {{ color: #b26a00; }}
    tr.low td:first-child {{ color: #1565c0; }}
  </style>
</head>
<body>
  <h1>Sensitive information</h1>
  <p>Seed: {seed}<br>Run: {run}<br>Findings: {count}</p>
  <table>
    <thead>
      <tr><th>Severity</th><th>Rule</th><th>URL</th><th>Match</th><th>Context</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
"#,
        seed = html_escape(&report.seed),
        run = html_escape(&report.run_id),
        count = report.findings.len(),
        rows = rows,
    )
}

pub fn generate_sensitive_summary(report: &CrawlReport) -> String {
    let mut out = String::new();
    section(&mut out, "SENSITIVE INFORMATION SUMMARY");
    out.push_str(&format!("Total findings: {}\n\n", report.findings.len()));

    out.push_str("By severity:\n");
    for (severity, count) in report.findings_by_severity() {
        out.push_str(&format!("  {:<8} {}\n", severity.as_str(), count));
    }

    out.push_str("\nBy rule:\n");
    let mut by_rule: Vec<(&str, usize)> = report.findings_by_rule().into_iter().collect();
    by_rule.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (rule, count) in by_rule {
        out.push_str(&format!("  {:<32} {}\n", rule, count));
    }

    let mut pages: Vec<(&str, usize)> = report
        .results
        .iter()
        .filter(|r| !r.findings.is_empty())
        .map(|r| (r.url.as_str(), r.findings.len()))
        .collect();
    if !pages.is_empty() {
        pages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out.push_str("\nPages with findings:\n");
        for (url, count) in pages.iter().take(20) {
            out.push_str(&format!("  {:>4}  {}\n", count, url));
        }
    }
    out
}

pub fn save_report(content: &str, path: &Path) -> Result<()> {
    let write = || -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    };
    write().map_err(|source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the full artifact set into one directory.
#[derive(Debug, Clone)]
pub struct FileReportWriter {
    dir: PathBuf,
}

impl FileReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the files written, in write order.
    pub fn write_all(&self, report: &CrawlReport) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(|source| CoreError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let files = [
            (CRAWL_REPORT_FILE, generate_crawl_report(report, false)),
            (ALL_URLS_FILE, generate_url_list(&report.discovered_urls)),
            (IN_SCOPE_URLS_FILE, generate_url_list(&report.in_scope_urls)),
            (SENSITIVE_TXT_FILE, generate_sensitive_text(report)),
            (SENSITIVE_JSON_FILE, generate_sensitive_json(report)?),
            (SENSITIVE_CSV_FILE, generate_sensitive_csv(&report.findings)),
            (SENSITIVE_HTML_FILE, generate_sensitive_html(report)),
            (SENSITIVE_SUMMARY_FILE, generate_sensitive_summary(report)),
            (RESULTS_JSON_FILE, serde_json::to_string_pretty(report)?),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, content) in files {
            let path = self.dir.join(name);
            save_report(&content, &path)?;
            written.push(path);
        }
        info!("Wrote {} report files to {}", written.len(), self.dir.display());
        Ok(written)
    }
}

impl ReportSink for FileReportWriter {
    fn flush(&self, report: &CrawlReport) -> trawler_scanner::Result<()> {
        self.write_all(report)?;
        Ok(())
    }
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}
