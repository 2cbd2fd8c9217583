use crate::error::Result;
use crate::report::{FileReportWriter, status_label};
use crate::robots::fetch_robots;
use crate::rules::resolve_catalog;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};
use trawler_scanner::config::DEFAULT_USER_AGENT;
use trawler_scanner::result::PageResult;
use trawler_scanner::{CancelToken, CrawlConfig, CrawlReport, Crawler, ResultCallback};
use url::Url;

/// Options for one crawl run
#[derive(Debug)]
pub struct CrawlOptions {
    pub url: String,
    pub config: CrawlConfig,
    /// Extra rule catalog merged over the built-in rules
    pub rules: Option<PathBuf>,
    /// Directory for the report files, nothing is written when unset
    pub output_dir: Option<PathBuf>,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>, config: CrawlConfig) -> Self {
        Self {
            url: url.into(),
            config,
            rules: None,
            output_dir: None,
            show_progress_bars: false,
        }
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Starting crawl...");
    pb
}

/// Execute a crawl with the given options and return its report. When an
/// output directory is set the report files are written before returning.
pub async fn execute_crawl(
    options: CrawlOptions,
    cancel: CancelToken,
    result_callback: Option<ResultCallback>,
) -> Result<CrawlReport> {
    let CrawlOptions {
        url,
        config,
        rules,
        output_dir,
        show_progress_bars,
    } = options;

    let catalog = resolve_catalog(rules.as_deref())?;

    let robots = match Url::parse(&url) {
        Ok(seed) if config.respect_robots => {
            let user_agent = config
                .user_agents
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
            let rules = fetch_robots(&seed, &user_agent, config.request_timeout()).await;
            if rules.is_empty() {
                None
            } else {
                info!("Honouring robots.txt for {}", seed.origin().ascii_serialization());
                Some(rules.into_predicate(seed.origin().ascii_serialization(), user_agent))
            }
        }
        _ => None,
    };

    let progress_bar = show_progress_bars.then(|| Arc::new(spinner()));
    let processed_count = Arc::new(AtomicUsize::new(0));

    let mut crawler = Crawler::new(config)
        .with_rules(catalog)
        .with_cancel_token(cancel);

    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let count = processed_count.clone();
        crawler = crawler.with_progress_callback(Arc::new(move |_worker_id: usize, url: String| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!("Crawling... {} URLs processed ({})", n, extract_url_path(&url)));
            pb.tick();
        }));
    }
    if let Some(callback) = result_callback {
        crawler = crawler.with_result_callback(callback);
    }
    if let Some(predicate) = robots {
        crawler = crawler.with_robots_predicate(predicate);
    }
    if let Some(dir) = output_dir {
        debug!("Reports will be written to {}", dir.display());
        crawler = crawler.with_sink(Arc::new(FileReportWriter::new(dir)));
    }

    let outcome = crawler.crawl(&url).await;

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        match outcome {
            Ok(ref report) => pb.finish_with_message(format!(
                "Crawl {}! {} URLs processed",
                report.termination.as_str(),
                total
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    Ok(outcome?)
}

/// Short terminal listing: totals, then fetched pages grouped by host.
pub fn generate_crawl_summary(report: &CrawlReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("# Summary:\n");
    out.push_str(&format!("  Pages crawled: {}\n", report.results.len()));
    out.push_str(&format!("  URLs discovered: {}\n", report.discovered_urls.len()));
    out.push_str(&format!("  API endpoints: {}\n", report.api_endpoints.len()));
    out.push_str(&format!("  POST requests: {}\n", report.post_requests.len()));
    out.push_str(&format!("  Sensitive findings: {}\n", report.findings.len()));
    out.push_str(&format!("  Stopped: {}\n", report.termination.as_str()));
    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let mut by_host: BTreeMap<String, Vec<&PageResult>> = BTreeMap::new();
    for result in &report.results {
        if let Ok(url) = Url::parse(&result.url)
            && let Some(host) = url.host_str()
        {
            by_host.entry(host.to_string()).or_default().push(result);
        }
    }

    for (host, host_results) in &by_host {
        out.push_str(&format!("## {}\n", host));
        out.push_str(&format!("  {} pages found\n\n", host_results.len()));

        for result in host_results {
            let mut line = format!(
                "  {} {}",
                status_label(result.status_code, true),
                extract_url_path(&result.url)
            );
            if let Some(query) = Url::parse(&result.url).ok().and_then(|u| u.query().map(String::from)) {
                line.push('?');
                line.push_str(&query);
            }
            if let Some(ref content_type) = result.content_type
                && !content_type.starts_with("text/html")
            {
                line.push_str(&format!(" {}", content_type));
            }
            if !result.findings.is_empty() {
                line.push_str(&format!(" [{} findings]", result.findings.len()));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url_path() {
        assert_eq!(extract_url_path("http://e.test"), "/");
        assert_eq!(extract_url_path("http://e.test/a/b?x=1"), "/a/b");
        assert_eq!(extract_url_path("not a url"), "not a url");
    }
}
