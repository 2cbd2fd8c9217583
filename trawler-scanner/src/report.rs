use crate::error::Result;
use crate::frontier::FrontierStats;
use crate::metrics::MetricsSnapshot;
use crate::result::{ApiHint, FetchState, PageResult, PostDescriptor, SpecialLinks, StaticResources};
use crate::sensitive::{Finding, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Frontier drained and no work in flight.
    Completed,
    MaxPages,
    Cancelled,
    RunTimeout,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::MaxPages => "max-pages",
            Termination::Cancelled => "cancelled",
            Termination::RunTimeout => "run-timeout",
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Termination::Cancelled | Termination::RunTimeout)
    }
}

/// Everything a finished run produced. List fields are sorted and free of
/// duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub run_id: String,
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: Termination,
    pub results: Vec<PageResult>,
    pub discovered_urls: Vec<String>,
    pub in_scope_urls: Vec<String>,
    pub external_urls: Vec<String>,
    pub static_resources: StaticResources,
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
    pub special_links: SpecialLinks,
    pub api_endpoints: Vec<ApiHint>,
    pub post_requests: Vec<PostDescriptor>,
    pub findings: Vec<Finding>,
    pub metrics: MetricsSnapshot,
    pub frontier: FrontierStats,
}

impl CrawlReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn result_for(&self, url: &str) -> Option<&PageResult> {
        self.results.iter().find(|r| r.url == url)
    }

    /// URLs that produced a stored result, in report order.
    pub fn fetched_urls(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.url.as_str()).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.state == FetchState::Failed)
            .count()
    }

    pub fn findings_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn findings_by_rule(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.rule.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Receives the finished report. Sinks run in registration order after the
/// workers have stopped.
pub trait ReportSink: Send + Sync {
    fn flush(&self, report: &CrawlReport) -> Result<()>;
}
