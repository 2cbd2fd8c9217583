use crate::error::{Result, ScanError};
use crate::frontier::Discipline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Trawler/0.1 (https://github.com/trapdoorsec/trawler)";

/// How pages are rendered before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Static,
    Dynamic,
    Smart,
}

impl Mode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "static" => Some(Mode::Static),
            "dynamic" => Some(Mode::Dynamic),
            "smart" => Some(Mode::Smart),
            _ => None,
        }
    }

    pub fn uses_browser(&self) -> bool {
        !matches!(self, Mode::Static)
    }
}

/// Everything a crawl run needs. Deserializes from a JSON config file with
/// every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub mode: Mode,
    pub discipline: Discipline,
    pub max_depth: usize,
    pub max_pages: usize,
    pub workers: usize,
    pub request_timeout_secs: u64,
    pub run_timeout_secs: Option<u64>,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    pub scan_body_bytes: usize,
    pub frontier_capacity: usize,
    pub host_delay_ms: u64,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
    pub user_agents: Vec<String>,
    pub proxies: Vec<String>,
    pub cookie: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub respect_robots: bool,
    pub allow_subdomains: bool,
    pub fuzz: bool,
    pub fuzz_post: bool,
    pub fuzz_params: Vec<String>,
    pub param_fuzz_limit: usize,
    pub post_param_fuzz_limit: usize,
    /// Cap for URLs sharing an id-wildcarded pattern key. `None` is unlimited.
    pub pattern_cap: Option<usize>,
    pub file_param_cap: Option<usize>,
    pub chrome_path: Option<PathBuf>,
    pub dynamic_workers: usize,
    pub render_timeout_secs: u64,
    pub max_events: usize,
    pub context_bytes: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Static,
            discipline: Discipline::Bfs,
            max_depth: 3,
            max_pages: 1000,
            workers: 10,
            request_timeout_secs: 10,
            run_timeout_secs: None,
            max_redirects: 10,
            max_body_bytes: 5 * 1024 * 1024,
            scan_body_bytes: 2 * 1024 * 1024,
            frontier_capacity: 10_000,
            host_delay_ms: 0,
            retry_attempts: 3,
            retry_base_ms: 500,
            user_agents: vec![DEFAULT_USER_AGENT.to_string()],
            proxies: Vec::new(),
            cookie: None,
            headers: BTreeMap::new(),
            respect_robots: true,
            allow_subdomains: false,
            fuzz: false,
            fuzz_post: true,
            fuzz_params: Vec::new(),
            param_fuzz_limit: 8,
            post_param_fuzz_limit: 4,
            pattern_cap: None,
            file_param_cap: Some(1),
            chrome_path: None,
            dynamic_workers: 1,
            render_timeout_secs: 30,
            max_events: 20,
            context_bytes: 40,
        }
    }
}

impl CrawlConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScanError::ConfigInvalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ScanError::ConfigInvalid("workers must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(ScanError::ConfigInvalid("max_pages must be at least 1".into()));
        }
        if self.frontier_capacity == 0 {
            return Err(ScanError::ConfigInvalid(
                "frontier_capacity must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ScanError::ConfigInvalid("timeout must be at least 1 second".into()));
        }
        if self.retry_attempts == 0 {
            return Err(ScanError::ConfigInvalid("retry_attempts must be at least 1".into()));
        }
        if self.pattern_cap == Some(0) || self.file_param_cap == Some(0) {
            return Err(ScanError::ConfigInvalid("pattern caps must be at least 1".into()));
        }
        for proxy in &self.proxies {
            url::Url::parse(proxy)
                .map_err(|e| ScanError::ConfigInvalid(format!("invalid proxy {}: {}", proxy, e)))?;
        }
        for (name, value) in &self.headers {
            reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ScanError::ConfigInvalid(format!("invalid header name: {}", name)))?;
            reqwest::header::HeaderValue::from_str(value).map_err(|_| {
                ScanError::ConfigInvalid(format!("invalid value for header {}", name))
            })?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    pub fn host_delay(&self) -> Duration {
        Duration::from_millis(self.host_delay_ms)
    }

    /// Browser permits, never more than the worker count.
    pub fn browser_permits(&self) -> usize {
        self.dynamic_workers.clamp(1, self.workers.max(1))
    }

    /// Outbound result channel bound.
    pub fn result_channel_capacity(&self) -> usize {
        self.workers.max(1) * 4
    }
}
