use crate::backoff::ExponentialBackoff;
use crate::cancel::CancelToken;
use crate::canon::{Scope, canonicalize};
use crate::config::{CrawlConfig, DEFAULT_USER_AGENT};
use crate::error::{Result, ScanError};
use crate::item::{HttpMethod, WorkItem};
use crate::metrics::CrawlMetrics;
use crate::pacing::HostPacer;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderName, HeaderValue, LOCATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// A completed HTTP exchange, after redirects.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: u16,
    pub content_type: Option<String>,
    pub final_url: Url,
    /// Absolute `Location` targets in the order they were followed.
    pub redirect_chain: Vec<String>,
    pub body: String,
    /// Bytes read, after truncation.
    pub body_size: usize,
    pub truncated: bool,
    pub elapsed: Duration,
    /// Redirect target that left scope and was not followed.
    pub left_scope: Option<String>,
}

impl FetchOutcome {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            })
            .unwrap_or(false)
    }
}

/// Result of `Fetcher::fetch` together with how many attempts it took.
#[derive(Debug)]
pub struct Fetched {
    pub outcome: Result<FetchOutcome>,
    pub attempts: u32,
}

pub struct Fetcher {
    clients: Vec<Client>,
    next_client: AtomicUsize,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
    cookie: Option<String>,
    headers: BTreeMap<String, String>,
    max_redirects: usize,
    max_body_bytes: usize,
    timeout: Duration,
    backoff: ExponentialBackoff,
    pacer: HostPacer,
    metrics: Arc<CrawlMetrics>,
}

fn build_client(timeout: Duration, proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout / 2)
        .pool_max_idle_per_host(50)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .cookie_store(true)
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none());

    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ScanError::ConfigInvalid(format!("invalid proxy {}: {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ScanError::ConfigInvalid(format!("failed to build HTTP client: {}", e)))
}

impl Fetcher {
    pub fn new(config: &CrawlConfig, metrics: Arc<CrawlMetrics>) -> Result<Self> {
        let timeout = config.request_timeout();
        let clients = if config.proxies.is_empty() {
            vec![build_client(timeout, None)?]
        } else {
            config
                .proxies
                .iter()
                .map(|p| build_client(timeout, Some(p)))
                .collect::<Result<Vec<_>>>()?
        };

        let user_agents = if config.user_agents.is_empty() {
            vec![DEFAULT_USER_AGENT.to_string()]
        } else {
            config.user_agents.clone()
        };

        Ok(Self {
            clients,
            next_client: AtomicUsize::new(0),
            user_agents,
            next_agent: AtomicUsize::new(0),
            cookie: config.cookie.clone(),
            headers: config.headers.clone(),
            max_redirects: config.max_redirects,
            max_body_bytes: config.max_body_bytes,
            timeout,
            backoff: ExponentialBackoff::new(config.retry_base_ms, config.retry_attempts),
            pacer: HostPacer::new(config.host_delay()),
            metrics,
        })
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn client(&self) -> &Client {
        let idx = self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[idx]
    }

    fn user_agent(&self) -> &str {
        let idx = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[idx]
    }

    fn map_error(&self, e: reqwest::Error) -> ScanError {
        if e.is_timeout() {
            ScanError::FetchTimeout(self.timeout.as_millis() as u64)
        } else {
            ScanError::FetchTransport(e)
        }
    }

    /// Fetches `item`, retrying idempotent requests on 5xx, timeouts and
    /// transport errors.
    pub async fn fetch(&self, item: &WorkItem, scope: &Scope, cancel: &CancelToken) -> Fetched {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(ScanError::Cancelled),
                r = self.fetch_once(item, scope) => r,
            };

            let retry = item.may_retry() && self.backoff.should_retry(attempts);
            match result {
                Ok(outcome) if outcome.status >= 500 && retry => {
                    debug!("{} returned {}, retrying", item.url, outcome.status);
                }
                Err(e) if e.is_retryable() && retry => {
                    debug!("{} failed ({}), retrying", item.url, e);
                }
                outcome => return Fetched { outcome, attempts },
            }

            self.metrics.retries.inc();
            let delay = self.backoff.delay(attempts - 1);
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Fetched { outcome: Err(ScanError::Cancelled), attempts };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn fetch_once(&self, item: &WorkItem, scope: &Scope) -> Result<FetchOutcome> {
        let start = Instant::now();
        let client = self.client();
        let mut url = item
            .url
            .url()
            .ok_or_else(|| ScanError::Other(format!("unparseable canonical URL {}", item.url)))?;
        let mut method: Method = item.method.into();
        let mut body = item.body.clone();
        let mut redirect_chain = Vec::new();

        loop {
            self.pacer.wait(&url.origin().ascii_serialization()).await;
            self.metrics.requests.inc();
            debug!("{} {}", method, url);

            let mut request = client
                .request(method.clone(), url.clone())
                .header(USER_AGENT, self.user_agent());
            if let Some(cookie) = &self.cookie {
                request = request.header(COOKIE, cookie.as_str());
            }
            for (name, value) in self.headers.iter().chain(item.headers.iter()) {
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(value)) => request = request.header(name, value),
                    _ => warn!("Skipping invalid header {}", name),
                }
            }
            if let Some(template) = &body {
                request = request
                    .header(CONTENT_TYPE, template.content_type.as_str())
                    .body(template.body.clone());
            }

            let response = request.send().await.map_err(|e| self.map_error(e))?;
            let status = response.status();
            self.metrics.record_status(status.as_u16());

            let location = status
                .is_redirection()
                .then(|| response.headers().get(LOCATION))
                .flatten()
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| url.join(loc).ok());

            if let Some(next) = location {
                if redirect_chain.len() >= self.max_redirects {
                    debug!("Redirect cap reached at {}", url);
                    return self.finish(response, url, redirect_chain, None, start).await;
                }
                redirect_chain.push(next.to_string());

                let in_scope = canonicalize(next.as_str(), None)
                    .map(|rec| scope.contains(&rec))
                    .unwrap_or(false);
                if !in_scope {
                    debug!("Redirect from {} leaves scope: {}", url, next);
                    let left = Some(next.to_string());
                    return self.finish(response, url, redirect_chain, left, start).await;
                }

                if status == StatusCode::SEE_OTHER
                    || (method == Method::POST
                        && matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND))
                {
                    method = HttpMethod::Get.into();
                    body = None;
                }
                url = next;
                continue;
            }

            return self.finish(response, url, redirect_chain, None, start).await;
        }
    }

    async fn finish(
        &self,
        response: Response,
        final_url: Url,
        redirect_chain: Vec<String>,
        left_scope: Option<String>,
        start: Instant,
    ) -> Result<FetchOutcome> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let (bytes, truncated) = self.read_capped(response).await?;
        let elapsed = start.elapsed();

        self.metrics.record_latency(elapsed);
        self.metrics.bytes.add(bytes.len() as u64);
        if truncated {
            self.metrics.truncated.inc();
            debug!("Body of {} truncated at {} bytes", final_url, self.max_body_bytes);
        }

        Ok(FetchOutcome {
            status,
            content_type,
            final_url,
            redirect_chain,
            body_size: bytes.len(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
            truncated,
            elapsed,
            left_scope,
        })
    }

    async fn read_capped(&self, mut response: Response) -> Result<(Vec<u8>, bool)> {
        let mut buf = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_error(e))? {
            let room = self.max_body_bytes.saturating_sub(buf.len());
            if chunk.len() > room {
                buf.extend_from_slice(&chunk[..room]);
                return Ok((buf, true));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok((buf, false))
    }
}
