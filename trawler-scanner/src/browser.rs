use crate::cancel::CancelToken;
use crate::config::Mode;
use crate::error::{Result, ScanError};
use crate::extract::Extraction;
use crate::item::HttpMethod;
use crate::result::{ApiHint, HintSource, PostDescriptor};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// One request observed while rendering a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub resource_type: String,
}

impl TranscriptEntry {
    pub fn is_api_call(&self) -> bool {
        matches!(self.resource_type.as_str(), "xhr" | "fetch" | "xmlhttprequest")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub final_url: String,
    pub dom: String,
    pub transcript: Vec<TranscriptEntry>,
}

/// Process-level control surface for a headless browser.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn render(&self, url: &str, cancel: &CancelToken, timeout: Duration) -> Result<RenderOutput>;
}

/// Wraps fetch and XMLHttpRequest so calls made after load are recorded.
const HOOK_JS: &str = r#"
(function() {
    if (window.__trawler) { return true; }
    var state = { requests: [], pending: 0 };
    window.__trawler = state;

    var origFetch = window.fetch;
    if (origFetch) {
        window.fetch = function(input, init) {
            init = init || {};
            var url = (typeof input === 'string') ? input : (input && input.url) || '';
            var entry = {
                method: (init.method || (input && input.method) || 'GET').toUpperCase(),
                url: new URL(url, location.href).href,
                request_headers: {},
                request_body: typeof init.body === 'string' ? init.body : null,
                status: null,
                resource_type: 'fetch'
            };
            if (init.headers && typeof init.headers === 'object' && !(init.headers instanceof Headers)) {
                Object.keys(init.headers).forEach(function(k) { entry.request_headers[k] = String(init.headers[k]); });
            }
            state.requests.push(entry);
            state.pending++;
            return origFetch.apply(this, arguments).then(function(resp) {
                entry.status = resp.status; state.pending--; return resp;
            }, function(err) { state.pending--; throw err; });
        };
    }

    var origOpen = XMLHttpRequest.prototype.open;
    var origSend = XMLHttpRequest.prototype.send;
    var origSetHeader = XMLHttpRequest.prototype.setRequestHeader;
    XMLHttpRequest.prototype.open = function(method, url) {
        this.__trawler = {
            method: String(method || 'GET').toUpperCase(),
            url: new URL(url, location.href).href,
            request_headers: {},
            request_body: null,
            status: null,
            resource_type: 'xhr'
        };
        return origOpen.apply(this, arguments);
    };
    XMLHttpRequest.prototype.setRequestHeader = function(k, v) {
        if (this.__trawler) { this.__trawler.request_headers[k] = String(v); }
        return origSetHeader.apply(this, arguments);
    };
    XMLHttpRequest.prototype.send = function(body) {
        var entry = this.__trawler;
        if (entry) {
            entry.request_body = typeof body === 'string' ? body : null;
            state.requests.push(entry);
            state.pending++;
            this.addEventListener('loadend', function() {
                entry.status = this.status; state.pending--;
            });
        }
        return origSend.apply(this, arguments);
    };
    return true;
})()
"#;

/// Fires hover and click on up to `max` interactive elements. Navigation and
/// native form submission are suppressed so the page stays put.
fn events_js(max: usize) -> String {
    format!(
        r#"
(function() {{
    document.addEventListener('click', function(e) {{
        var a = e.target && e.target.closest ? e.target.closest('a[href]') : null;
        if (a) {{ e.preventDefault(); }}
    }}, true);
    document.addEventListener('submit', function(e) {{ e.preventDefault(); }}, true);
    var els = Array.prototype.slice.call(document.querySelectorAll(
        'button, a[href], [onclick], [onmouseover], [role=button], input[type=submit], input[type=button], form'
    )).slice(0, {max});
    var fired = 0;
    els.forEach(function(el) {{
        try {{
            if (el.tagName === 'FORM') {{
                el.dispatchEvent(new Event('submit', {{ bubbles: true, cancelable: true }}));
            }} else {{
                el.dispatchEvent(new MouseEvent('mouseover', {{ bubbles: true }}));
                el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true }}));
            }}
            fired++;
        }} catch (err) {{}}
    }});
    return fired;
}})()
"#
    )
}

const PENDING_JS: &str = "window.__trawler ? window.__trawler.pending : 0";

const COLLECT_JS: &str = r#"
(function() {
    var state = window.__trawler || { requests: [] };
    var seen = {};
    state.requests.forEach(function(r) { seen[r.url] = true; });
    var resources = performance.getEntriesByType('resource')
        .filter(function(e) { return !seen[e.name]; })
        .map(function(e) {
            return { method: 'GET', url: e.name, request_headers: {}, request_body: null,
                     status: e.responseStatus || null, resource_type: e.initiatorType || 'other' };
        });
    return JSON.stringify({
        final_url: location.href,
        dom: document.documentElement ? document.documentElement.outerHTML : '',
        transcript: state.requests.concat(resources)
    });
})()
"#;

#[derive(Deserialize)]
struct Collected {
    final_url: String,
    dom: String,
    transcript: Vec<TranscriptEntry>,
}

fn browser_err(e: impl std::fmt::Display) -> ScanError {
    ScanError::BrowserUnavailable(e.to_string())
}

/// Drives a local Chrome or Chromium through the DevTools protocol.
pub struct ChromeDriver {
    browser: Browser,
    max_events: usize,
}

impl ChromeDriver {
    /// Launches the browser. `path` of `None` lets headless_chrome locate one.
    pub async fn launch(path: Option<PathBuf>, idle_timeout: Duration, max_events: usize) -> Result<Self> {
        let browser = tokio::task::spawn_blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .path(path)
                .idle_browser_timeout(idle_timeout)
                .window_size(Some((1366, 768)))
                .build()
                .map_err(browser_err)?;
            Browser::new(options).map_err(browser_err)
        })
        .await??;

        info!("Headless browser launched");
        Ok(Self { browser, max_events })
    }

    fn render_sync(browser: &Browser, url: &str, timeout: Duration, max_events: usize) -> Result<RenderOutput> {
        let deadline = Instant::now() + timeout;
        let tab = browser.new_tab().map_err(browser_err)?;
        tab.set_default_timeout(timeout);

        let output = Self::drive_tab(&tab, url, deadline, max_events);
        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab for {}: {}", url, e);
        }
        output
    }

    fn drive_tab(tab: &Arc<Tab>, url: &str, deadline: Instant, max_events: usize) -> Result<RenderOutput> {
        tab.navigate_to(url).map_err(browser_err)?;
        tab.wait_until_navigated().map_err(browser_err)?;

        tab.evaluate(HOOK_JS, false).map_err(browser_err)?;
        if max_events > 0 {
            let fired = tab.evaluate(&events_js(max_events), false).map_err(browser_err)?;
            debug!("Fired events on {:?} elements of {}", fired.value, url);
        }
        Self::wait_for_idle(tab, deadline);

        let collected = tab.evaluate(COLLECT_JS, false).map_err(browser_err)?;
        let json = collected
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScanError::ExtractParse("empty DOM snapshot".to_string()))?;
        let collected: Collected = serde_json::from_str(json)?;

        Ok(RenderOutput {
            final_url: collected.final_url,
            dom: collected.dom,
            transcript: collected.transcript,
        })
    }

    /// Polls the hook's in-flight counter until it stays at zero for a short
    /// quiet period, or the deadline passes.
    fn wait_for_idle(tab: &Arc<Tab>, deadline: Instant) {
        const QUIET: Duration = Duration::from_millis(500);
        const POLL: Duration = Duration::from_millis(100);
        let mut quiet_since: Option<Instant> = None;

        while Instant::now() < deadline {
            let pending = tab
                .evaluate(PENDING_JS, false)
                .ok()
                .and_then(|r| r.value)
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            if pending == 0 {
                let since = *quiet_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= QUIET {
                    return;
                }
            } else {
                quiet_since = None;
            }
            std::thread::sleep(POLL);
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn render(&self, url: &str, cancel: &CancelToken, timeout: Duration) -> Result<RenderOutput> {
        let browser = self.browser.clone();
        let url_owned = url.to_string();
        let max_events = self.max_events;
        let task = tokio::task::spawn_blocking(move || {
            Self::render_sync(&browser, &url_owned, timeout, max_events)
        });

        tokio::select! {
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            joined = tokio::time::timeout(timeout + Duration::from_secs(5), task) => match joined {
                Ok(result) => result?,
                Err(_) => Err(ScanError::BrowserUnavailable(format!("render of {} timed out", url))),
            },
        }
    }
}

/// Decides which pages get rendered and bounds concurrent renders.
pub struct DynamicExtractor {
    driver: Arc<dyn BrowserDriver>,
    permits: Semaphore,
    mode: Mode,
    timeout: Duration,
}

impl DynamicExtractor {
    pub fn new(driver: Arc<dyn BrowserDriver>, mode: Mode, permits: usize, timeout: Duration) -> Self {
        Self {
            driver,
            permits: Semaphore::new(permits.max(1)),
            mode,
            timeout,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether a fetched HTML page should go through the browser.
    pub fn should_render(&self, is_html: bool, body: &str, static_view: &Extraction) -> bool {
        if !is_html {
            return false;
        }
        match self.mode {
            Mode::Static => false,
            Mode::Dynamic => true,
            Mode::Smart => looks_script_driven(body, static_view),
        }
    }

    pub async fn render(&self, url: &str, cancel: &CancelToken) -> Result<RenderOutput> {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            permit = self.permits.acquire() => permit.map_err(|e| ScanError::Other(e.to_string()))?,
        };
        debug!("Rendering {}", url);
        self.driver.render(url, cancel, self.timeout).await
    }
}

const SPA_MARKERS: &[&str] = &[
    "id=\"root\"",
    "id=\"app\"",
    "id='root'",
    "id='app'",
    "ng-app",
    "ng-version",
    "data-reactroot",
    "__next_data__",
    "__nuxt__",
    "data-v-app",
    "<app-root",
    "data-server-rendered",
];

/// SPA mount points, framework markers, or lots of scripts with few links.
pub fn looks_script_driven(body: &str, static_view: &Extraction) -> bool {
    let lower = body.to_ascii_lowercase();
    if SPA_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    static_view.scripts.len() >= 5 && static_view.links.len() < 3
}

fn body_params(body: &str) -> BTreeMap<String, String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        return map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
    }
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

/// Folds a network transcript into an extraction: API calls become hints, and
/// state-changing calls become POST descriptors.
pub fn merge_transcript(out: &mut Extraction, transcript: &[TranscriptEntry]) {
    for entry in transcript {
        if !entry.is_api_call() {
            continue;
        }
        let Ok(record) = crate::canon::canonicalize(&entry.url, None) else {
            warn!("Unusable transcript URL {}", entry.url);
            continue;
        };
        let method = HttpMethod::parse(&entry.method);
        out.add_api_hint(ApiHint {
            url: record.canonical.clone(),
            method,
            source: HintSource::Network,
        });

        if let Some(method) = method
            && method != HttpMethod::Get
            && method != HttpMethod::Head
            && method != HttpMethod::Options
        {
            let content_type = entry
                .request_headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "application/x-www-form-urlencoded".to_string());
            out.add_post(PostDescriptor {
                url: record.canonical,
                method,
                params: entry.request_body.as_deref().map(body_params).unwrap_or_default(),
                content_type,
            });
        }
    }
}
