use crate::browser::{BrowserDriver, ChromeDriver, DynamicExtractor, merge_transcript};
use crate::cancel::CancelToken;
use crate::canon::{
    CanonReject, ResourceBucket, Scope, UrlClass, UrlRecord, canonicalize, path_extension,
};
use crate::config::CrawlConfig;
use crate::dedup::{Deduplicator, Mark, PatternCaps};
use crate::error::{Result, ScanError};
use crate::extract::StaticExtractor;
use crate::fetch::Fetcher;
use crate::frontier::{Frontier, PushError};
use crate::fuzzer::ParamFuzzer;
use crate::item::{HttpMethod, ItemOrigin, WorkItem};
use crate::metrics::CrawlMetrics;
use crate::report::{CrawlReport, ReportSink, Termination};
use crate::result::{
    ApiHint, FetchState, FormDescriptor, PageResult, PostDescriptor, SpecialLinks, StaticResources,
};
use crate::sensitive::{Finding, RuleCatalog, SensitiveScanner};
use chrono::Utc;
use futures::FutureExt;
use std::collections::{BTreeSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(&PageResult) + Send + Sync>;
/// Returns `false` for URLs robots.txt disallows.
pub type RobotsPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

const PAGE_LIMIT_REACHED: &str = "page limit reached";

pub struct Crawler {
    config: CrawlConfig,
    rules: Option<RuleCatalog>,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
    robots: Option<RobotsPredicate>,
    driver: Option<Arc<dyn BrowserDriver>>,
    sinks: Vec<Arc<dyn ReportSink>>,
    cancel: CancelToken,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            rules: None,
            progress_callback: None,
            result_callback: None,
            robots: None,
            driver: None,
            sinks: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the built-in rule catalog.
    pub fn with_rules(mut self, catalog: RuleCatalog) -> Self {
        self.rules = Some(catalog);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn with_robots_predicate(mut self, predicate: RobotsPredicate) -> Self {
        self.robots = Some(predicate);
        self
    }

    /// Uses `driver` instead of launching Chrome in dynamic and smart modes.
    pub fn with_browser_driver(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs one crawl from `seed` until the frontier drains, the page limit is
    /// hit, the run timeout passes or the cancel token fires. Partial runs
    /// still produce a report and still flush the sinks.
    pub async fn crawl(&self, seed: &str) -> Result<CrawlReport> {
        let config = &self.config;
        config.validate()?;
        let seed_record = canonicalize(seed, None)?;
        let started_at = Utc::now();
        info!(
            "Starting crawl of {} with {} workers ({:?} mode)",
            seed_record, config.workers, config.mode
        );

        let metrics = Arc::new(CrawlMetrics::new());
        let scope = Scope::new(&seed_record, config.allow_subdomains);
        let frontier = Arc::new(Frontier::new(config.frontier_capacity, config.discipline));
        let fetcher = Arc::new(Fetcher::new(config, metrics.clone())?);
        let extractor = Arc::new(StaticExtractor::new()?);
        let dynamic = self.dynamic_extractor().await;

        let catalog = match &self.rules {
            Some(catalog) => catalog.clone(),
            None => RuleCatalog::builtin()?,
        };
        let scanner = SensitiveScanner::from_catalog(&catalog)
            .with_context_bytes(config.context_bytes)
            .with_max_scan_bytes(config.scan_body_bytes);
        debug!("Loaded {} sensitive rules", scanner.rule_count());

        let fuzzer = config.fuzz.then(|| {
            ParamFuzzer::new(config.fuzz_params.clone())
                .with_limits(config.param_fuzz_limit, config.post_param_fuzz_limit)
                .with_post(config.fuzz_post)
        });

        let worker_cancel = CancelToken::new();
        let pages = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(config.result_channel_capacity());

        let context = WorkerContext {
            fetcher,
            extractor,
            dynamic,
            frontier: frontier.clone(),
            metrics: metrics.clone(),
            scope: scope.clone(),
            pages: pages.clone(),
            max_pages: config.max_pages,
            progress: self.progress_callback.clone(),
            cancel: worker_cancel.clone(),
            tx,
        };
        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            handles.push(tokio::spawn(context.clone().run(worker_id)));
        }
        drop(context);

        let mut coordinator = Coordinator {
            config,
            scope,
            frontier: frontier.clone(),
            dedup: Deduplicator::new(PatternCaps {
                id_pattern: config.pattern_cap,
                file_param: config.file_param_cap,
            }),
            scanner,
            fuzzer,
            metrics: metrics.clone(),
            robots: self.robots.clone(),
            result_callback: self.result_callback.clone(),
            pages,
            cancel: self.cancel.clone(),
            deadline: config.run_timeout().map(|t| Instant::now() + t),
            outstanding: 0,
            backlog: VecDeque::new(),
            limit_hit: false,
            termination: Termination::Completed,
            results: Vec::new(),
            all_urls: BTreeSet::new(),
            in_scope: BTreeSet::new(),
            external: BTreeSet::new(),
            static_resources: StaticResources::default(),
            stylesheets: BTreeSet::new(),
            special_links: SpecialLinks::default(),
            findings: Vec::new(),
        };
        coordinator.seed(seed_record);
        let termination = coordinator.drive(&mut rx).await;

        frontier.close();
        if termination.is_partial() {
            worker_cancel.cancel();
        }
        coordinator.drain(&mut rx).await;
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker task failed: {}", e);
            }
        }

        let report = coordinator.into_report(seed, started_at, termination);
        info!(
            "Crawl {} ({}). Fetched {} pages, {} findings",
            report.run_id,
            termination.as_str(),
            report.results.len(),
            report.findings.len()
        );

        for sink in &self.sinks {
            sink.flush(&report)?;
        }
        Ok(report)
    }

    async fn dynamic_extractor(&self) -> Option<Arc<DynamicExtractor>> {
        let config = &self.config;
        if !config.mode.uses_browser() {
            return None;
        }
        let driver: Arc<dyn BrowserDriver> = match &self.driver {
            Some(driver) => driver.clone(),
            None => match ChromeDriver::launch(
                config.chrome_path.clone(),
                config.render_timeout() * 4,
                config.max_events,
            )
            .await
            {
                Ok(driver) => Arc::new(driver),
                Err(e) => {
                    warn!("{}; continuing with static extraction only", e);
                    return None;
                }
            },
        };
        Some(Arc::new(DynamicExtractor::new(
            driver,
            config.mode,
            config.browser_permits(),
            config.render_timeout(),
        )))
    }
}

/// What a worker hands back for every item it leased.
struct WorkerOutcome {
    item: WorkItem,
    result: PageResult,
    /// Response text for the sensitive scanner.
    body: Option<String>,
}

#[derive(Clone)]
struct WorkerContext {
    fetcher: Arc<Fetcher>,
    extractor: Arc<StaticExtractor>,
    dynamic: Option<Arc<DynamicExtractor>>,
    frontier: Arc<Frontier>,
    metrics: Arc<CrawlMetrics>,
    scope: Scope,
    pages: Arc<AtomicUsize>,
    max_pages: usize,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
    tx: mpsc::Sender<WorkerOutcome>,
}

impl WorkerContext {
    async fn run(self, worker_id: usize) {
        debug!("Worker {} started", worker_id);
        loop {
            let leased = tokio::select! {
                _ = self.cancel.cancelled() => None,
                item = self.frontier.lease() => item,
            };
            let Some(item) = leased else {
                break;
            };

            let outcome = if !self.reserve_page() {
                WorkerOutcome {
                    result: PageResult::with_error(
                        &item,
                        FetchState::Dropped,
                        PAGE_LIMIT_REACHED.to_string(),
                    ),
                    item,
                    body: None,
                }
            } else {
                if let Some(ref callback) = self.progress {
                    callback(worker_id, item.url.canonical.clone());
                }
                match AssertUnwindSafe(self.process(&item)).catch_unwind().await {
                    Ok((result, body)) => WorkerOutcome { item, result, body },
                    Err(_) => {
                        warn!("[Worker {}] panicked while processing {}", worker_id, item.url);
                        self.metrics.failures.inc();
                        WorkerOutcome {
                            result: PageResult::with_error(
                                &item,
                                FetchState::Failed,
                                "worker panicked".to_string(),
                            ),
                            item,
                            body: None,
                        }
                    }
                }
            };

            self.frontier.finish(outcome.result.state);
            if self.tx.send(outcome).await.is_err() {
                break;
            }
        }
        debug!("Worker {} finished", worker_id);
    }

    fn reserve_page(&self) -> bool {
        self.pages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_pages).then_some(n + 1)
            })
            .is_ok()
    }

    async fn process(&self, item: &WorkItem) -> (PageResult, Option<String>) {
        let fetched = self.fetcher.fetch(item, &self.scope, &self.cancel).await;
        let mut result = PageResult::new(item);
        result.attempts = fetched.attempts;

        let outcome = match fetched.outcome {
            Ok(outcome) => outcome,
            Err(ScanError::Cancelled) => {
                result.state = FetchState::Dropped;
                result.error = Some(ScanError::Cancelled.to_string());
                return (result, None);
            }
            Err(e) => {
                debug!("Fetch failed for {}: {}", item.url, e);
                self.metrics.failures.inc();
                result.state = FetchState::Failed;
                if let ScanError::FetchHttp(status) = &e {
                    result.status_code = *status;
                }
                result.error = Some(e.to_string());
                return (result, None);
            }
        };

        result.status_code = outcome.status;
        result.content_type = outcome.content_type.clone();
        result.final_url = outcome.final_url.to_string();
        result.redirect_chain = outcome.redirect_chain.clone();
        result.body_size = outcome.body_size;
        result.truncated = outcome.truncated;
        result.response_time = outcome.elapsed;
        if let Some(target) = &outcome.left_scope {
            debug!("{} redirected out of scope to {}", item.url, target);
        }

        if outcome.status >= 500 {
            self.metrics.failures.inc();
            result.state = FetchState::Failed;
            result.error = Some(ScanError::FetchHttp(outcome.status).to_string());
            return (result, Some(outcome.body));
        }
        if outcome.status >= 400 {
            return (result, Some(outcome.body));
        }
        self.metrics.successes.inc();

        let is_html = outcome.is_html();
        let mut extraction = self.extractor.extract(
            &outcome.body,
            outcome.content_type.as_deref(),
            &outcome.final_url,
            &outcome.redirect_chain,
        );
        let mut scan_body = outcome.body;

        if let Some(dynamic) = &self.dynamic
            && dynamic.should_render(is_html, &scan_body, &extraction)
        {
            self.metrics.renders.inc();
            match dynamic.render(&result.final_url, &self.cancel).await {
                Ok(render) => {
                    let base = Url::parse(&render.final_url)
                        .unwrap_or_else(|_| outcome.final_url.clone());
                    let mut rendered =
                        self.extractor
                            .extract(&render.dom, Some("text/html"), &base, &[]);
                    merge_transcript(&mut rendered, &render.transcript);
                    extraction.merge(rendered);
                    result.rendered = true;
                    scan_body.push('\n');
                    scan_body.push_str(&render.dom);
                }
                Err(ScanError::Cancelled) => {}
                Err(e) => {
                    warn!("Render failed for {}: {}", item.url, e);
                    self.metrics.render_failures.inc();
                    result.error = Some(format!("render failed: {}", e));
                }
            }
        }

        extraction.apply_to(&mut result);
        (result, Some(scan_body))
    }
}

enum Wait {
    Interrupted(Termination),
    SlotFreed,
    Outcome(Option<WorkerOutcome>),
}

/// Single owner of the dedup set, the discovery sets and the stored results.
/// Workers only talk to it through the outcome channel.
struct Coordinator<'a> {
    config: &'a CrawlConfig,
    scope: Scope,
    frontier: Arc<Frontier>,
    dedup: Deduplicator,
    scanner: SensitiveScanner,
    fuzzer: Option<ParamFuzzer>,
    metrics: Arc<CrawlMetrics>,
    robots: Option<RobotsPredicate>,
    result_callback: Option<ResultCallback>,
    pages: Arc<AtomicUsize>,
    cancel: CancelToken,
    deadline: Option<Instant>,
    /// Items pushed to the frontier that have not come back as outcomes.
    outstanding: usize,
    backlog: VecDeque<WorkerOutcome>,
    limit_hit: bool,
    termination: Termination,
    results: Vec<PageResult>,
    all_urls: BTreeSet<String>,
    in_scope: BTreeSet<String>,
    external: BTreeSet<String>,
    static_resources: StaticResources,
    stylesheets: BTreeSet<String>,
    special_links: SpecialLinks,
    findings: Vec<Finding>,
}

impl Coordinator<'_> {
    fn seed(&mut self, record: UrlRecord) {
        self.all_urls.insert(record.canonical.clone());
        self.in_scope.insert(record.canonical.clone());
        self.dedup.mark(&record);
        match self.frontier.try_push(WorkItem::seed(record)) {
            Ok(()) => self.outstanding += 1,
            Err(e) => warn!("Seed was not queued: {:?}", e),
        }
    }

    async fn drive(&mut self, rx: &mut mpsc::Receiver<WorkerOutcome>) -> Termination {
        loop {
            if let Some(outcome) = self.backlog.pop_front() {
                if let Err(termination) = self.handle(outcome, rx).await {
                    return termination;
                }
                continue;
            }
            if self.outstanding == 0 {
                return self.termination;
            }

            let event = tokio::select! {
                _ = self.cancel.cancelled() => Wait::Interrupted(Termination::Cancelled),
                _ = wait_deadline(self.deadline) => Wait::Interrupted(Termination::RunTimeout),
                outcome = rx.recv() => Wait::Outcome(outcome),
            };
            match event {
                Wait::Interrupted(termination) => {
                    info!("Stopping crawl: {}", termination.as_str());
                    return termination;
                }
                Wait::Outcome(Some(outcome)) => {
                    if let Err(termination) = self.handle(outcome, rx).await {
                        return termination;
                    }
                }
                Wait::Outcome(None) => {
                    warn!(
                        "All workers exited with {} items outstanding",
                        self.outstanding
                    );
                    return self.termination;
                }
                Wait::SlotFreed => {}
            }
        }
    }

    async fn handle(
        &mut self,
        outcome: WorkerOutcome,
        rx: &mut mpsc::Receiver<WorkerOutcome>,
    ) -> std::result::Result<(), Termination> {
        let Some(item) = self.absorb(outcome) else {
            return Ok(());
        };
        self.check_page_limit();

        let Some(result) = self.results.last() else {
            return Ok(());
        };
        let resources = resource_urls(&result.static_resources);
        let found = candidates(result);

        for raw in resources {
            self.record_only(&raw);
        }
        let mut children = Vec::new();
        for (raw, origin) in found {
            if let Some(child) = self.promote(&item, &raw, origin) {
                children.push(child);
            }
        }

        let variants = match (&self.fuzzer, self.results.last()) {
            (Some(fuzzer), Some(result)) => fuzzer.expand(&item, result, &self.dedup),
            _ => Vec::new(),
        };
        for variant in &variants {
            self.metrics.fuzz_variants.inc();
            self.all_urls.insert(variant.url.canonical.clone());
            self.in_scope.insert(variant.url.canonical.clone());
        }

        for child in children.into_iter().chain(variants) {
            self.enqueue(child, rx).await?;
        }
        Ok(())
    }

    /// Stores a worker outcome and scans its body. Returns the item when the
    /// page was fetched and its links can be followed.
    fn absorb(&mut self, outcome: WorkerOutcome) -> Option<WorkItem> {
        self.outstanding = self.outstanding.saturating_sub(1);
        let WorkerOutcome {
            item,
            mut result,
            body,
        } = outcome;

        if result.state == FetchState::Dropped {
            self.metrics.dropped.inc();
            if result.error.as_deref() == Some(PAGE_LIMIT_REACHED) {
                self.termination = Termination::MaxPages;
            }
            return None;
        }
        self.mark_fetched(&result);

        if let Some(body) = &body {
            let findings = self.scanner.scan(&result.url, body);
            if !findings.is_empty() {
                debug!("{} findings on {}", findings.len(), result.url);
                self.metrics.findings.add(findings.len() as u64);
                self.findings.extend(findings.iter().cloned());
                result.findings = findings;
            }
        }
        if let Some(ref callback) = self.result_callback {
            callback(&result);
        }
        self.results.push(result);
        Some(item)
    }

    /// Redirect hops were requested while fetching the item, so they never
    /// get queued on their own. The last in-scope hop is the final URL.
    fn mark_fetched(&mut self, result: &PageResult) {
        for raw in &result.redirect_chain {
            let Ok(record) = canonicalize(raw, None) else {
                continue;
            };
            if !self.scope.contains(&record) {
                continue;
            }
            self.all_urls.insert(record.canonical.clone());
            self.in_scope.insert(record.canonical.clone());
            self.dedup.mark(&record);
        }
    }

    /// Keeps every page that was fetched before the run stopped: outcomes
    /// parked while waiting for frontier space and outcomes still in the
    /// channel. Nothing is promoted.
    async fn drain(&mut self, rx: &mut mpsc::Receiver<WorkerOutcome>) {
        while let Some(outcome) = self.backlog.pop_front() {
            self.absorb(outcome);
        }
        while let Some(outcome) = rx.recv().await {
            self.absorb(outcome);
        }
    }

    fn check_page_limit(&mut self) {
        if self.limit_hit || self.pages.load(Ordering::SeqCst) < self.config.max_pages {
            return;
        }
        self.limit_hit = true;
        let drained = self.frontier.close();
        self.outstanding = self.outstanding.saturating_sub(drained);
        if drained > 0 {
            self.termination = Termination::MaxPages;
        }
        info!(
            "Page limit of {} reached, dropped {} queued items",
            self.config.max_pages, drained
        );
    }

    /// Canonicalize, scope, classify, robots, depth and dedup. Returns the
    /// child to enqueue when every gate passes.
    fn promote(&mut self, parent: &WorkItem, raw: &str, origin: ItemOrigin) -> Option<WorkItem> {
        let record = self.admit(raw)?;
        if record.class == UrlClass::Static {
            self.record_static(&record);
            return None;
        }
        if let Some(ref robots) = self.robots
            && !robots(&record.canonical)
        {
            debug!("Disallowed by robots.txt: {}", record);
            self.metrics.robots_rejected.inc();
            return None;
        }

        let child = WorkItem::child(parent, record, origin);
        if child.depth > self.config.max_depth {
            self.metrics.depth_rejected.inc();
            return None;
        }
        match self.dedup.mark(&child.url) {
            Mark::Fresh => Some(child),
            Mark::Duplicate => {
                self.metrics.duplicates.inc();
                None
            }
        }
    }

    /// Records a URL in the discovery sets. `None` for special, unparseable
    /// and out-of-scope URLs.
    fn admit(&mut self, raw: &str) -> Option<UrlRecord> {
        let record = match canonicalize(raw, None) {
            Ok(record) => record,
            Err(CanonReject::SpecialScheme(kind)) => {
                self.special_links.insert(kind, raw.trim().to_string());
                return None;
            }
            Err(e) => {
                debug!("Rejected {}: {}", raw, e);
                self.metrics.canon_rejected.inc();
                return None;
            }
        };
        self.all_urls.insert(record.canonical.clone());
        if !self.scope.contains(&record) {
            self.external.insert(record.canonical.clone());
            self.metrics.scope_rejected.inc();
            return None;
        }
        self.in_scope.insert(record.canonical.clone());
        Some(record)
    }

    fn record_only(&mut self, raw: &str) {
        let _ = self.admit(raw);
    }

    fn record_static(&mut self, record: &UrlRecord) {
        let Some(ext) = path_extension(&record.path) else {
            return;
        };
        if ext == "css" {
            self.stylesheets.insert(record.canonical.clone());
        } else if let Some(bucket) = ResourceBucket::for_extension(&ext) {
            self.static_resources.insert(bucket, record.canonical.clone());
        }
    }

    async fn enqueue(
        &mut self,
        item: WorkItem,
        rx: &mut mpsc::Receiver<WorkerOutcome>,
    ) -> std::result::Result<(), Termination> {
        let mut item = item;
        loop {
            match self.frontier.try_push(item) {
                Ok(()) => {
                    self.outstanding += 1;
                    return Ok(());
                }
                Err(PushError::Closed(rejected)) => {
                    debug!("Frontier closed, dropping {}", rejected.url);
                    self.metrics.dropped.inc();
                    if self.limit_hit {
                        self.termination = Termination::MaxPages;
                    }
                    return Ok(());
                }
                Err(PushError::Full(rejected)) => {
                    item = rejected;
                    let event = tokio::select! {
                        _ = self.cancel.cancelled() => Wait::Interrupted(Termination::Cancelled),
                        _ = wait_deadline(self.deadline) => Wait::Interrupted(Termination::RunTimeout),
                        _ = self.frontier.slot_freed() => Wait::SlotFreed,
                        outcome = rx.recv() => Wait::Outcome(outcome),
                    };
                    match event {
                        Wait::Interrupted(termination) => return Err(termination),
                        Wait::SlotFreed => {}
                        Wait::Outcome(Some(outcome)) => self.backlog.push_back(outcome),
                        Wait::Outcome(None) => {
                            self.metrics.dropped.inc();
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn into_report(
        self,
        seed: &str,
        started_at: chrono::DateTime<Utc>,
        termination: Termination,
    ) -> CrawlReport {
        let mut results = self.results;
        results.sort_by(|a, b| {
            a.url
                .cmp(&b.url)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
        });

        let mut static_resources = self.static_resources;
        let mut special_links = self.special_links;
        let mut scripts = BTreeSet::new();
        let mut stylesheets = self.stylesheets;
        let mut api_endpoints: Vec<ApiHint> = Vec::new();
        let mut post_requests: Vec<PostDescriptor> = Vec::new();

        for result in &results {
            static_resources.merge(&result.static_resources);
            special_links.merge(&result.special_links);
            scripts.extend(result.scripts.iter().cloned());
            stylesheets.extend(result.stylesheets.iter().cloned());
            for hint in &result.api_hints {
                if !api_endpoints
                    .iter()
                    .any(|h| h.url == hint.url && h.method == hint.method)
                {
                    api_endpoints.push(hint.clone());
                }
            }
            let form_posts = result
                .forms
                .iter()
                .filter(|f| f.method != HttpMethod::Get)
                .map(form_post);
            for post in result.post_requests.iter().cloned().chain(form_posts) {
                if !post_requests.contains(&post) {
                    post_requests.push(post);
                }
            }
        }
        static_resources.sort();
        special_links.sort();
        api_endpoints.sort_by(|a, b| a.url.cmp(&b.url));
        post_requests.sort_by(|a, b| a.url.cmp(&b.url));

        let mut findings = self.findings;
        findings.sort_by(|a, b| {
            (a.severity, &a.rule, &a.url, &a.matched).cmp(&(b.severity, &b.rule, &b.url, &b.matched))
        });

        CrawlReport {
            run_id: Uuid::new_v4().to_string(),
            seed: seed.to_string(),
            started_at,
            finished_at: Utc::now(),
            termination,
            results,
            discovered_urls: self.all_urls.into_iter().collect(),
            in_scope_urls: self.in_scope.into_iter().collect(),
            external_urls: self.external.into_iter().collect(),
            static_resources,
            scripts: scripts.into_iter().collect(),
            stylesheets: stylesheets.into_iter().collect(),
            special_links,
            api_endpoints,
            post_requests,
            findings,
            metrics: self.metrics.snapshot(),
            frontier: self.frontier.stats(),
        }
    }
}

/// Follow-up candidates of a page, in promotion order.
fn candidates(result: &PageResult) -> Vec<(String, ItemOrigin)> {
    let mut out = Vec::new();
    for form in result.forms.iter().filter(|f| f.method == HttpMethod::Get) {
        if let Some(target) = form_target(form) {
            out.push((target, ItemOrigin::FormAction));
        }
    }
    for link in result.links.iter().chain(&result.scripts).chain(&result.stylesheets) {
        out.push((link.clone(), ItemOrigin::Discovered));
    }
    for hint in &result.api_hints {
        if matches!(hint.method, None | Some(HttpMethod::Get)) {
            out.push((hint.url.clone(), ItemOrigin::ApiInferred));
        }
    }
    out
}

/// GET form submission URL with default field values.
fn form_target(form: &FormDescriptor) -> Option<String> {
    let mut url = Url::parse(&form.action).ok()?;
    let params = form.params();
    if !params.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(params.iter());
    }
    Some(url.to_string())
}

fn form_post(form: &FormDescriptor) -> PostDescriptor {
    PostDescriptor {
        url: form.action.clone(),
        method: form.method,
        params: form.params(),
        content_type: form.enctype.clone(),
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn resource_urls(resources: &StaticResources) -> Vec<String> {
    resources
        .buckets()
        .iter()
        .flat_map(|(_, urls)| urls.iter().cloned())
        .collect()
}
