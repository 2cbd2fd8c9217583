//! Crawl engine for Trawler.
//!
//! A [`Crawler`] owns one run: it canonicalizes and deduplicates every URL it
//! sees, schedules work through a bounded [`frontier::Frontier`], fetches with
//! a pool of workers, extracts links, forms and API hints from each response,
//! optionally renders pages in headless Chrome, fuzzes parameters, and scans
//! bodies for secrets. The finished [`CrawlReport`] is handed to every
//! registered [`ReportSink`].

pub mod backoff;
pub mod browser;
pub mod cancel;
pub mod canon;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod fuzzer;
pub mod item;
pub mod metrics;
pub mod pacing;
pub mod report;
pub mod result;
pub mod sensitive;

pub use cancel::CancelToken;
pub use canon::{UrlRecord, canonicalize};
pub use config::{CrawlConfig, Mode};
pub use crawler::{Crawler, ProgressCallback, ResultCallback, RobotsPredicate};
pub use error::{Result, ScanError};
pub use report::{CrawlReport, ReportSink, Termination};
pub use result::PageResult;
pub use sensitive::{Finding, RuleCatalog, Severity};
