//! Run orchestration around the trawler scanner: rule catalogs, parameter
//! dictionaries, robots.txt handling and the report writers.

pub mod crawl;
pub mod error;
pub mod fuzz;
pub mod report;
pub mod robots;
pub mod rules;

pub use crawl::{CrawlOptions, execute_crawl, generate_crawl_summary};
pub use error::{CoreError, Result};
pub use report::FileReportWriter;
pub use robots::{RobotsRules, fetch_robots};
