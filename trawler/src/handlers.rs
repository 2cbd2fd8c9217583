use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trawler_core::crawl::{CrawlOptions, execute_crawl, generate_crawl_summary};
use trawler_core::fuzz::{load_param_dictionary, merge_params, parse_param_list};
use trawler_core::report::generate_crawl_report;
use trawler_core::rules::{load_catalog, validate_catalog};
use trawler_scanner::frontier::Discipline;
use trawler_scanner::{CancelToken, CrawlConfig, CrawlReport, Mode, canonicalize};
use url::Url;

/// Bad flags, config file or rule catalog.
pub const EXIT_CONFIG: i32 = 1;
/// The run itself could not proceed.
pub const EXIT_RUNTIME: i32 = 2;

/// `RUST_LOG` wins when set. Otherwise `-q` means warn, `-v` debug, `-vv` trace.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Cookie header value from a cookie file. Accepts a Netscape cookies.txt
/// export or a plain `name=value; name2=value2` line, with or without a
/// leading `Cookie:`.
pub fn parse_cookie_file(content: &str) -> Option<String> {
    let mut pairs = Vec::new();
    let mut plain = None;

    for line in content.lines() {
        let line = line.trim();
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 7 {
            pairs.push(format!("{}={}", fields[5].trim(), fields[6].trim()));
        } else if plain.is_none() {
            let value = line
                .strip_prefix("Cookie:")
                .or_else(|| line.strip_prefix("cookie:"))
                .unwrap_or(line)
                .trim();
            plain = Some(value.to_string());
        }
    }

    if !pairs.is_empty() {
        Some(pairs.join("; "))
    } else {
        plain.filter(|v| !v.is_empty())
    }
}

pub fn load_cookie_file(path: &Path) -> Result<String> {
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
    parse_cookie_file(&content).ok_or_else(|| anyhow!("No cookies found in {}", path.display()))
}

/// Parses the `--headers` JSON object. Number and boolean values are
/// stringified, anything else is rejected.
pub fn parse_headers(json: &str) -> Result<BTreeMap<String, String>> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("--headers is not valid JSON")?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("--headers must be a JSON object"))?;

    let mut headers = BTreeMap::new();
    for (name, value) in object {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => bail!("header {} must be a string, number or boolean", name),
        };
        headers.insert(name.clone(), value);
    }
    Ok(headers)
}

pub fn load_config_file(path: &Path) -> Result<CrawlConfig> {
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    CrawlConfig::from_json(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Defaults, then the `--config` file, then flags.
pub fn build_config(matches: &ArgMatches) -> Result<CrawlConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config_file(path)?,
        None => CrawlConfig::default(),
    };

    if let Some(mode) = matches.get_one::<String>("mode") {
        config.mode = Mode::parse(mode).ok_or_else(|| anyhow!("unknown mode {}", mode))?;
    }
    if let Some(&depth) = matches.get_one::<usize>("depth") {
        config.max_depth = depth;
    }
    if let Some(&max_pages) = matches.get_one::<usize>("max-pages") {
        config.max_pages = max_pages;
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.request_timeout_secs = timeout;
    }
    if let Some(&run_timeout) = matches.get_one::<u64>("run-timeout") {
        config.run_timeout_secs = Some(run_timeout);
    }
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        config.workers = workers;
    }
    if let Some(&delay) = matches.get_one::<u64>("delay") {
        config.host_delay_ms = delay;
    }
    if let Some(path) = matches.get_one::<PathBuf>("cookie-file") {
        config.cookie = Some(load_cookie_file(path)?);
    }
    if let Some(json) = matches.get_one::<String>("headers") {
        config.headers.extend(parse_headers(json)?);
    }
    if let Some(proxies) = matches.get_many::<String>("proxy") {
        config.proxies = proxies.cloned().collect();
    }
    if let Some(agents) = matches.get_many::<String>("user-agent") {
        config.user_agents = agents.cloned().collect();
    }
    if let Some(path) = matches.get_one::<PathBuf>("chrome-path") {
        config.chrome_path = Some(expand_path(path));
    }
    if matches.get_flag("ignore-robots") {
        config.respect_robots = false;
    }
    if matches.get_flag("allow-subdomains") {
        config.allow_subdomains = true;
    }
    if matches.get_flag("dfs") {
        config.discipline = Discipline::Dfs;
    }

    let inline = matches
        .get_one::<String>("fuzz-params")
        .map(String::as_str)
        .map(parse_param_list);
    let dictionary = match matches.get_one::<PathBuf>("fuzz-dict") {
        Some(path) => Some(load_param_dictionary(&expand_path(path))?),
        None => None,
    };
    if inline.is_some() || dictionary.is_some() {
        config.fuzz_params = merge_params(dictionary.unwrap_or_default(), inline.unwrap_or_default());
        config.fuzz = true;
    }
    if matches.get_flag("fuzz") {
        config.fuzz = true;
    }
    if matches.get_flag("no-post-fuzz") {
        config.fuzz_post = false;
    }

    config.validate()?;
    Ok(config)
}

/// Everything needed to start a run, resolved from the command line.
pub fn build_options(matches: &ArgMatches) -> Result<CrawlOptions> {
    let url = matches
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    canonicalize(url.as_str(), None).with_context(|| format!("Cannot crawl seed URL {}", url))?;
    let config = build_config(matches)?;

    let rules = matches.get_one::<PathBuf>("rules").map(|p| expand_path(p));
    if let Some(ref path) = rules {
        let catalog = load_catalog(path)?;
        let broken = validate_catalog(&catalog);
        if !broken.is_empty() {
            let names: Vec<String> = broken
                .into_iter()
                .map(|(name, reason)| format!("{} ({})", name, reason))
                .collect();
            bail!("rule catalog {} has invalid patterns: {}", path.display(), names.join(", "));
        }
    }

    let mut options = CrawlOptions::new(url.as_str(), config);
    options.rules = rules;
    options.output_dir = matches.get_one::<PathBuf>("output").map(|p| expand_path(p));
    options.show_progress_bars = !matches.get_flag("quiet") && std::io::stderr().is_terminal();
    Ok(options)
}

fn print_run_header(options: &CrawlOptions) {
    let config = &options.config;
    let host = Url::parse(&options.url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| options.url.clone());

    println!("\n{} Crawling {}", "→".blue().bold(), host.bright_white());
    println!(
        "Mode: {:?}  Workers: {}  Max depth: {}  Max pages: {}",
        config.mode, config.workers, config.max_depth, config.max_pages
    );
    println!(
        "Scope: {}  Robots: {}  Fuzzing: {}\n",
        if config.allow_subdomains { "host and subdomains" } else { "seed origin" },
        if config.respect_robots { "honoured" } else { "ignored" },
        if config.fuzz { "on" } else { "off" }
    );
}

pub async fn handle_crawl(options: CrawlOptions, cancel: CancelToken, quiet: bool) -> Result<CrawlReport> {
    if !quiet {
        print_run_header(&options);
    }
    let output_dir = options.output_dir.clone();

    let report = execute_crawl(options, cancel, None)
        .await
        .context("Crawl failed")?;

    if report.termination.is_partial() {
        warn!("Run stopped early ({}), report is partial", report.termination.as_str());
    }

    match output_dir {
        Some(dir) => {
            if !quiet {
                print!("{}", generate_crawl_summary(&report));
            }
            println!("{} Reports written to {}", "✓".green().bold(), dir.display());
        }
        None => {
            let colorize = std::io::stdout().is_terminal();
            print!("{}", generate_crawl_report(&report, colorize));
        }
    }
    info!(
        "Fetched {} pages, {} findings in {:.1}s",
        report.results.len(),
        report.findings.len(),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    Ok(report)
}
