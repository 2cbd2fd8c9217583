use crate::CLAP_STYLING;
use clap::{ArgAction, arg, value_parser};
use std::path::PathBuf;
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("trawler")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("trawler")
        .about("Reconnaissance crawler for authorized web security testing")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-u --"url" <URL>)
                .required(true)
                .help("The seed URL to crawl")
                .value_parser(value_parser!(Url)),
        )
        .arg(
            arg!(--"mode" <MODE>)
                .required(false)
                .help("Rendering mode: static fetches only, dynamic renders every HTML page, smart renders script-driven pages")
                .value_parser(["static", "dynamic", "smart"]),
        )
        .arg(
            arg!(-d --"depth" <DEPTH>)
                .required(false)
                .help("Maximum link depth from the seed (default: 3)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"max-pages" <NUM>)
                .required(false)
                .help("Stop after fetching this many pages (default: 1000)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-request timeout in seconds (default: 10)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(--"run-timeout" <SECONDS>)
                .required(false)
                .help("Stop the whole run after this many seconds and report what was found")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("The number of async fetch workers (default: 10)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"cookie-file" <PATH>)
                .required(false)
                .help("File holding a Cookie header value or a Netscape cookies.txt export")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"headers" <JSON>)
                .required(false)
                .help(r#"Extra request headers as a JSON object, e.g. '{"X-Api-Key": "abc"}'"#),
        )
        .arg(
            arg!(--"proxy" <URL>)
                .required(false)
                .help("Proxy URL, repeat to rotate between several (default: HTTP_PROXY/HTTPS_PROXY)")
                .action(ArgAction::Append),
        )
        .arg(
            arg!(--"user-agent" <UA>)
                .required(false)
                .help("User-Agent string, repeat to rotate between several")
                .action(ArgAction::Append),
        )
        .arg(
            arg!(--"ignore-robots")
                .required(false)
                .help("Do not fetch or honour robots.txt")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"allow-subdomains")
                .required(false)
                .help("Treat subdomains of the seed host as in scope")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(-o --"output" <DIR>)
                .required(false)
                .help("Write the report files into this directory (default: print the report)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"chrome-path" <PATH>)
                .required(false)
                .help("Chrome or Chromium binary for dynamic and smart modes")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"fuzz")
                .required(false)
                .help("Generate parameter variants for discovered endpoints")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"no-post-fuzz")
                .required(false)
                .help("Only fuzz query strings, never POST bodies")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"fuzz-params" <LIST>)
                .required(false)
                .help("Comma separated parameter names to try"),
        )
        .arg(
            arg!(--"fuzz-dict" <PATH>)
                .required(false)
                .help("File with one parameter name per line")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"rules" <PATH>)
                .required(false)
                .help("JSON rule catalog merged over the built-in sensitive rules")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"config" <PATH>)
                .required(false)
                .help("JSON config file, flags given on the command line take precedence")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"dfs")
                .required(false)
                .help("Crawl depth-first instead of breadth-first")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"delay" <MS>)
                .required(false)
                .help("Minimum delay between requests to the same origin, in milliseconds")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(-q --"quiet" "Only print warnings and the final report")
                .required(false)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Raise log verbosity, repeat for trace output")
                .required(false)
                .action(ArgAction::Count),
        )
}
