use colored::Colorize;
use tracing::warn;
use trawler::{
    EXIT_CONFIG, EXIT_RUNTIME, build_options, command_argument_builder, handle_crawl, init_tracing,
};
use trawler_scanner::CancelToken;

#[tokio::main]
async fn main() {
    let matches = match command_argument_builder().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() { EXIT_CONFIG } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let quiet = matches.get_flag("quiet");
    init_tracing(matches.get_count("verbose"), quiet);

    let options = match build_options(&matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers and writing partial results");
            on_interrupt.cancel();
        }
    });

    if let Err(e) = handle_crawl(options, cancel, quiet).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(EXIT_RUNTIME);
    }
}
