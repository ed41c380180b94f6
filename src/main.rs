mod cache;
mod cli;
mod dataset;
mod error;
mod fetch;
mod filter;
mod fmt;
mod models;
mod reports;
mod settings;
mod tui;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);
    debug!("Log level set to {}", cli.log_level.to_string().to_lowercase());

    let mode = cli.load_mode();
    let result = match cli.command {
        None => cli::dashboard::run(mode),
        Some(Commands::Fetch { force }) => cli::fetch::run(mode, force),
        Some(Commands::Status) => cli::status::run(mode),
        Some(Commands::Report { command }) => cli::report::dispatch(mode, command),
        Some(Commands::Config {
            data_dir,
            url,
            ttl_hours,
            sha256,
            top_n,
        }) => cli::config::run(data_dir, url, ttl_hours, sha256, top_n),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber. Logs go to stderr so report output on
/// stdout stays clean.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
