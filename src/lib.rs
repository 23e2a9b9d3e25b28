pub mod clipboard;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod utils;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::Cli;
use config::Config;

pub use db::{Entry, Source, Stats};
pub use error::{AppError, AppResult};
pub use services::capture::{capture_once, restore_entry, CancelHandle, WatchSession, WatchSummary};
pub use services::history::HistoryStore;
pub use services::transfer::{EntryRecord, ExportFormat};

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Entry point for the `clipstack` binary. Returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = Config::load().and_then(|config| commands::execute(cli, config));
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[ERROR] {err}");
            1
        }
    }
}
