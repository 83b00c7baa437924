mod cli;
mod error;
mod expense;
mod store;

use std::{io, process::ExitCode};
use store::JsonStore;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> error::Result<()> {
    let cli = cli::parse(std::env::args_os())?;
    init_logging(&cli.log_level);

    let mut store = JsonStore::open(&cli.store)?;
    tracing::debug!(store = %store.path().display(), command = ?cli.command, "running command");

    cli::run(cli.command, &mut store, &mut io::stdout().lock())
}

fn init_logging(directives: &str) {
    let (filter, invalid) = match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("warn"), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Some(e) = invalid {
        tracing::warn!(filter = directives, error = %e, "invalid log filter, using `warn`");
    }
}
