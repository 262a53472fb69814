//! kiln - machine image builds from template trees
//!
//! Main entry point for the `kiln` binary.

use std::process::ExitCode;

use clap::Parser;
use kiln_cli::cli::Cli;
use kiln_cli::Exit;
use kiln_common_log::{LogConfig, LogLevel};
use tracing::debug;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to create Tokio runtime: {e}");
            return Exit::GeneralError.into();
        }
    };

    match runtime.block_on(cli.execute()) {
        Ok(()) => Exit::Success.into(),
        Err(e) => {
            debug!(code = e.code(), error = ?e, "Command failed");
            eprint!("{}", e.report());
            e.exit_code().into()
        }
    }
}

/// `-v`/`-q` win over the level from the environment.
fn init_logging(cli: &Cli) {
    let mut config = LogConfig::from_env();
    if cli.verbose > 0 || cli.quiet {
        config = config.with_level(LogLevel::from_verbosity(cli.verbose, cli.quiet));
    }

    if let Err(e) = kiln_common_log::init(config) {
        eprintln!("warning: {e}");
    }
}
