use clap::Parser;
use sloth::cli::{Cli, run_cli};
use sloth::output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    OutputFormatter::banner(cli.dry_run);

    match run_cli(&cli) {
        Ok(summary) => {
            OutputFormatter::summary_table(&summary);
            if summary.errors == 0 {
                OutputFormatter::success("All rules completed.");
            } else {
                OutputFormatter::warning("Some files could not be processed; see the log above.");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            OutputFormatter::error(&format!("Configuration error: {e}"));
            ExitCode::FAILURE
        }
    }
}
