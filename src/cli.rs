//! Command-line interface for sloth.
//!
//! Handles flag parsing and ties the pieces together for one run:
//! load the rules, migrate legacy records (saving them back when needed),
//! execute every rule and report the summary.

use crate::balancer::OutputBalancer;
use crate::clock::SystemClock;
use crate::config::{ConfigError, ConfigStore, DEFAULT_CONFIG_FILE, Rule};
use crate::dispatch::default_workers;
use crate::engine::{EngineOptions, RuleEngine};
use crate::logger::{AppLogger, RunSummary};
use crate::migrate::migrate;
use clap::Parser;
use clap::builder::FalseyValueParser;
use std::path::PathBuf;
use std::time::Instant;

/// Environment variable that forces simulate mode.
pub const DRY_RUN_ENV: &str = "SLOTH_DRY_RUN";

/// Moves files according to the rules in a configuration file.
#[derive(Debug, Clone, Parser)]
#[command(name = "sloth", version, about)]
pub struct Cli {
    /// Rule file (JSON, or TOML when it ends in .toml).
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log what would happen without moving or deleting anything.
    #[arg(
        long,
        env = DRY_RUN_ENV,
        action = clap::ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub dry_run: bool,

    /// Worker threads per rule [default: 2x available cores].
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Disable the per-rule progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            dry_run: self.dry_run,
            workers: self.workers.unwrap_or_else(default_workers),
            show_progress: !self.no_progress,
        }
    }
}

/// Loads and migrates the rules, persisting the canonical form when the
/// migration rewrote legacy records.
///
/// Migration warnings and a failed rewrite are logged; only unreadable or
/// malformed configuration is an error.
pub fn load_rules(store: &ConfigStore, logger: &AppLogger) -> Result<Vec<Rule>, ConfigError> {
    let raw = store.load()?;
    let migration = migrate(raw)?;

    for warning in &migration.warnings {
        logger.warn(warning);
    }

    if migration.needs_persist {
        match store.save(&migration.rules) {
            Ok(()) => logger.info(&format!(
                "migrated legacy configuration saved to {}",
                store.path().display()
            )),
            Err(e) => logger.warn(&format!("could not save migrated configuration: {e}")),
        }
    }

    Ok(migration.rules)
}

/// Runs every configured rule and returns the run summary.
///
/// # Errors
///
/// Returns the configuration error if the rules cannot be loaded; no rule
/// is executed in that case.
pub fn run_cli(cli: &Cli) -> Result<RunSummary, ConfigError> {
    let started = Instant::now();
    let logger = AppLogger::new(cli.dry_run);
    let store = ConfigStore::new(&cli.config);

    let rules = load_rules(&store, &logger)?;
    logger.info(&format!(
        "loaded {} rules from {}",
        rules.len(),
        store.path().display()
    ));

    let balancer = OutputBalancer::new();
    let engine = RuleEngine::new(&logger, &balancer, &SystemClock, cli.engine_options());
    engine.run(&rules);

    Ok(logger.summary(started.elapsed()))
}
