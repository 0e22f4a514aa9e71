//! Run-wide message sink with counters.
//!
//! Every component writes through [`AppLogger`] so that warnings and errors
//! are tallied for the end-of-run summary. Events go out through `tracing`;
//! the binary decides where they land.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Number of simulated actions logged individually before the sampler
/// switches to a single summary line.
pub const SIMULATION_SAMPLE_LIMIT: usize = 5;

/// Structured logger carrying the process-wide dry-run flag and run counters.
#[derive(Debug, Default)]
pub struct AppLogger {
    dry_run: bool,
    rules_executed: AtomicU64,
    files_processed: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    simulated: AtomicU64,
    limit_notices: AtomicU64,
}

impl AppLogger {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    /// Logs a warning and bumps the warning counter.
    pub fn warn(&self, message: &str) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("{message}");
    }

    /// Logs an error and bumps the error counter.
    pub fn error(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        tracing::error!("{message}");
    }

    /// Logs a single simulated action.
    pub fn simulate(&self, message: &str) {
        self.simulated.fetch_add(1, Ordering::Relaxed);
        tracing::info!(dry_run = true, "[DRY RUN] {message}");
    }

    /// Logs the one-off line that replaces further simulated actions.
    pub fn simulation_limit_reached(&self, limit: usize) {
        self.limit_notices.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            dry_run = true,
            "[DRY RUN] sample limit of {limit} reached; further simulated actions are not logged"
        );
    }

    pub fn count_file(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_rule(&self) {
        self.rules_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed.load(Ordering::Relaxed)
    }

    pub fn rules_executed(&self) -> u64 {
        self.rules_executed.load(Ordering::Relaxed)
    }

    /// Number of simulated actions that were logged individually.
    pub fn simulated_logged(&self) -> u64 {
        self.simulated.load(Ordering::Relaxed)
    }

    /// Number of sample-limit lines emitted.
    pub fn simulation_limit_notices(&self) -> u64 {
        self.limit_notices.load(Ordering::Relaxed)
    }

    /// Emits the final summary event and returns the aggregated counters.
    pub fn summary(&self, elapsed: Duration) -> RunSummary {
        let summary = RunSummary {
            rules: self.rules_executed(),
            files: self.files_processed(),
            warnings: self.warnings(),
            errors: self.errors(),
            elapsed,
            dry_run: self.dry_run,
        };
        tracing::info!(
            rules = summary.rules,
            files = summary.files,
            warnings = summary.warnings,
            errors = summary.errors,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            dry_run = summary.dry_run,
            "SUMMARY"
        );
        summary
    }
}

/// Aggregated counters for a finished run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub rules: u64,
    pub files: u64,
    pub warnings: u64,
    pub errors: u64,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rules={} files={} warnings={} errors={} elapsed={:.3}s dryRun={}",
            self.rules,
            self.files,
            self.warnings,
            self.errors,
            self.elapsed.as_secs_f64(),
            self.dry_run
        )
    }
}

/// What the caller should do with one simulated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// Log the action individually.
    Log,
    /// The limit was just crossed: log the one-off summary line instead.
    LimitReached,
    /// Stay silent.
    Suppressed,
}

/// Caps how many simulated actions get their own log line.
///
/// Shared by reference across worker threads; only verbosity is affected,
/// never which actions are taken.
#[derive(Debug)]
pub struct SimulationSampler {
    seen: AtomicUsize,
    limit: usize,
}

impl SimulationSampler {
    pub fn new(limit: usize) -> Self {
        Self {
            seen: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn sample(&self) -> Sample {
        let n = self.seen.fetch_add(1, Ordering::Relaxed);
        match n.cmp(&self.limit) {
            std::cmp::Ordering::Less => Sample::Log,
            std::cmp::Ordering::Equal => Sample::LimitReached,
            std::cmp::Ordering::Greater => Sample::Suppressed,
        }
    }

    /// Routes one simulated action through the sampler into `logger`.
    ///
    /// `describe` is only evaluated when the action is actually logged.
    pub fn record<F>(&self, logger: &AppLogger, describe: F)
    where
        F: FnOnce() -> String,
    {
        match self.sample() {
            Sample::Log => logger.simulate(&describe()),
            Sample::LimitReached => logger.simulation_limit_reached(self.limit),
            Sample::Suppressed => {}
        }
    }
}

impl Default for SimulationSampler {
    fn default() -> Self {
        Self::new(SIMULATION_SAMPLE_LIMIT)
    }
}
