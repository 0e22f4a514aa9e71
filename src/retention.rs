//! Age-based deletion of stale files under a rule's input directory.

use crate::clock::Clock;
use crate::config::matches_extension;
use crate::logger::{AppLogger, SimulationSampler};
use chrono::{DateTime, Local, TimeDelta};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    /// Candidates that would have been deleted in simulate mode.
    pub simulated: usize,
    pub failed: usize,
}

/// Recursively deletes files older than a threshold.
pub struct RetentionSweeper<'a> {
    logger: &'a AppLogger,
    clock: &'a dyn Clock,
}

impl<'a> RetentionSweeper<'a> {
    pub fn new(logger: &'a AppLogger, clock: &'a dyn Clock) -> Self {
        Self { logger, clock }
    }

    /// Deletes every file below `input` whose name ends with `extension` and
    /// whose modification time is strictly before `now - older_than_days`.
    ///
    /// Directories are never removed. Traversal and deletion errors are
    /// logged and the walk continues. In simulate mode nothing is touched and
    /// only the first few candidates are logged individually.
    pub fn sweep(
        &self,
        input: &Path,
        extension: &str,
        older_than_days: u32,
        simulate: bool,
    ) -> SweepReport {
        let mut report = SweepReport::default();
        if older_than_days == 0 {
            return report;
        }

        // Past chrono's range no file can be older than the threshold.
        let Some(threshold) = TimeDelta::try_days(i64::from(older_than_days))
            .and_then(|age| self.clock.now().checked_sub_signed(age))
        else {
            self.logger.info(&format!(
                "retention of {older_than_days} days reaches before the earliest date; nothing to sweep in {}",
                input.display()
            ));
            return report;
        };
        let sampler = SimulationSampler::default();
        self.logger.info(&format!(
            "sweeping {} for '{}' files older than {} days",
            input.display(),
            extension,
            older_than_days
        ));

        for entry in WalkDir::new(input) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.logger.error(&format!("retention walk failed: {e}"));
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if !matches_extension(&entry.file_name().to_string_lossy(), extension) {
                continue;
            }

            let modified = match entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|m| m.modified())
            {
                Ok(modified) => DateTime::<Local>::from(modified),
                Err(e) => {
                    self.logger.error(&format!(
                        "cannot read modification time of {}: {e}",
                        entry.path().display()
                    ));
                    report.failed += 1;
                    continue;
                }
            };
            if modified >= threshold {
                continue;
            }

            if simulate {
                sampler.record(self.logger, || {
                    format!(
                        "would delete {} (modified {})",
                        entry.path().display(),
                        modified.format("%Y-%m-%d %H:%M")
                    )
                });
                report.simulated += 1;
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    self.logger
                        .debug(&format!("deleted {}", entry.path().display()));
                    self.logger.count_file();
                    report.deleted += 1;
                }
                Err(e) => {
                    self.logger.error(&format!(
                        "failed to delete {}: {e}",
                        entry.path().display()
                    ));
                    report.failed += 1;
                }
            }
        }

        self.logger.info(&format!(
            "sweep of {} done: deleted={} simulated={} failed={}",
            input.display(),
            report.deleted,
            report.simulated,
            report.failed
        ));
        report
    }
}
