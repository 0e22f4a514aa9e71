//! Rule orchestration.
//!
//! Rules run strictly one after another. For each rule the engine runs the
//! retention sweep (when configured), then, unless the rule is delete-only,
//! scans the input directory and hands the matching files to a
//! [`DispatchPool`], waiting for it to drain before moving on.

use crate::balancer::OutputBalancer;
use crate::clock::Clock;
use crate::config::Rule;
use crate::dispatch::{DispatchPool, DispatchReport, default_workers};
use crate::logger::AppLogger;
use crate::output::OutputFormatter;
use crate::retention::{RetentionSweeper, SweepReport};
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Knobs for a run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Process-wide simulate flag, ORed with each rule's own.
    pub dry_run: bool,
    /// Worker threads per rule.
    pub workers: usize,
    /// Show a progress bar while real moves are dispatched.
    pub show_progress: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            workers: default_workers(),
            show_progress: false,
        }
    }
}

/// What happened while executing one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleReport {
    pub name: String,
    pub simulated: bool,
    /// Present when the rule has a retention threshold.
    pub sweep: Option<SweepReport>,
    /// Present unless the rule is delete-only.
    pub dispatch: Option<DispatchReport>,
    /// Files matched by the scan.
    pub matched: usize,
}

/// Reports for every rule of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rules: Vec<RuleReport>,
}

/// Executes rules one at a time against the filesystem.
pub struct RuleEngine<'a> {
    logger: &'a AppLogger,
    balancer: &'a OutputBalancer,
    clock: &'a dyn Clock,
    options: EngineOptions,
}

impl<'a> RuleEngine<'a> {
    pub fn new(
        logger: &'a AppLogger,
        balancer: &'a OutputBalancer,
        clock: &'a dyn Clock,
        options: EngineOptions,
    ) -> Self {
        Self {
            logger,
            balancer,
            clock,
            options,
        }
    }

    /// Runs every rule in order. Failures inside a rule are logged and never
    /// prevent the following rules from running.
    pub fn run(&self, rules: &[Rule]) -> RunReport {
        RunReport {
            rules: rules.iter().map(|rule| self.run_rule(rule)).collect(),
        }
    }

    /// Runs a single rule to completion.
    pub fn run_rule(&self, rule: &Rule) -> RuleReport {
        let span = tracing::info_span!("rule", name = %rule.name);
        let _entered = span.enter();

        let started = Instant::now();
        let simulate = rule.simulate(self.options.dry_run);
        self.logger.count_rule();
        self.logger.info(&format!(
            "starting rule '{}' (input={}, folderType={}, dryRun={})",
            rule.name,
            rule.input.display(),
            rule.folder_type,
            simulate
        ));

        let mut report = RuleReport {
            name: rule.name.clone(),
            simulated: simulate,
            ..RuleReport::default()
        };

        if rule.has_retention() {
            let sweeper = RetentionSweeper::new(self.logger, self.clock);
            report.sweep = Some(sweeper.sweep(
                &rule.input,
                &rule.extension,
                rule.delete_older_than,
                simulate,
            ));
        }

        if rule.is_delete_only() {
            self.logger
                .info(&format!("rule '{}' is delete-only; no files moved", rule.name));
            return report;
        }

        let files = match scan_input(&rule.input, &rule.extension, self.logger) {
            Ok(files) => files,
            Err(e) => {
                self.logger.error(&format!(
                    "cannot scan {}: {e}",
                    rule.input.display()
                ));
                Vec::new()
            }
        };
        report.matched = files.len();

        let progress = if self.options.show_progress && !simulate {
            OutputFormatter::create_progress_bar(files.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        let pool = DispatchPool::new(self.logger, self.balancer, self.options.workers)
            .with_progress(progress);
        let dispatch = pool.run(&rule.input, &rule.outputs, &rule.folder_type, simulate, files);
        report.dispatch = Some(dispatch);

        self.logger.info(&format!(
            "rule '{}' finished in {:.2}s: matched={} moved={} simulated={} skipped={} failed={}",
            rule.name,
            started.elapsed().as_secs_f64(),
            report.matched,
            dispatch.moved,
            dispatch.simulated,
            dispatch.skipped,
            dispatch.failed
        ));
        report
    }
}

/// Lists the regular files directly inside `input` whose names end with
/// `extension`, sorted by name.
///
/// Unreadable entries and names that are not valid UTF-8 are skipped with a
/// warning.
pub fn scan_input(
    input: &Path,
    extension: &str,
    logger: &AppLogger,
) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                logger.warn(&format!("skipping unreadable entry in {}: {e}", input.display()));
                continue;
            }
        };
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if name.ends_with(extension) => files.push(name),
            Ok(_) => {}
            Err(raw) => logger.warn(&format!(
                "skipping {}: file name is not valid UTF-8",
                input.join(raw).display()
            )),
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::FolderType;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn rule(input: &Path, outputs: Vec<PathBuf>, extension: &str, folder_type: FolderType) -> Rule {
        Rule {
            name: "test".to_string(),
            input: input.to_path_buf(),
            outputs,
            extension: extension.to_string(),
            folder_type,
            delete_older_than: 0,
            dry_run: false,
        }
    }

    fn options() -> EngineOptions {
        EngineOptions {
            workers: 2,
            ..EngineOptions::default()
        }
    }

    #[test]
    fn test_scan_input_filters_and_sorts() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        for name in ["b.txt", "a.txt", "c.log"] {
            fs::write(base.join(name), "x").expect("Failed to write test file");
        }
        fs::create_dir(base.join("dir.txt")).expect("Failed to create directory");

        let logger = AppLogger::new(false);
        let files = scan_input(base, ".txt", &logger).expect("scan");
        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);

        let all = scan_input(base, "", &logger).expect("scan");
        assert_eq!(all.len(), 3);
        assert_eq!(logger.warnings(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_input_warns_on_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("good.txt"), "x").expect("Failed to write test file");
        fs::write(base.join(OsStr::from_bytes(b"bad\xff.txt")), "x")
            .expect("Failed to write test file");

        let logger = AppLogger::new(false);
        let files = scan_input(base, "", &logger).expect("scan");

        assert_eq!(files, vec!["good.txt".to_string()]);
        assert_eq!(logger.warnings(), 1);
    }

    #[test]
    fn test_out_of_range_retention_does_not_stop_later_rules() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input = temp_dir.path().join("in");
        let output = temp_dir.path().join("out");
        fs::create_dir(&input).expect("Failed to create input directory");
        fs::write(input.join("a.txt"), "x").expect("Failed to write test file");

        let logger = AppLogger::new(false);
        let balancer = OutputBalancer::new();
        let engine = RuleEngine::new(&logger, &balancer, &SystemClock, options());
        let mut sweep_rule = rule(&input, Vec::new(), ".txt", FolderType::Delete);
        sweep_rule.delete_older_than = 1_000_000_000;

        let report = engine.run(&[
            sweep_rule,
            rule(&input, vec![output.clone()], ".txt", FolderType::Flat),
        ]);

        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.rules[0].sweep, Some(SweepReport::default()));
        assert!(output.join("a.txt").exists());
        assert_eq!(logger.errors(), 0);
    }

    #[test]
    fn test_scan_failure_leaves_rule_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let logger = AppLogger::new(false);
        let balancer = OutputBalancer::new();
        let engine = RuleEngine::new(&logger, &balancer, &SystemClock, options());

        let report = engine.run_rule(&rule(
            &temp_dir.path().join("missing"),
            vec![temp_dir.path().join("out")],
            "",
            FolderType::Flat,
        ));

        assert_eq!(report.matched, 0);
        assert_eq!(report.dispatch, Some(DispatchReport::default()));
        assert_eq!(logger.errors(), 1);
        assert_eq!(logger.rules_executed(), 1);
    }

    #[test]
    fn test_delete_only_rule_never_moves() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input = temp_dir.path().join("in");
        let output = temp_dir.path().join("out");
        fs::create_dir(&input).expect("Failed to create input directory");
        fs::write(input.join("keep.txt"), "x").expect("Failed to write test file");

        let logger = AppLogger::new(false);
        let balancer = OutputBalancer::new();
        let engine = RuleEngine::new(&logger, &balancer, &SystemClock, options());
        let mut delete_rule = rule(&input, vec![output.clone()], ".txt", FolderType::Delete);
        delete_rule.delete_older_than = 30;

        let report = engine.run_rule(&delete_rule);

        assert_eq!(report.sweep.map(|s| s.deleted), Some(0));
        assert!(report.dispatch.is_none());
        assert!(input.join("keep.txt").exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_global_dry_run_overrides_rule() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input = temp_dir.path().join("in");
        let output = temp_dir.path().join("out");
        fs::create_dir(&input).expect("Failed to create input directory");
        fs::write(input.join("a.txt"), "x").expect("Failed to write test file");

        let logger = AppLogger::new(true);
        let balancer = OutputBalancer::new();
        let engine = RuleEngine::new(
            &logger,
            &balancer,
            &SystemClock,
            EngineOptions {
                dry_run: true,
                ..options()
            },
        );

        let report = engine.run_rule(&rule(&input, vec![output.clone()], "", FolderType::Flat));

        assert!(report.simulated);
        assert_eq!(report.dispatch.map(|d| d.simulated), Some(1));
        assert!(input.join("a.txt").exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_balancer_cursor_carries_across_rules() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input = temp_dir.path().join("in");
        let out_a = temp_dir.path().join("a");
        let out_b = temp_dir.path().join("b");
        fs::create_dir(&input).expect("Failed to create input directory");
        fs::write(input.join("first.one"), "x").expect("Failed to write test file");
        fs::write(input.join("second.two"), "x").expect("Failed to write test file");

        let logger = AppLogger::new(false);
        let balancer = OutputBalancer::new();
        let engine = RuleEngine::new(&logger, &balancer, &SystemClock, options());
        let outputs = vec![out_a.clone(), out_b.clone()];

        engine.run(&[
            rule(&input, outputs.clone(), ".one", FolderType::Flat),
            rule(&input, outputs, ".two", FolderType::Flat),
        ]);

        // The second rule continues where the first left the cursor.
        assert!(out_a.join("first.one").exists());
        assert!(out_b.join("second.two").exists());
        assert_eq!(logger.rules_executed(), 2);
    }
}
