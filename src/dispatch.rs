//! Concurrent file moves for a single rule.
//!
//! A bounded queue is filled with the rule's matching file names and drained
//! by a fixed pool of worker threads. Each worker stats its file, picks a
//! destination from the shared [`OutputBalancer`], derives the sub-path with
//! [`path_resolver::resolve`], creates the directory and renames the file
//! into place. Per-file failures are logged and never stop the pool.

use crate::balancer::{BalancerError, OutputBalancer};
use crate::config::FolderType;
use crate::logger::{AppLogger, SimulationSampler};
use crate::path_resolver;
use chrono::{DateTime, Local};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use thiserror::Error;

/// Capacity of the work queue between the scanner and the workers.
pub const QUEUE_CAPACITY: usize = 100;

/// Default pool size: twice the available hardware parallelism.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|p| p.get() * 2)
        .unwrap_or(4)
}

/// Errors that can occur while dispatching a single file.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The source file vanished or could not be inspected.
    #[error("cannot stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The rule has no usable destination.
    #[error("no destination for {file}: {source}")]
    Balancer {
        file: String,
        source: BalancerError,
    },
    /// The folder type does not place files anywhere.
    #[error("folder type '{folder_type}' has no placement; skipping {file}")]
    NoPlacement {
        file: String,
        folder_type: FolderType,
    },
    /// Failed to create the destination directory.
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move the file into its destination directory.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// What happened to a dispatched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Moved,
    Simulated,
}

/// Per-rule dispatch tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub moved: usize,
    pub simulated: usize,
    /// Files whose folder type has no placement.
    pub skipped: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.moved + self.simulated + self.skipped + self.failed
    }
}

#[derive(Default)]
struct Tally {
    moved: AtomicUsize,
    simulated: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    fn report(&self) -> DispatchReport {
        DispatchReport {
            moved: self.moved.load(Ordering::Relaxed),
            simulated: self.simulated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-size worker pool that moves one rule's files.
pub struct DispatchPool<'a> {
    logger: &'a AppLogger,
    balancer: &'a OutputBalancer,
    workers: usize,
    progress: ProgressBar,
}

impl<'a> DispatchPool<'a> {
    pub fn new(logger: &'a AppLogger, balancer: &'a OutputBalancer, workers: usize) -> Self {
        Self {
            logger,
            balancer,
            workers: workers.max(1),
            progress: ProgressBar::hidden(),
        }
    }

    /// Ticks `progress` once per processed file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Moves every file in `files` (names relative to `input`) and blocks
    /// until the queue is drained and all workers have exited.
    ///
    /// With `simulate` set, intended directory creations and moves are
    /// logged (sampled) and the filesystem is left untouched.
    pub fn run(
        &self,
        input: &Path,
        outputs: &[PathBuf],
        folder_type: &FolderType,
        simulate: bool,
        files: Vec<String>,
    ) -> DispatchReport {
        let tally = Tally::default();
        let sampler = SimulationSampler::default();
        let span = tracing::Span::current();
        let (sender, receiver) = crossbeam_channel::bounded::<String>(QUEUE_CAPACITY);

        thread::scope(|scope| {
            for _ in 0..self.workers {
                let receiver = receiver.clone();
                let span = span.clone();
                let tally = &tally;
                let sampler = &sampler;
                scope.spawn(move || {
                    let _entered = span.enter();
                    for file_name in receiver {
                        self.logger.count_file();
                        let result =
                            self.dispatch(input, outputs, folder_type, simulate, &file_name, sampler);
                        match result {
                            Ok(Outcome::Moved) => {
                                tally.moved.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(Outcome::Simulated) => {
                                tally.simulated.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e @ DispatchError::NoPlacement { .. }) => {
                                self.logger.warn(&e.to_string());
                                tally.skipped.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                self.logger.error(&e.to_string());
                                tally.failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        self.progress.inc(1);
                    }
                });
            }
            drop(receiver);

            for file_name in files {
                // Only fails if every worker is gone.
                if sender.send(file_name).is_err() {
                    break;
                }
            }
            drop(sender);
        });

        self.progress.finish_and_clear();
        tally.report()
    }

    /// Handles one work item.
    fn dispatch(
        &self,
        input: &Path,
        outputs: &[PathBuf],
        folder_type: &FolderType,
        simulate: bool,
        file_name: &str,
        sampler: &SimulationSampler,
    ) -> Result<Outcome, DispatchError> {
        let source = input.join(file_name);
        let modified = fs::metadata(&source)
            .and_then(|m| m.modified())
            .map_err(|e| DispatchError::Stat {
                path: source.clone(),
                source: e,
            })?;

        let root = self
            .balancer
            .next(outputs)
            .map_err(|e| DispatchError::Balancer {
                file: file_name.to_string(),
                source: e,
            })?;

        let target_dir =
            path_resolver::resolve(root, file_name, folder_type, DateTime::<Local>::from(modified))
                .ok_or_else(|| DispatchError::NoPlacement {
                    file: file_name.to_string(),
                    folder_type: folder_type.clone(),
                })?;
        let destination = target_dir.join(file_name);

        if simulate {
            sampler.record(self.logger, || {
                if target_dir.is_dir() {
                    format!("would move {} to {}", source.display(), destination.display())
                } else {
                    format!(
                        "would create directory {} and move {} to {}",
                        target_dir.display(),
                        source.display(),
                        destination.display()
                    )
                }
            });
            return Ok(Outcome::Simulated);
        }

        fs::create_dir_all(&target_dir).map_err(|e| DispatchError::DirectoryCreation {
            path: target_dir.clone(),
            source: e,
        })?;

        fs::rename(&source, &destination).map_err(|e| DispatchError::Rename {
            from: source.clone(),
            to: destination.clone(),
            source: e,
        })?;

        self.logger.debug(&format!(
            "moved {} to {}",
            source.display(),
            destination.display()
        ));
        Ok(Outcome::Moved)
    }
}
