//! sloth - rule-driven file mover
//!
//! Each configured rule scans one input directory, optionally deletes files
//! past a retention age, and moves the remaining matching files across one
//! or more output destinations, laid out by modification date, by extension,
//! or flat.

pub mod balancer;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod logger;
pub mod migrate;
pub mod output;
pub mod path_resolver;
pub mod retention;

pub use balancer::{BalancerError, OutputBalancer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, ConfigStore, FolderType, Rule};
pub use dispatch::{DispatchError, DispatchPool, DispatchReport};
pub use engine::{EngineOptions, RuleEngine, RuleReport, RunReport};
pub use logger::{AppLogger, RunSummary};
pub use migrate::{Migration, migrate};
pub use retention::{RetentionSweeper, SweepReport};

pub use cli::{Cli, run_cli};
