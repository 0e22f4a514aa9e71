//! Rule definitions and configuration file storage.
//!
//! Rules live in a single file, `config.json` by default: a JSON array of
//! records using the canonical field names.
//!
//! ```json
//! [
//!   {
//!     "name": "Downloads PDFs",
//!     "input": "/home/me/Downloads",
//!     "output": ["/mnt/disk1/pdf", "/mnt/disk2/pdf"],
//!     "extension": ".pdf",
//!     "folderType": "3",
//!     "deleteOlderThan": 0,
//!     "dryRun": false
//!   }
//! ]
//! ```
//!
//! A file ending in `.toml` holds the same records as `[[rules]]` tables.
//! Reading yields loosely-typed records only; turning them into [`Rule`]s is
//! the job of [`crate::migrate`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Errors that can occur while reading, validating or writing configuration.
///
/// All of them are fatal when raised before the first rule runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid JSON/TOML or not a list of records.
    #[error("invalid configuration {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    /// A record could not be turned into a rule.
    #[error("malformed rule #{index}: {reason}")]
    Malformed { index: usize, reason: String },
    /// Writing the migrated configuration back failed.
    #[error("failed to write configuration {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

/// Placement policy selected by a rule's `folderType` code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FolderType {
    /// `1`: `YYYY/M/Day D` from the modification time.
    ByDate,
    /// `2`: one folder per file extension.
    ByExtension,
    /// `3`: extension folder, then year.
    ByExtensionYear,
    /// `4`: straight into the output root.
    Flat,
    /// `5`: `YYYYMM` from the modification time.
    ByMonth,
    /// `delete`: retention sweep only, nothing is moved.
    Delete,
    /// Any other code. Files matched by such a rule are skipped.
    Unknown(String),
}

impl FolderType {
    /// The code as written in configuration.
    pub fn code(&self) -> &str {
        match self {
            Self::ByDate => "1",
            Self::ByExtension => "2",
            Self::ByExtensionYear => "3",
            Self::Flat => "4",
            Self::ByMonth => "5",
            Self::Delete => "delete",
            Self::Unknown(code) => code,
        }
    }
}

impl From<&str> for FolderType {
    fn from(code: &str) -> Self {
        match code.trim() {
            "1" => Self::ByDate,
            "2" => Self::ByExtension,
            "3" => Self::ByExtensionYear,
            "4" => Self::Flat,
            "5" => Self::ByMonth,
            other if other.eq_ignore_ascii_case("delete") => Self::Delete,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for FolderType {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<FolderType> for String {
    fn from(folder_type: FolderType) -> Self {
        folder_type.code().to_string()
    }
}

impl Default for FolderType {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One configured unit of work.
///
/// Rules are immutable once loaded for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    /// Directory scanned for files and swept for stale ones.
    pub input: PathBuf,
    /// Destinations, used round-robin.
    #[serde(rename = "output", default)]
    pub outputs: Vec<PathBuf>,
    /// Filename suffix filter such as `.pdf`; empty matches everything.
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub folder_type: FolderType,
    /// Retention threshold in days; `0` disables the sweep.
    #[serde(default)]
    pub delete_older_than: u32,
    #[serde(default)]
    pub dry_run: bool,
}

impl Rule {
    /// Whether `file_name` passes this rule's extension filter.
    pub fn matches(&self, file_name: &str) -> bool {
        matches_extension(file_name, &self.extension)
    }

    /// Rules marked `delete` never move files.
    pub fn is_delete_only(&self) -> bool {
        self.folder_type == FolderType::Delete
    }

    pub fn has_retention(&self) -> bool {
        self.delete_older_than > 0
    }

    /// The rule's own flag ORed with the process-wide one.
    pub fn simulate(&self, global_dry_run: bool) -> bool {
        global_dry_run || self.dry_run
    }
}

/// Case-sensitive suffix match; an empty filter matches all names.
pub fn matches_extension(file_name: &str, extension: &str) -> bool {
    file_name.ends_with(extension)
}

/// On-disk syntax of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.toml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// TOML wrapper: TOML documents must be tables, so records sit under `rules`.
#[derive(Debug, Serialize, Deserialize)]
struct TomlDocument<T> {
    #[serde(default)]
    rules: Vec<T>,
}

/// Reads raw rule records from, and writes canonical rules back to, one file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    format: ConfigFormat,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Loads the raw, untyped rule records.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Read` if it cannot be read and `ConfigError::Invalid`
    /// if it does not parse as a list of records.
    pub fn load(&self) -> Result<Vec<Value>, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| ConfigError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        match self.format {
            ConfigFormat::Json => serde_json::from_str::<Vec<Value>>(&content).map_err(|e| {
                ConfigError::Invalid {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
            }),
            ConfigFormat::Toml => toml::from_str::<TomlDocument<Value>>(&content)
                .map(|doc| doc.rules)
                .map_err(|e| ConfigError::Invalid {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Writes `rules` using canonical field names, replacing the file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` on serialization or I/O failure.
    pub fn save(&self, rules: &[Rule]) -> Result<(), ConfigError> {
        let content = match self.format {
            ConfigFormat::Json => serde_json::to_string_pretty(rules).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string_pretty(&TomlDocument {
                rules: rules.to_vec(),
            })
            .map_err(|e| e.to_string()),
        }
        .map_err(|reason| ConfigError::Write {
            path: self.path.clone(),
            reason,
        })?;

        fs::write(&self.path, content).map_err(|e| ConfigError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}
