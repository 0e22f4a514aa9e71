//! Normalization of raw configuration records into [`Rule`]s.
//!
//! Records are read as untyped JSON maps so that older field names and
//! conventions can be recognized before anything is validated:
//!
//! - `removeOlderThan` is the old name of `deleteOlderThan`
//! - `pattern` is the old name of `extension`
//! - `output` used to be a single path rather than a list
//! - `folderType` was sometimes written as a bare number
//! - delete-only entries were marked with `"type": "delete"` or simply had
//!   "delete" in their name
//!
//! Delete-only entries stay standalone rules with `folderType = "delete"`;
//! they are never merged into a moving rule that shares their input.
//! Whenever one of the conventions above is rewritten the migration asks
//! for the file to be saved back in canonical form.

use crate::config::{ConfigError, FolderType, Rule};
use serde_json::{Map, Value};
use std::path::PathBuf;

const LEGACY_RETENTION_KEY: &str = "removeOlderThan";
const LEGACY_EXTENSION_KEY: &str = "pattern";
const LEGACY_TYPE_KEY: &str = "type";
const DELETE_TOKEN: &str = "delete";

/// Result of migrating one configuration file.
#[derive(Debug, Clone, Default)]
pub struct Migration {
    pub rules: Vec<Rule>,
    /// True when a legacy convention was rewritten and the file should be
    /// saved back.
    pub needs_persist: bool,
    /// Non-fatal problems found while normalizing, for the caller to log.
    pub warnings: Vec<String>,
}

/// Normalizes raw records into rules, preserving their order.
///
/// # Errors
///
/// Returns `ConfigError::Malformed` if a record is not an object or has no
/// usable `input` directory.
pub fn migrate(raw: Vec<Value>) -> Result<Migration, ConfigError> {
    let mut migration = Migration::default();

    for (i, record) in raw.into_iter().enumerate() {
        let index = i + 1;
        let Value::Object(map) = record else {
            return Err(ConfigError::Malformed {
                index,
                reason: "expected an object".to_string(),
            });
        };

        let mut record = RawRecord {
            index,
            map,
            changed: false,
            warnings: Vec::new(),
        };
        let rule = record.normalize()?;

        migration.needs_persist |= record.changed;
        migration.warnings.append(&mut record.warnings);
        migration.rules.push(rule);
    }

    Ok(migration)
}

/// One record in its permissive form.
struct RawRecord {
    index: usize,
    map: Map<String, Value>,
    changed: bool,
    warnings: Vec<String>,
}

impl RawRecord {
    fn normalize(&mut self) -> Result<Rule, ConfigError> {
        let name = match self.map.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => format!("rule #{}", self.index),
        };

        let input = self
            .map
            .get("input")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Malformed {
                index: self.index,
                reason: "missing or empty 'input'".to_string(),
            })?;

        let outputs = self.outputs(&name);
        let extension = self.extension();
        let delete_older_than = self.retention(&name);
        let dry_run = self.map.get("dryRun").and_then(Value::as_bool).unwrap_or(false);

        let mut folder_type = self.folder_type();
        if folder_type != FolderType::Delete && self.is_legacy_delete(&name) {
            folder_type = FolderType::Delete;
            self.changed = true;
        }
        if self.map.contains_key(LEGACY_TYPE_KEY) {
            self.changed = true;
        }

        let rule = Rule {
            name,
            input,
            outputs,
            extension,
            folder_type,
            delete_older_than,
            dry_run,
        };
        self.validate(&rule);
        Ok(rule)
    }

    fn outputs(&mut self, name: &str) -> Vec<PathBuf> {
        match self.map.get("output") {
            Some(Value::String(single)) => {
                self.changed = true;
                vec![PathBuf::from(single)]
            }
            Some(Value::Array(items)) => {
                let paths: Vec<PathBuf> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(PathBuf::from)
                    .collect();
                if paths.len() != items.len() {
                    self.warnings.push(format!(
                        "rule '{name}': ignored {} non-string output entries",
                        items.len() - paths.len()
                    ));
                }
                paths
            }
            _ => Vec::new(),
        }
    }

    fn extension(&mut self) -> String {
        if let Some(extension) = self.map.get("extension").and_then(Value::as_str) {
            if self.map.contains_key(LEGACY_EXTENSION_KEY) {
                self.changed = true;
            }
            return extension.to_string();
        }

        match self.map.get(LEGACY_EXTENSION_KEY).and_then(Value::as_str) {
            Some(pattern) => {
                self.changed = true;
                pattern.to_string()
            }
            None => String::new(),
        }
    }

    /// Current retention field, falling back to the legacy one only when the
    /// current field is unset or zero.
    fn retention(&mut self, name: &str) -> u32 {
        let current = self.days("deleteOlderThan", name).unwrap_or(0);
        if !self.map.contains_key(LEGACY_RETENTION_KEY) {
            return current;
        }

        self.changed = true;
        let legacy = self.days(LEGACY_RETENTION_KEY, name).unwrap_or(0);
        if current == 0 { legacy } else { current }
    }

    fn days(&mut self, key: &str, name: &str) -> Option<u32> {
        let value = self.map.get(key)?;
        let days = match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<u32>().ok(),
            Value::Null => return None,
            _ => None,
        };
        if days.is_none() {
            self.warnings.push(format!(
                "rule '{name}': '{key}' is not a whole number of days ({value}); treating as 0"
            ));
        }
        days
    }

    fn folder_type(&mut self) -> FolderType {
        match self.map.get("folderType") {
            Some(Value::String(code)) => FolderType::from(code.as_str()),
            Some(Value::Number(code)) => {
                self.changed = true;
                FolderType::from(code.to_string())
            }
            _ => FolderType::default(),
        }
    }

    fn is_legacy_delete(&self, name: &str) -> bool {
        let marked = self
            .map
            .get(LEGACY_TYPE_KEY)
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case(DELETE_TOKEN));
        marked || name.to_lowercase().contains(DELETE_TOKEN)
    }

    fn validate(&mut self, rule: &Rule) {
        if rule.is_delete_only() {
            if !rule.has_retention() {
                self.warnings.push(format!(
                    "rule '{}': delete rule has no 'deleteOlderThan'; it will do nothing",
                    rule.name
                ));
            }
            return;
        }

        if rule.outputs.is_empty() {
            self.warnings.push(format!(
                "rule '{}': no output destinations; matching files cannot be moved",
                rule.name
            ));
        }
        if let FolderType::Unknown(code) = &rule.folder_type {
            self.warnings.push(format!(
                "rule '{}': unknown folderType '{code}'; matching files will be skipped",
                rule.name
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> Value {
        json!({
            "name": "Photos",
            "input": "/in",
            "output": ["/out1", "/out2"],
            "extension": ".jpg",
            "folderType": "1",
            "deleteOlderThan": 0,
            "dryRun": false
        })
    }

    #[test]
    fn test_canonical_record_needs_no_persist() {
        let migration = migrate(vec![canonical()]).expect("migrate");

        assert!(!migration.needs_persist);
        assert!(migration.warnings.is_empty());
        let rule = &migration.rules[0];
        assert_eq!(rule.name, "Photos");
        assert_eq!(rule.outputs.len(), 2);
        assert_eq!(rule.folder_type, FolderType::ByDate);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let migration = migrate(vec![json!({
            "name": "Bare",
            "input": "/in",
            "folderType": "4"
        })])
        .expect("migrate");

        let rule = &migration.rules[0];
        assert_eq!(rule.delete_older_than, 0);
        assert!(!rule.dry_run);
        assert!(rule.outputs.is_empty());
        assert_eq!(rule.extension, "");
        assert!(!migration.needs_persist);
        // Empty outputs on a moving rule is reported, not rejected.
        assert_eq!(migration.warnings.len(), 1);
    }

    #[test]
    fn test_legacy_retention_copied_when_current_unset() {
        let migration = migrate(vec![json!({
            "name": "Old",
            "input": "/in",
            "output": ["/out"],
            "extension": ".pdf",
            "folderType": "1",
            "removeOlderThan": 30
        })])
        .expect("migrate");

        assert_eq!(migration.rules[0].delete_older_than, 30);
        assert!(migration.needs_persist);
    }

    #[test]
    fn test_legacy_retention_does_not_override_current() {
        let migration = migrate(vec![json!({
            "name": "Both",
            "input": "/in",
            "output": ["/out"],
            "folderType": "4",
            "deleteOlderThan": 7,
            "removeOlderThan": 30
        })])
        .expect("migrate");

        assert_eq!(migration.rules[0].delete_older_than, 7);
        assert!(migration.needs_persist);
    }

    #[test]
    fn test_delete_named_record_kept_standalone() {
        let migration = migrate(vec![
            canonical(),
            json!({
                "name": "Delete old photos",
                "input": "/in",
                "extension": ".jpg",
                "folderType": "1",
                "removeOlderThan": 90
            }),
        ])
        .expect("migrate");

        assert_eq!(migration.rules.len(), 2);
        let delete = &migration.rules[1];
        assert!(delete.is_delete_only());
        assert_eq!(delete.name, "Delete old photos");
        assert_eq!(delete.delete_older_than, 90);
        // The moving rule with the same input is left untouched.
        assert_eq!(migration.rules[0].delete_older_than, 0);
        assert!(migration.needs_persist);
    }

    #[test]
    fn test_type_marker_detected() {
        let migration = migrate(vec![json!({
            "name": "Cleanup",
            "type": "DELETE",
            "input": "/tmp/in",
            "deleteOlderThan": 3
        })])
        .expect("migrate");

        assert!(migration.rules[0].is_delete_only());
        assert!(migration.needs_persist);
        assert!(migration.warnings.is_empty());
    }

    #[test]
    fn test_oldest_schema_fields() {
        let migration = migrate(vec![json!({
            "name": "Legacy",
            "input": "/in",
            "output": "/out",
            "pattern": ".txt",
            "folderType": 5
        })])
        .expect("migrate");

        let rule = &migration.rules[0];
        assert_eq!(rule.outputs, vec![PathBuf::from("/out")]);
        assert_eq!(rule.extension, ".txt");
        assert_eq!(rule.folder_type, FolderType::ByMonth);
        assert!(migration.needs_persist);
    }

    #[test]
    fn test_non_object_record_is_fatal() {
        let result = migrate(vec![canonical(), json!("just a string")]);
        assert!(matches!(
            result,
            Err(ConfigError::Malformed { index: 2, .. })
        ));
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let result = migrate(vec![json!({ "name": "No input", "output": ["/out"] })]);
        assert!(matches!(result, Err(ConfigError::Malformed { index: 1, .. })));
    }

    #[test]
    fn test_unnamed_record_gets_positional_name() {
        let migration = migrate(vec![canonical(), json!({ "input": "/in", "folderType": "delete" })])
            .expect("migrate");
        assert_eq!(migration.rules[1].name, "rule #2");
    }
}
