//! Output sub-path derivation for each folder-type policy.
//!
//! | code | destination directory                          |
//! |------|------------------------------------------------|
//! | `1`  | `out/YYYY/M/Day D`                             |
//! | `2`  | `out/<ext>` (or `out` when there is none)      |
//! | `3`  | `out/<ext>/YYYY` (or `out/YYYY`)               |
//! | `4`  | `out`                                          |
//! | `5`  | `out/YYYYMM`                                   |
//!
//! Anything else, `delete` included, has no placement.

use crate::config::FolderType;
use chrono::{DateTime, Datelike, Local};
use std::path::{Path, PathBuf};

/// Computes the directory a file should be moved into.
///
/// Pure: the modification time is supplied by the caller. Returns `None`
/// when the policy does not move files, which callers treat as a skip.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use sloth::config::FolderType;
/// use sloth::path_resolver::resolve;
/// use std::path::{Path, PathBuf};
///
/// let modified = Local.with_ymd_and_hms(2023, 10, 15, 12, 0, 0).unwrap();
/// let dir = resolve(Path::new("/output"), "test.pdf", &FolderType::ByMonth, modified);
/// assert_eq!(dir, Some(PathBuf::from("/output/202310")));
/// ```
pub fn resolve(
    output_dir: &Path,
    file_name: &str,
    folder_type: &FolderType,
    modified: DateTime<Local>,
) -> Option<PathBuf> {
    let year = modified.year().to_string();

    match folder_type {
        FolderType::ByDate => Some(
            output_dir
                .join(&year)
                .join(modified.month().to_string())
                .join(format!("Day {}", modified.day())),
        ),
        FolderType::ByExtension => Some(match extension_of(file_name) {
            Some(ext) => output_dir.join(ext),
            None => output_dir.to_path_buf(),
        }),
        FolderType::ByExtensionYear => Some(match extension_of(file_name) {
            Some(ext) => output_dir.join(ext).join(&year),
            None => output_dir.join(&year),
        }),
        FolderType::Flat => Some(output_dir.to_path_buf()),
        FolderType::ByMonth => Some(output_dir.join(format!("{year}{:02}", modified.month()))),
        FolderType::Delete | FolderType::Unknown(_) => None,
    }
}

/// Extension without the leading dot, if the name has a non-empty one.
fn extension_of(file_name: &str) -> Option<&str> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}
