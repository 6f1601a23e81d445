//! Inspection of an output directory: which issues are cached, stale temp
//! files, and gaps in a range.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::source::is_known_extension;
use crate::storage::is_temp_name;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheReport {
    pub dir: PathBuf,
    /// Issue id to file name.
    pub issues: BTreeMap<u64, String>,
    pub temp_files: Vec<String>,
    pub other_files: Vec<String>,
}

impl CacheReport {
    /// Scan `dir`. A missing directory is an empty cache.
    pub fn scan(dir: &Path) -> io::Result<Self> {
        let mut report = CacheReport {
            dir: dir.to_path_buf(),
            ..Default::default()
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_temp_name(&name) {
                report.temp_files.push(name);
            } else if let Some(id) = issue_id(&name) {
                report.issues.insert(id, name);
            } else {
                report.other_files.push(name);
            }
        }
        report.temp_files.sort();
        report.other_files.sort();
        Ok(report)
    }

    pub fn last_issue(&self) -> Option<u64> {
        self.issues.keys().next_back().copied()
    }

    /// Ids in `from..=to` with no cached file.
    pub fn missing(&self, from: u64, to: u64) -> Vec<u64> {
        (from..=to).filter(|id| !self.issues.contains_key(id)).collect()
    }
}

/// `00042.png` -> 42, for known image extensions only.
fn issue_id(name: &str) -> Option<u64> {
    let dot = name.rfind('.')?;
    let (stem, ext) = name.split_at(dot);
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) || !is_known_extension(ext) {
        return None;
    }
    stem.parse().ok()
}
