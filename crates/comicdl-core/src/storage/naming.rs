//! Deterministic file names for issues.

use std::path::{Path, PathBuf};

use crate::source::KNOWN_EXTENSIONS;

use super::temp_path;

/// Padding used when the upper bound of the range is unknown.
pub const DEFAULT_WIDTH: usize = 5;

/// Number of decimal digits of `upper` (at least 1).
pub fn width_for(upper: u64) -> usize {
    let mut width = 1;
    let mut n = upper / 10;
    while n > 0 {
        n /= 10;
        width += 1;
    }
    width
}

/// Maps issue ids to paths inside one output directory.
#[derive(Debug, Clone)]
pub struct IssueNaming {
    dir: PathBuf,
    width: usize,
}

impl IssueNaming {
    pub fn new(dir: impl Into<PathBuf>, width: usize) -> Self {
        Self {
            dir: dir.into(),
            width: width.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Zero-padded issue number, e.g. `00012`.
    pub fn stem(&self, id: u64) -> String {
        format!("{:0width$}", id, width = self.width)
    }

    /// Path without extension; the final file is this plus the resolved extension.
    pub fn stem_path(&self, id: u64) -> PathBuf {
        self.dir.join(self.stem(id))
    }

    pub fn temp_path(&self, id: u64) -> PathBuf {
        temp_path(&self.stem_path(id))
    }

    /// `ext` includes the leading dot.
    pub fn final_path(&self, id: u64, ext: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.stem(id), ext))
    }

    /// Final file for `id` under any known extension, if one exists.
    pub async fn existing_final(&self, id: u64) -> std::io::Result<Option<PathBuf>> {
        for ext in KNOWN_EXTENSIONS {
            let candidate = self.final_path(id, ext);
            if tokio::fs::try_exists(&candidate).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
