//! CBZ packing: every cached issue file becomes one stored (uncompressed)
//! entry of a zip archive, named after the file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::storage::is_temp_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Regular files of a directory, sorted by name, without temp files.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub bytes: u64,
}

impl Manifest {
    /// List `dir`. `exclude` (usually the archive being written) is left out
    /// when it lives in `dir`.
    pub fn snapshot(dir: &Path, exclude: Option<&Path>) -> Result<Self, ArchiveError> {
        let list_err = |source| ArchiveError::ListDir {
            path: dir.to_path_buf(),
            source,
        };
        let excluded = exclude.and_then(|dest| excluded_name(dir, dest));

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            if !entry.file_type().map_err(list_err)?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 file name");
                continue;
            };
            if is_temp_name(&name) || excluded.as_deref() == Some(name.as_str()) {
                continue;
            }
            entries.push(ManifestEntry {
                name,
                path: entry.path(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the manifest to `dest`, replacing any existing file.
    pub fn write_zip(&self, dest: &Path) -> Result<ArchiveSummary, ArchiveError> {
        let create_err = |source| ArchiveError::Create {
            path: dest.to_path_buf(),
            source,
        };
        let file = File::create(dest).map_err(create_err)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);

        let mut bytes = 0u64;
        for entry in &self.entries {
            let store_err = |source| ArchiveError::Store {
                name: entry.name.clone(),
                source,
            };
            zip.start_file(entry.name.as_str(), options)?;
            let mut src = File::open(&entry.path).map_err(store_err)?;
            bytes += io::copy(&mut src, &mut zip).map_err(store_err)?;
        }
        let mut out = zip.finish()?;
        out.flush().map_err(create_err)?;
        Ok(ArchiveSummary {
            entries: self.entries.len(),
            bytes,
        })
    }
}

/// File name of `dest` if its parent is `dir`.
fn excluded_name(dir: &Path, dest: &Path) -> Option<String> {
    let name = dest.file_name()?.to_str()?.to_owned();
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let same = std::fs::canonicalize(parent).ok()? == std::fs::canonicalize(dir).ok()?;
    same.then_some(name)
}

/// Pack `dir` into `dest` on a blocking thread.
pub async fn build_archive(dir: &Path, dest: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let dir = dir.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let manifest = Manifest::snapshot(&dir, Some(&dest))?;
        if manifest.is_empty() {
            tracing::warn!(dir = %dir.display(), "packing an empty directory");
        }
        manifest.write_zip(&dest)
    })
    .await?
}
