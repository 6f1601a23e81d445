//! Sequential writer for an issue's temp file.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Temp file owned by one fetch task. Either [`commit`](TempFile::commit) it
/// into its final name or [`discard`](TempFile::discard) it.
#[derive(Debug)]
pub struct TempFile {
    file: File,
    path: PathBuf,
    written: u64,
}

impl TempFile {
    /// Create (or truncate) the temp file at `path`.
    pub async fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flush, sync and atomically rename to `final_path`. Consumes the writer
    /// and closes the file. Fails if `final_path` is on a different filesystem.
    pub async fn commit(mut self, final_path: &Path) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        drop(self.file);
        tokio::fs::rename(&self.path, final_path).await
    }

    /// Close and remove the temp file. Errors are logged, not returned.
    pub async fn discard(self) {
        drop(self.file);
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "could not remove temp file");
            }
        }
    }
}
