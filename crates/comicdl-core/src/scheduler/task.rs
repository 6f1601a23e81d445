//! One issue: resume check, ticketed fetch, streamed write to a temp file and
//! the atomic rename that publishes it.

use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, IssueError};
use crate::source::{FetchedContent, IssueSource};
use crate::storage::{IssueNaming, TempFile};

use super::tickets::TicketPool;

/// Successful end state of one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// A final file was already present; nothing was fetched.
    Skipped { path: PathBuf },
}

pub(crate) enum Prepared {
    Skip(IssueOutcome),
    Fetch(IssueTask),
}

#[derive(Debug)]
pub(crate) struct IssueTask {
    id: u64,
    naming: IssueNaming,
    temp: PathBuf,
}

impl IssueTask {
    /// Remove a leftover temp file and check for an existing final file.
    pub(crate) async fn prepare(naming: &IssueNaming, id: u64) -> Result<Prepared, IssueError> {
        let temp = naming.temp_path(id);
        match tokio::fs::remove_file(&temp).await {
            Ok(()) => tracing::debug!(issue = id, path = %temp.display(), "removed stale temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(IssueError::filesystem(id, "removing", temp, e)),
        }

        let existing = naming
            .existing_final(id)
            .await
            .map_err(|e| IssueError::filesystem(id, "checking", naming.stem_path(id), e))?;
        if let Some(path) = existing {
            tracing::debug!(issue = id, path = %path.display(), "already downloaded");
            return Ok(Prepared::Skip(IssueOutcome::Skipped { path }));
        }

        Ok(Prepared::Fetch(IssueTask {
            id,
            naming: naming.clone(),
            temp,
        }))
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Fetch and store the issue. The ticket is held from before the fetch
    /// until the file is committed or discarded.
    pub(crate) async fn run(
        self,
        source: &dyn IssueSource,
        tickets: &TicketPool,
        cancel: &CancellationToken,
    ) -> Result<IssueOutcome, IssueError> {
        let id = self.id;
        let _ticket = tickets
            .acquire(cancel)
            .await
            .map_err(|_| IssueError::Cancelled { id })?;

        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IssueError::Cancelled { id }),
            res = source.fetch(id, cancel) => res.map_err(|e| IssueError::from_fetch(id, e))?,
        };

        let final_path = self.naming.final_path(id, &content.extension);
        let mut temp = TempFile::create(&self.temp)
            .await
            .map_err(|e| IssueError::filesystem(id, "creating", &self.temp, e))?;

        if let Err(e) = stream_into(id, content, &mut temp, cancel).await {
            temp.discard().await;
            return Err(e);
        }

        let bytes = temp.written();
        if let Err(e) = temp.commit(&final_path).await {
            remove_quietly(&self.temp).await;
            return Err(IssueError::filesystem(id, "committing", final_path, e));
        }
        tracing::debug!(issue = id, path = %final_path.display(), bytes, "issue stored");
        Ok(IssueOutcome::Downloaded {
            path: final_path,
            bytes,
        })
    }
}

async fn stream_into(
    id: u64,
    mut content: FetchedContent,
    temp: &mut TempFile,
    cancel: &CancellationToken,
) -> Result<(), IssueError> {
    let temp_path = temp.path().to_path_buf();
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IssueError::Cancelled { id }),
            chunk = content.stream.next_chunk() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        let data = chunk.map_err(|e| IssueError::from_fetch(id, FetchError::Read(e)))?;
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IssueError::Cancelled { id }),
            res = temp.write_chunk(&data) => res,
        };
        written.map_err(|e| IssueError::filesystem(id, "writing", &temp_path, e))?;
    }

    if let Some(expected) = content.size {
        let received = temp.written();
        if received != expected {
            return Err(IssueError::from_fetch(
                id,
                FetchError::Incomplete { expected, received },
            ));
        }
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file");
        }
    }
}
