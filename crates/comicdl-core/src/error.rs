//! Error taxonomy for sources, single issues, whole runs and archive packing.
//!
//! Issue-level errors are classified into [`FailureKind`] so the aggregator can
//! tell the benign end-of-range signal apart from disqualifying failures.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by an [`IssueSource`](crate::source::IssueSource).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The requested issue does not exist (past the last published one).
    #[error("issue is not found")]
    EndOfRange,
    /// Remote answered with a status other than 200.
    #[error("unexpected status {0}")]
    Status(u32),
    /// Remote asked us to slow down (429/503), possibly saying for how long.
    #[error("throttled with status {status}")]
    Throttled {
        status: u32,
        retry_after: Option<Duration>,
    },
    /// Curl reported an error (timeout, connection, TLS, proxy...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// Remote content did not look like what we expect (missing image, bad page).
    #[error("{0}")]
    Protocol(String),
    /// Reading the content stream failed.
    #[error("streaming content: {0}")]
    Read(#[source] io::Error),
    /// Stream ended before the declared size was received.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    Incomplete { expected: u64, received: u64 },
    /// Transfer was aborted because the run was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// Coarse classification used by the aggregator (see [`IssueError::kind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Benign: there are no issues past this one.
    EndOfRange,
    /// Obtaining or reading remote content failed.
    Fetch,
    /// Local create/write/rename failed.
    Filesystem,
    /// Observed cancellation caused by someone else.
    Cancelled,
}

/// Failure of a single issue task.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("issue {id}: past the last published issue")]
    EndOfRange { id: u64 },
    #[error("issue {id}: {source}")]
    Fetch {
        id: u64,
        #[source]
        source: FetchError,
    },
    #[error("issue {id}: {op} {}: {source}", .path.display())]
    Filesystem {
        id: u64,
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("issue {id}: cancelled")]
    Cancelled { id: u64 },
}

impl IssueError {
    /// Wraps a source error, keeping the end-of-range and cancellation signals distinct.
    pub fn from_fetch(id: u64, err: FetchError) -> Self {
        match err {
            FetchError::EndOfRange => IssueError::EndOfRange { id },
            FetchError::Cancelled => IssueError::Cancelled { id },
            source => IssueError::Fetch { id, source },
        }
    }

    pub(crate) fn filesystem(
        id: u64,
        op: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        IssueError::Filesystem {
            id,
            op,
            path: path.into(),
            source,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            IssueError::EndOfRange { id }
            | IssueError::Fetch { id, .. }
            | IssueError::Filesystem { id, .. }
            | IssueError::Cancelled { id } => *id,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            IssueError::EndOfRange { .. } => FailureKind::EndOfRange,
            IssueError::Fetch { .. } => FailureKind::Fetch,
            IssueError::Filesystem { .. } => FailureKind::Filesystem,
            IssueError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

/// Failure while packing the output directory into an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("reading cache dir {}: {source}", .path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("creating archive {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storing file {name}: {source}")]
    Store {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("writing archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive task join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Overall result of a download run; only the first disqualifying cause is kept.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("preparing output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("counting issues: {0}")]
    TotalCount(#[source] FetchError),
    #[error("downloading issues: {0}")]
    Issue(#[source] IssueError),
    #[error("issue task join: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("run cancelled before the range was complete")]
    Cancelled,
    #[error("deadline exceeded before the range was complete")]
    DeadlineExceeded,
    #[error("generating cbz file: {0}")]
    Archive(#[source] ArchiveError),
}
