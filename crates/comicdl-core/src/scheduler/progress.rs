//! Progress events emitted while a range is downloaded.

use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A fetch task for `id` was started.
    Admitted { id: u64, at: Instant },
    /// A final file for `id` already existed.
    Skipped { id: u64 },
    Downloaded { id: u64, bytes: u64 },
    /// `id` does not exist; no later issues are admitted.
    EndOfRange { id: u64 },
    Failed { id: u64 },
    Cancelled { id: u64 },
}

impl ProgressEvent {
    pub fn id(&self) -> u64 {
        match self {
            ProgressEvent::Admitted { id, .. }
            | ProgressEvent::Skipped { id }
            | ProgressEvent::Downloaded { id, .. }
            | ProgressEvent::EndOfRange { id }
            | ProgressEvent::Failed { id }
            | ProgressEvent::Cancelled { id } => *id,
        }
    }
}

/// Optional sink. Sending never waits: events are dropped while the
/// receiver is full, and a missing or closed receiver is ignored.
#[derive(Debug, Clone, Default)]
pub(crate) struct Progress(Option<mpsc::Sender<ProgressEvent>>);

impl Progress {
    pub(crate) fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self(Some(tx))
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        let Some(tx) = &self.0 else {
            return;
        };
        if let Err(mpsc::error::TrySendError::Full(event)) = tx.try_send(event) {
            tracing::trace!(issue = event.id(), "progress receiver is behind, event dropped");
        }
    }
}
