//! Run control: the abort error returned at suspension points and the
//! deadline that cancels a run from the outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Returned by a suspension point that observed cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run aborted")]
pub struct Aborted;

/// Cancels `token` once `after` has elapsed. Dropping the deadline disarms it.
pub struct Deadline {
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Deadline {
    /// Must be called from within a tokio runtime.
    pub fn arm(token: CancellationToken, after: Duration) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    flag.store(true, Ordering::Release);
                    tracing::warn!(after_secs = after.as_secs_f64(), "run deadline reached, cancelling");
                    token.cancel();
                }
            }
        });
        Self { fired, handle }
    }

    /// True if the deadline elapsed and cancelled the token.
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
