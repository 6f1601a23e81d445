//! Collects issue results. The first disqualifying failure is kept and
//! cancels the run; end-of-range only stops admission (unless the policy
//! makes it fatal); cancellations caused by the run's own abort are counted.

use std::path::PathBuf;

use serde::Serialize;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::config::EndOfRangePolicy;
use crate::error::{FailureKind, IssueError, RunError};

use super::progress::ProgressEvent;
use super::task::IssueOutcome;

/// What a finished run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub downloaded: u64,
    pub skipped: u64,
    pub bytes: u64,
    /// Lowest id reported as past the last published issue.
    pub end_of_range: Option<u64>,
    pub archive: Option<PathBuf>,
}

pub(crate) type IssueResult = (u64, Result<IssueOutcome, IssueError>);

#[derive(Debug)]
pub(crate) struct Aggregator {
    policy: EndOfRangePolicy,
    cancel: CancellationToken,
    summary: RunSummary,
    first_error: Option<RunError>,
    cancelled: u64,
}

impl Aggregator {
    pub(crate) fn new(policy: EndOfRangePolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            cancel,
            summary: RunSummary::default(),
            first_error: None,
            cancelled: 0,
        }
    }

    /// Record one joined task (or an inline result from admission).
    pub(crate) fn record(&mut self, joined: Result<IssueResult, JoinError>) -> Option<ProgressEvent> {
        let (id, result) = match joined {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "issue task did not complete");
                self.fail(RunError::Join(e));
                return None;
            }
        };

        match result {
            Ok(IssueOutcome::Downloaded { bytes, .. }) => {
                self.summary.downloaded += 1;
                self.summary.bytes += bytes;
                Some(ProgressEvent::Downloaded { id, bytes })
            }
            Ok(IssueOutcome::Skipped { .. }) => {
                self.summary.skipped += 1;
                Some(ProgressEvent::Skipped { id })
            }
            Err(e) => match e.kind() {
                FailureKind::EndOfRange if self.policy == EndOfRangePolicy::Stop => {
                    let lowest = self.summary.end_of_range.map_or(id, |prev| prev.min(id));
                    if self.summary.end_of_range.is_none() {
                        tracing::info!(issue = id, "reached the end of published issues");
                    }
                    self.summary.end_of_range = Some(lowest);
                    Some(ProgressEvent::EndOfRange { id })
                }
                FailureKind::Cancelled => {
                    self.cancelled += 1;
                    tracing::debug!(issue = id, "issue cancelled");
                    Some(ProgressEvent::Cancelled { id })
                }
                _ => {
                    tracing::warn!(issue = id, error = %e, "unable to download issue");
                    self.fail(RunError::Issue(e));
                    Some(ProgressEvent::Failed { id })
                }
            },
        }
    }

    fn fail(&mut self, err: RunError) {
        if self.first_error.is_none() {
            self.first_error = Some(err);
            self.cancel.cancel();
        }
    }

    /// No further ids should be admitted.
    pub(crate) fn stop_admission(&self) -> bool {
        self.first_error.is_some() || self.summary.end_of_range.is_some()
    }

    /// Tasks that ended because the run was cancelled.
    pub(crate) fn cancelled(&self) -> u64 {
        self.cancelled
    }

    pub(crate) fn finish(self) -> Result<RunSummary, RunError> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn downloaded(id: u64, bytes: u64) -> Result<IssueResult, JoinError> {
        Ok((
            id,
            Ok(IssueOutcome::Downloaded {
                path: PathBuf::from(format!("{id}.png")),
                bytes,
            }),
        ))
    }

    fn failed(id: u64, err: FetchError) -> Result<IssueResult, JoinError> {
        Ok((id, Err(IssueError::from_fetch(id, err))))
    }

    #[test]
    fn counts_successes() {
        let token = CancellationToken::new();
        let mut agg = Aggregator::new(EndOfRangePolicy::Stop, token.clone());
        agg.record(downloaded(1, 10));
        agg.record(downloaded(2, 5));
        agg.record(Ok((3, Ok(IssueOutcome::Skipped { path: "3.png".into() }))));
        let summary = agg.finish().unwrap();
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.bytes, 15);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn first_failure_wins_and_cancels() {
        let token = CancellationToken::new();
        let mut agg = Aggregator::new(EndOfRangePolicy::Stop, token.clone());
        assert_eq!(
            agg.record(failed(4, FetchError::Status(500))),
            Some(ProgressEvent::Failed { id: 4 })
        );
        assert!(token.is_cancelled());
        agg.record(failed(5, FetchError::Status(502)));
        agg.record(Ok((6, Err(IssueError::Cancelled { id: 6 }))));
        assert_eq!(agg.cancelled(), 1);
        match agg.finish() {
            Err(RunError::Issue(e)) => assert_eq!(e.id(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn end_of_range_is_benign_and_keeps_lowest() {
        let token = CancellationToken::new();
        let mut agg = Aggregator::new(EndOfRangePolicy::Stop, token.clone());
        agg.record(failed(12, FetchError::EndOfRange));
        agg.record(failed(10, FetchError::EndOfRange));
        assert!(agg.stop_admission());
        assert!(!token.is_cancelled());
        assert_eq!(agg.finish().unwrap().end_of_range, Some(10));
    }

    #[test]
    fn end_of_range_fails_under_strict_policy() {
        let token = CancellationToken::new();
        let mut agg = Aggregator::new(EndOfRangePolicy::Fail, token.clone());
        agg.record(failed(10, FetchError::EndOfRange));
        assert!(token.is_cancelled());
        assert!(matches!(agg.finish(), Err(RunError::Issue(IssueError::EndOfRange { id: 10 }))));
    }
}
