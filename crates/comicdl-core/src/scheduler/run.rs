//! Download run: admission loop, task supervision, outcome mapping and the
//! optional archive step.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::archive;
use crate::config::{ComicdlConfig, EndOfRangePolicy};
use crate::control::Deadline;
use crate::error::{FetchError, RunError};
use crate::source::IssueSource;
use crate::storage::{width_for, IssueNaming};

use super::admission::Admission;
use super::aggregate::{Aggregator, IssueResult, RunSummary};
use super::progress::{Progress, ProgressEvent};
use super::task::{IssueTask, Prepared};
use super::tickets::TicketPool;

/// Knobs for a run, normally taken from [`ComicdlConfig`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Minimum spacing between two fetch starts.
    pub throttle: Duration,
    pub tickets: usize,
    /// File name width when neither `to` nor the remote total is known.
    pub default_width: usize,
    pub end_of_range: EndOfRangePolicy,
    pub deadline: Option<Duration>,
}

impl RunOptions {
    pub fn from_config(cfg: &ComicdlConfig) -> Self {
        Self {
            throttle: cfg.throttle(),
            tickets: cfg.tickets.max(1),
            default_width: cfg.default_width.max(1),
            end_of_range: cfg.end_of_range,
            deadline: cfg.deadline(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&ComicdlConfig::default())
    }
}

/// Which issues to fetch and where to put them.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub from: u64,
    /// Inclusive upper bound; `None` runs until the end of published issues.
    pub to: Option<u64>,
    pub output_dir: PathBuf,
    /// Pack the output directory into this file after a successful run.
    pub archive: Option<PathBuf>,
}

impl DownloadPlan {
    pub fn validate(&self) -> Result<(), RunError> {
        if self.from == 0 {
            return Err(RunError::InvalidRange("issue ids start at 1".into()));
        }
        if let Some(to) = self.to {
            if to < self.from {
                return Err(RunError::InvalidRange(format!(
                    "--to {} is below --from {}",
                    to, self.from
                )));
            }
        }
        Ok(())
    }
}

pub struct Downloader {
    source: Arc<dyn IssueSource>,
    options: RunOptions,
    tickets: Arc<TicketPool>,
    progress: Progress,
}

impl Downloader {
    pub fn new(source: Arc<dyn IssueSource>, options: RunOptions) -> Self {
        let tickets = Arc::new(TicketPool::new(options.tickets));
        Self {
            source,
            options,
            tickets,
            progress: Progress::default(),
        }
    }

    /// Send progress events to `tx` while running.
    pub fn with_progress(mut self, tx: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress = Progress::new(tx);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn tickets(&self) -> Arc<TicketPool> {
        Arc::clone(&self.tickets)
    }

    /// Download `plan`. Cancelling `cancel` stops admission and aborts
    /// in-flight issues at their next suspension point.
    pub async fn run(
        &self,
        plan: &DownloadPlan,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        plan.validate()?;
        tokio::fs::create_dir_all(&plan.output_dir)
            .await
            .map_err(|source| RunError::OutputDir {
                path: plan.output_dir.clone(),
                source,
            })?;

        let scope = cancel.child_token();
        let deadline = self
            .options
            .deadline
            .map(|after| Deadline::arm(scope.clone(), after));
        let timed_out = |deadline: &Option<Deadline>| deadline.as_ref().is_some_and(Deadline::fired);

        let width = match self.width(plan, &scope).await {
            Ok(w) => w,
            Err(FetchError::Cancelled) if timed_out(&deadline) => return Err(RunError::DeadlineExceeded),
            Err(FetchError::Cancelled) => return Err(RunError::Cancelled),
            Err(e) => return Err(RunError::TotalCount(e)),
        };
        let naming = IssueNaming::new(&plan.output_dir, width);
        tracing::info!(
            from = plan.from,
            to = ?plan.to,
            width,
            dir = %plan.output_dir.display(),
            "starting download"
        );

        let (aggregator, interrupted) = self.download_range(plan, &naming, &scope).await;
        let incomplete = interrupted || aggregator.cancelled() > 0;
        let fired = timed_out(&deadline);
        drop(deadline);

        let mut summary = aggregator.finish()?;
        if incomplete {
            return Err(if fired {
                RunError::DeadlineExceeded
            } else {
                RunError::Cancelled
            });
        }
        tracing::info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            bytes = summary.bytes,
            end_of_range = ?summary.end_of_range,
            "download finished"
        );

        if let Some(dest) = &plan.archive {
            let packed = archive::build_archive(&plan.output_dir, dest)
                .await
                .map_err(RunError::Archive)?;
            tracing::info!(path = %dest.display(), entries = packed.entries, "archive written");
            summary.archive = Some(dest.clone());
        }
        Ok(summary)
    }

    async fn width(&self, plan: &DownloadPlan, cancel: &CancellationToken) -> Result<usize, FetchError> {
        if let Some(to) = plan.to {
            return Ok(width_for(to));
        }
        Ok(match self.source.total_count(cancel).await? {
            Some(total) => width_for(total),
            None => self.options.default_width,
        })
    }

    /// Admission loop plus drain. Returns the aggregator and whether admission
    /// was cut short by cancellation with ids still pending.
    async fn download_range(
        &self,
        plan: &DownloadPlan,
        naming: &IssueNaming,
        scope: &CancellationToken,
    ) -> (Aggregator, bool) {
        let mut aggregator = Aggregator::new(self.options.end_of_range, scope.clone());
        let mut admission = Admission::new(plan.from, plan.to, self.options.throttle);
        let mut tasks: JoinSet<IssueResult> = JoinSet::new();
        let mut interrupted = false;

        while let Some(id) = admission.peek() {
            if aggregator.stop_admission() {
                break;
            }
            if scope.is_cancelled() {
                interrupted = true;
                break;
            }

            let task = match IssueTask::prepare(naming, id).await {
                Ok(Prepared::Fetch(task)) => task,
                Ok(Prepared::Skip(outcome)) => {
                    admission.advance();
                    self.record(&mut aggregator, Ok((id, Ok(outcome))));
                    continue;
                }
                Err(e) => {
                    admission.advance();
                    self.record(&mut aggregator, Ok((id, Err(e))));
                    continue;
                }
            };

            // Wait for the pacing slot, collecting finished tasks meanwhile.
            loop {
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => break,
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        self.record(&mut aggregator, joined);
                        if aggregator.stop_admission() {
                            break;
                        }
                    }
                    _ = admission.wait_slot() => break,
                }
            }
            if aggregator.stop_admission() {
                break;
            }
            if scope.is_cancelled() {
                interrupted = true;
                break;
            }

            let at = admission.mark_admitted();
            admission.advance();
            tracing::debug!(issue = task.id(), "admitting issue");
            self.progress.emit(ProgressEvent::Admitted { id, at });

            let source = Arc::clone(&self.source);
            let tickets = Arc::clone(&self.tickets);
            let cancel = scope.clone();
            tasks.spawn(async move {
                let result = task.run(source.as_ref(), &tickets, &cancel).await;
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.record(&mut aggregator, joined);
        }
        (aggregator, interrupted)
    }

    fn record(
        &self,
        aggregator: &mut Aggregator,
        joined: Result<IssueResult, tokio::task::JoinError>,
    ) {
        if let Some(event) = aggregator.record(joined) {
            self.progress.emit(event);
        }
    }
}
