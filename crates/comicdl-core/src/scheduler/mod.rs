//! Range scheduling: paced admission of issue ids, a ticket pool bounding
//! concurrent fetches, and aggregation of per-issue results into one outcome.

mod admission;
mod aggregate;
mod progress;
mod run;
mod task;
mod tickets;

pub use aggregate::RunSummary;
pub use progress::ProgressEvent;
pub use run::{DownloadPlan, Downloader, RunOptions};
pub use task::IssueOutcome;
pub use tickets::{Ticket, TicketPool};
