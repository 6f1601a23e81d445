//! Retry and backoff policy for page requests.
//!
//! Transport failures and server errors back off exponentially; throttling
//! answers honour `Retry-After`. The end-of-range signal and cancellation
//! are never retried.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{RetryPolicy, Transient};
pub use run::run_with_retry;
