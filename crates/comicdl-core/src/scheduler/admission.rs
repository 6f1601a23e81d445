//! Ascending admission over the id range with a minimum spacing between
//! consecutive fetch starts.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub(crate) struct Admission {
    next: u64,
    to: Option<u64>,
    /// Set once `next` would overflow past `u64::MAX`.
    exhausted: bool,
    throttle: Duration,
    next_slot: Option<Instant>,
}

impl Admission {
    pub(crate) fn new(from: u64, to: Option<u64>, throttle: Duration) -> Self {
        Self {
            next: from,
            to,
            exhausted: false,
            throttle,
            next_slot: None,
        }
    }

    /// Next id to consider, or `None` once the upper bound is passed.
    pub(crate) fn peek(&self) -> Option<u64> {
        match self.to {
            _ if self.exhausted => None,
            Some(to) if self.next > to => None,
            _ => Some(self.next),
        }
    }

    pub(crate) fn advance(&mut self) {
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
    }

    /// Resolves when the next admission may start. Immediate for the first one.
    pub(crate) async fn wait_slot(&self) {
        if let Some(at) = self.next_slot {
            tokio::time::sleep_until(at).await;
        }
    }

    /// Record an admission now; the following one waits a full throttle interval.
    pub(crate) fn mark_admitted(&mut self) -> Instant {
        let now = Instant::now();
        self.next_slot = Some(now + self.throttle);
        now
    }
}
