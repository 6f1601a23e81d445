//! Ticket pool bounding the number of issues fetched at once.
//!
//! A ticket is held for the whole network + disk phase of one issue and is
//! returned when the [`Ticket`] guard drops, whatever path the task exits by.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

use crate::control::Aborted;

#[derive(Debug)]
pub struct TicketPool {
    permits: Semaphore,
    capacity: usize,
    outstanding: AtomicUsize,
    peak: AtomicUsize,
}

/// One unit of fetch capacity. Returned to the pool on drop.
#[derive(Debug)]
pub struct Ticket<'a> {
    pool: &'a TicketPool,
    _permit: SemaphorePermit<'a>,
}

impl TicketPool {
    /// Create a pool with `capacity` tickets (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            outstanding: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tickets currently held.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Highest number of tickets ever held at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Wait for a free ticket, or fail with [`Aborted`] once `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Ticket<'_>, Aborted> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Aborted),
            permit = self.permits.acquire() => permit.map_err(|_| Aborted)?,
        };
        let now = self.outstanding.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        Ok(Ticket {
            pool: self,
            _permit: permit,
        })
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so `outstanding` never
        // exceeds the number of permits handed out.
        self.pool.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}
