//! Scripted [`IssueSource`] with call recording and concurrency tracking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use comicdl_core::error::FetchError;
use comicdl_core::source::{ChunkSender, ContentStream, FetchedContent, IssueSource};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum Script {
    Image(Vec<u8>),
    Missing,
    Status(u32),
    /// Never answers until cancelled.
    Stall,
    /// Sends one chunk, then keeps the body open forever.
    StallBody,
    /// Declares `declared` bytes but sends `body`.
    Truncated { declared: u64, body: Vec<u8> },
}

pub fn image_body(id: u64) -> Vec<u8> {
    format!("image {id};").repeat(64).into_bytes()
}

#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<u64, Script>>,
    /// Unscripted ids up to `last` are images, later ones are missing.
    last: Option<u64>,
    total: Option<u64>,
    delay: Duration,
    calls: Mutex<Vec<u64>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    open_bodies: Mutex<Vec<ChunkSender>>,
}

impl ScriptedSource {
    pub fn with_last(last: u64) -> Self {
        Self {
            last: Some(last),
            ..Default::default()
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(self, id: u64, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(id, script);
        self
    }

    /// Ids fetched so far, in call order.
    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn script_for(&self, id: u64) -> Script {
        if let Some(s) = self.scripts.lock().unwrap().get(&id) {
            return s.clone();
        }
        match self.last {
            Some(last) if id > last => Script::Missing,
            Some(_) => Script::Image(image_body(id)),
            None => Script::Stall,
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IssueSource for ScriptedSource {
    async fn total_count(&self, _cancel: &CancellationToken) -> Result<Option<u64>, FetchError> {
        Ok(self.total)
    }

    async fn fetch(&self, id: u64, cancel: &CancellationToken) -> Result<FetchedContent, FetchError> {
        self.calls.lock().unwrap().push(id);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        let png = |stream, size| FetchedContent {
            stream,
            size,
            extension: ".png".to_string(),
        };
        match self.script_for(id) {
            Script::Image(body) => {
                let len = body.len() as u64;
                Ok(png(ContentStream::from_bytes(body), Some(len)))
            }
            Script::Missing => Err(FetchError::EndOfRange),
            Script::Status(code) => Err(FetchError::Status(code)),
            Script::Stall => {
                cancel.cancelled().await;
                Err(FetchError::Cancelled)
            }
            Script::StallBody => {
                let (tx, stream) = ContentStream::channel(4);
                tx.send(Ok(b"first chunk".to_vec()))
                    .await
                    .map_err(|_| FetchError::Cancelled)?;
                self.open_bodies.lock().unwrap().push(tx);
                Ok(png(stream, None))
            }
            Script::Truncated { declared, body } => {
                Ok(png(ContentStream::from_bytes(body), Some(declared)))
            }
        }
    }
}
