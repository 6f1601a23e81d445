//! Chunked byte stream between a producer (blocking transfer) and the fetch task.

use std::fmt;
use std::io;

use tokio::sync::mpsc;

/// Producer half of a [`ContentStream`]. Sending fails once the stream is dropped,
/// which producers treat as "abort the transfer".
pub type ChunkSender = mpsc::Sender<io::Result<Vec<u8>>>;

/// Bounded stream of body chunks. The stream ends when every sender is gone.
pub struct ContentStream {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
}

impl ContentStream {
    /// Create a stream with room for `capacity` in-flight chunks.
    pub fn channel(capacity: usize) -> (ChunkSender, ContentStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, ContentStream { rx })
    }

    /// A finished stream holding `data` as a single chunk.
    pub fn from_bytes(data: Vec<u8>) -> ContentStream {
        let (tx, stream) = Self::channel(1);
        if !data.is_empty() {
            // Capacity 1 and a fresh channel: cannot be full or closed.
            let _ = tx.try_send(Ok(data));
        }
        stream
    }

    /// Next chunk, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Vec<u8>>> {
        self.rx.recv().await
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream").finish_non_exhaustive()
    }
}
