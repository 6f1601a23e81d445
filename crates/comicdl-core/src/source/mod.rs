//! Remote issue sources.
//!
//! An [`IssueSource`] turns an issue id into a byte stream plus metadata. The
//! orchestration layer only depends on this trait; [`AcomicsClient`] is the
//! production implementation.

pub mod acomics;
mod extension;
mod stream;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

pub use acomics::AcomicsClient;
pub use extension::{is_known_extension, resolve_extension, DEFAULT_EXTENSION, KNOWN_EXTENSIONS};
pub use stream::{ChunkSender, ContentStream};

/// Content of one issue as handed out by a source.
#[derive(Debug)]
pub struct FetchedContent {
    pub stream: ContentStream,
    /// Declared size in bytes, if the remote announced one.
    pub size: Option<u64>,
    /// File extension including the leading dot, e.g. `.png`.
    pub extension: String,
}

/// Capability consumed by the downloader.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Number of published issues, used to size the file name padding when no
    /// upper bound was requested. `Ok(None)` means the source cannot tell.
    async fn total_count(&self, cancel: &CancellationToken) -> Result<Option<u64>, FetchError>;

    /// Fetch issue `id`. Returns `FetchError::EndOfRange` when the issue does not exist.
    async fn fetch(&self, id: u64, cancel: &CancellationToken) -> Result<FetchedContent, FetchError>;
}
