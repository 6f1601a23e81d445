//! Curl transfers for the acomics client.
//!
//! Transfers run on blocking threads. Page requests are buffered; image
//! requests are streamed through a [`ContentStream`] so the fetch task writes
//! the body to disk while it arrives. Cancellation is checked from curl's
//! progress callback, and dropping the stream aborts the transfer on the next
//! write.

use std::cell::RefCell;
use std::io;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::source::stream::{ChunkSender, ContentStream};

/// Chunks buffered between the curl thread and the consumer.
const STREAM_CHUNKS: usize = 16;

#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    user_agent: String,
    proxy: Option<String>,
    connect_timeout: Duration,
    timeout: Duration,
}

/// Buffered response of a page request.
#[derive(Debug)]
pub(crate) struct Page {
    pub head: ResponseHead,
    pub body: Vec<u8>,
}

/// Status line and the headers we care about, from the last response of a
/// (possibly redirected) transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub status: u32,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    /// `Retry-After` in delta-seconds form.
    pub retry_after: Option<Duration>,
    /// URL that answered, after following redirects.
    pub url: String,
    location: Option<String>,
}

impl ResponseHead {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Feed one raw header line as delivered by curl's header callback.
    pub(crate) fn push_line(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            return;
        };
        let line = line.trim();
        if line.starts_with("HTTP/") {
            // New response (redirect hop, 1xx or proxy CONNECT): start over,
            // following the previous hop's Location if it had one.
            let url = match self.location.take() {
                Some(location) => join_location(&self.url, &location),
                None => std::mem::take(&mut self.url),
            };
            *self = ResponseHead::new(&url);
            self.status = line
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse().ok())
                .unwrap_or(0);
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("content-type") {
                self.content_type = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("retry-after") {
                self.retry_after = value.parse::<u64>().ok().map(Duration::from_secs);
            } else if name.eq_ignore_ascii_case("location") {
                self.location = Some(value.to_string());
            }
        }
    }
}

fn join_location(base: &str, location: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(location))
        .map(String::from)
        .unwrap_or_else(|_| location.to_string())
}

fn transfer_error(e: curl::Error, cancel: &CancellationToken) -> FetchError {
    if cancel.is_cancelled() {
        FetchError::Cancelled
    } else {
        FetchError::Transport(e)
    }
}

impl HttpClient {
    pub(crate) fn new(cfg: &HttpConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            proxy: cfg.proxy.clone().filter(|p| !p.is_empty()),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    fn easy(&self, url: &str) -> Result<curl::easy::Easy, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        if let Some(proxy) = &self.proxy {
            easy.proxy(proxy)?;
        }
        easy.connect_timeout(self.connect_timeout)?;
        if !self.timeout.is_zero() {
            easy.timeout(self.timeout)?;
        }
        easy.progress(true)?;
        Ok(easy)
    }

    /// GET `url` and buffer the whole body.
    pub(crate) async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Page, FetchError> {
        let client = self.clone();
        let url = url.to_string();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || client.get_blocking(&url, &cancel))
            .await
            .map_err(|e| FetchError::Read(io::Error::other(format!("page task join: {}", e))))?
    }

    fn get_blocking(&self, url: &str, cancel: &CancellationToken) -> Result<Page, FetchError> {
        let mut easy = self.easy(url)?;
        let mut head = ResponseHead::new(url);
        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                head.push_line(line);
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer
                .perform()
                .map_err(|e| transfer_error(e, cancel))?;
        }
        head.status = easy.response_code()?;
        tracing::debug!(url, status = head.status, bytes = body.len(), "page fetched");
        Ok(Page { head, body })
    }

    /// GET `url`, returning as soon as the response head is known. The body
    /// keeps arriving through the returned stream.
    pub(crate) async fn get_stream(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(ResponseHead, ContentStream), FetchError> {
        let (head_tx, head_rx) = oneshot::channel();
        let (chunk_tx, stream) = ContentStream::channel(STREAM_CHUNKS);
        let client = self.clone();
        let url_owned = url.to_string();
        let cancel_bg = cancel.clone();
        tokio::task::spawn_blocking(move || {
            client.stream_blocking(&url_owned, &cancel_bg, head_tx, chunk_tx)
        });

        let head = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            head = head_rx => head.map_err(|_| {
                FetchError::Protocol(format!("transfer of {} ended without a response", url))
            })??,
        };
        Ok((head, stream))
    }

    fn stream_blocking(
        &self,
        url: &str,
        cancel: &CancellationToken,
        head_tx: oneshot::Sender<Result<ResponseHead, FetchError>>,
        chunk_tx: ChunkSender,
    ) {
        let head = RefCell::new(ResponseHead::new(url));
        let mut head_tx = Some(head_tx);

        let result = (|| -> Result<(), curl::Error> {
            let mut easy = self.easy(url)?;
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                head.borrow_mut().push_line(line);
                true
            })?;
            transfer.write_function(|data| {
                if let Some(tx) = head_tx.take() {
                    if tx.send(Ok(head.borrow().clone())).is_err() {
                        return Ok(0); // caller gave up: abort transfer
                    }
                }
                match chunk_tx.blocking_send(Ok(data.to_vec())) {
                    Ok(()) => Ok(data.len()),
                    Err(_) => Ok(0), // stream dropped: abort transfer
                }
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer.perform()
        })();

        match result {
            Ok(()) => {
                // Empty body: the head was never sent from the write callback.
                if let Some(tx) = head_tx.take() {
                    let _ = tx.send(Ok(head.into_inner()));
                }
            }
            Err(e) if e.is_write_error() && head_tx.is_none() && !cancel.is_cancelled() => {
                tracing::debug!(url, "image transfer aborted by consumer");
            }
            Err(e) => {
                let err = transfer_error(e, cancel);
                match head_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(err));
                    }
                    None => {
                        let _ = chunk_tx.blocking_send(Err(io::Error::other(err.to_string())));
                    }
                }
            }
        }
    }
}
