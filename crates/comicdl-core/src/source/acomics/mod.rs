//! acomics.ru issue source.
//!
//! Issue `N` of comic `hero` lives at `{base}/~hero/N`. The page carries the
//! image in `#mainImage` and an `N/TOTAL` counter in `.issueNumber`. Asking
//! for an issue past the last one either returns 404 or renders a different
//! issue; both are reported as end of range.

mod http;
mod page;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::retry::{run_with_retry, RetryPolicy};

use super::{resolve_extension, FetchedContent, IssueSource};
use self::http::HttpClient;

pub struct AcomicsClient {
    comic: String,
    base: Url,
    http: HttpClient,
    retry: RetryPolicy,
}

impl AcomicsClient {
    pub fn new(comic: &str, cfg: &HttpConfig, retry: RetryPolicy) -> Result<Self, FetchError> {
        let comic = comic.trim().trim_start_matches('~');
        if comic.is_empty() || comic.contains('/') {
            return Err(FetchError::Protocol(format!("invalid comic name {:?}", comic)));
        }
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| FetchError::Protocol(format!("invalid base url {}: {}", cfg.base_url, e)))?;
        Ok(Self {
            comic: comic.to_string(),
            base,
            http: HttpClient::new(cfg),
            retry,
        })
    }

    pub fn comic(&self) -> &str {
        &self.comic
    }

    /// URL of the page that shows issue `id`.
    pub fn issue_url(&self, id: u64) -> Url {
        let mut url = self.base.clone();
        let path = format!(
            "{}/~{}/{}",
            self.base.path().trim_end_matches('/'),
            self.comic,
            id
        );
        url.set_path(&path);
        url
    }

    /// Resolve an image link found on a page against the site root.
    fn asset_url(&self, link: &str) -> Result<Url, FetchError> {
        self.base
            .join(link)
            .map_err(|e| FetchError::Protocol(format!("invalid image link {}: {}", link, e)))
    }

    /// Fetch a page as text; 404 means the issue does not exist.
    async fn get_page(&self, url: &Url, cancel: &CancellationToken) -> Result<String, FetchError> {
        let http = &self.http;
        let body = run_with_retry(&self.retry, cancel, move || async move {
            let page = http.get(url.as_str(), cancel).await?;
            match page.head.status {
                200 => Ok(page.body),
                404 => Err(FetchError::EndOfRange),
                status @ (429 | 503) => Err(FetchError::Throttled {
                    status,
                    retry_after: page.head.retry_after,
                }),
                code => Err(FetchError::Status(code)),
            }
        })
        .await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl IssueSource for AcomicsClient {
    async fn total_count(&self, cancel: &CancellationToken) -> Result<Option<u64>, FetchError> {
        let html = match self.get_page(&self.issue_url(1), cancel).await {
            Err(FetchError::EndOfRange) => {
                return Err(FetchError::Protocol(format!(
                    "comic {} has no published issues",
                    self.comic
                )))
            }
            other => other?,
        };
        let total = page::parse_issue_page(&html).total;
        tracing::debug!(comic = %self.comic, ?total, "issue count");
        Ok(total)
    }

    async fn fetch(&self, id: u64, cancel: &CancellationToken) -> Result<FetchedContent, FetchError> {
        let html = self.get_page(&self.issue_url(id), cancel).await?;
        let info = page::parse_issue_page(&html);
        match info.number {
            Some(n) if n == id => {}
            Some(n) => {
                tracing::debug!(requested = id, shown = n, "site served another issue");
                return Err(FetchError::EndOfRange);
            }
            None => {
                tracing::debug!(requested = id, "page shows no issue number");
                return Err(FetchError::EndOfRange);
            }
        }
        let link = info
            .image
            .ok_or_else(|| FetchError::Protocol("main image is not found".to_string()))?;
        let image_url = self.asset_url(&link)?;

        let (head, stream) = self.http.get_stream(image_url.as_str(), cancel).await?;
        if head.status != 200 {
            return Err(FetchError::Status(head.status));
        }
        // The name comes from where the image actually lives, not the link.
        let served_from = Url::parse(&head.url).unwrap_or(image_url);
        let extension = resolve_extension(served_from.path(), head.content_type.as_deref());
        Ok(FetchedContent {
            stream,
            size: head.content_length,
            extension,
        })
    }
}
