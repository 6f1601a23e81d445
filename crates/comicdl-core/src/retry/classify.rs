//! Decide whether a failed page request is worth another attempt.

use crate::error::FetchError;
use crate::retry::policy::Transient;

/// 404 never gets here as a status: it is the end-of-range signal.
pub fn classify_http_status(code: u32) -> Transient {
    match code {
        408 | 429 | 500..=599 => Transient::Backoff,
        _ => Transient::No,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> Transient {
    if e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_ssl_connect_error()
    {
        Transient::Backoff
    } else {
        Transient::No
    }
}

pub fn classify(e: &FetchError) -> Transient {
    match e {
        FetchError::Transport(ce) => classify_curl_error(ce),
        FetchError::Status(code) => classify_http_status(*code),
        FetchError::Throttled {
            retry_after: Some(wait),
            ..
        } => Transient::After(*wait),
        FetchError::Throttled { .. } => Transient::Backoff,
        _ => Transient::No,
    }
}
