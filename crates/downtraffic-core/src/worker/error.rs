//! Per-download errors and their classification for logging.

/// Failure of one streaming GET. Never leaves the worker that hit it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Server answered with a non-2xx status.
    #[error("HTTP {0}")]
    Source(u32),
    /// Connection, TLS or read failure.
    #[error("{0}")]
    Transport(#[from] curl::Error),
    /// Transfer aborted because the run is shutting down.
    #[error("transfer aborted by cancellation")]
    Cancelled,
}

/// Coarse failure class, reported as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 429 / 503.
    Throttled,
    /// Any other non-2xx status.
    Status,
    Timeout,
    /// DNS, connect, send/recv.
    Connection,
    Cancelled,
    Other,
}

impl FetchError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Source(code) => classify_http_status(*code),
            FetchError::Transport(e) => classify_curl_error(e),
            FetchError::Cancelled => FailureKind::Cancelled,
        }
    }
}

pub fn classify_http_status(code: u32) -> FailureKind {
    match code {
        429 | 503 => FailureKind::Throttled,
        _ => FailureKind::Status,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_operation_timedout() {
        return FailureKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_ssl_connect_error()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return FailureKind::Connection;
    }
    FailureKind::Other
}
