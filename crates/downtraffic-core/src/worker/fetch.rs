//! One streaming HTTP GET into the discard sink (libcurl easy handle).
//!
//! The response body never touches disk: every chunk curl hands to the write
//! callback is counted by the `ByteSink` first, then the callback checks the
//! cancellation signal. A progress callback aborts idle or connecting
//! transfers once cancellation is raised.

use std::cell::Cell;

use crate::control::CancelSignal;
use crate::sink::ByteSink;

use super::FetchError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Request options shared by all workers.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    /// Receive buffer (max bytes per write callback). `None` = libcurl default.
    pub buffer_size: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            buffer_size: None,
        }
    }
}

/// Streams one URL into a sink. Returns the body bytes consumed.
pub trait Fetch {
    fn fetch(&mut self, url: &str, sink: &ByteSink, cancel: &CancelSignal) -> Result<u64, FetchError>;
}

/// Curl-backed fetcher. One per worker; the easy handle is reused so
/// keep-alive connections survive between downloads.
pub struct CurlFetcher {
    easy: curl::easy::Easy,
    options: FetchOptions,
}

impl CurlFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            easy: curl::easy::Easy::new(),
            options,
        }
    }

    fn configure(&mut self, url: &str) -> Result<(), curl::Error> {
        let easy = &mut self.easy;
        easy.reset();
        easy.url(url)?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.options.user_agent)?;
        // Non-2xx: fail before the body is read.
        easy.fail_on_error(true)?;
        // Identity encoding: compressed bodies would undercount wire traffic.
        let mut headers = curl::easy::List::new();
        headers.append("Accept-Encoding: identity")?;
        easy.http_headers(headers)?;
        if let Some(size) = self.options.buffer_size {
            easy.buffer_size(size)?;
        }
        easy.progress(true)?;
        Ok(())
    }
}

impl Fetch for CurlFetcher {
    fn fetch(&mut self, url: &str, sink: &ByteSink, cancel: &CancelSignal) -> Result<u64, FetchError> {
        self.configure(url)?;
        let received = Cell::new(0u64);
        let perform_result = {
            let mut transfer = self.easy.transfer();
            transfer.write_function(|data| {
                let n = sink.consume(data);
                received.set(received.get() + n as u64);
                if cancel.is_cancelled() {
                    // Returning less than `data.len()` aborts the transfer.
                    return Ok(0);
                }
                Ok(n)
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer.perform()
        };

        if let Err(e) = perform_result {
            if cancel.is_cancelled() && (e.is_write_error() || e.is_aborted_by_callback()) {
                return Err(FetchError::Cancelled);
            }
            if e.is_http_returned_error() {
                let code = self.easy.response_code().unwrap_or(0);
                return Err(FetchError::Source(code));
            }
            return Err(FetchError::Transport(e));
        }

        let code = self.easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Source(code));
        }
        Ok(received.get())
    }
}
