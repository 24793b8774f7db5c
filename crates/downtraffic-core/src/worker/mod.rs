//! Download worker: pulls the next URL, streams it into the sink, repeats.
//!
//! States: `Fetching -> Streaming -> (Backoff | Fetching)`, terminal `Stopped`.
//! Only the cancellation signal stops a worker; byte and time limits are
//! enforced elsewhere. Failures are retried forever after a fixed backoff.

mod error;
mod fetch;

use std::sync::Arc;
use std::time::Duration;

use crate::control::CancelSignal;
use crate::sink::ByteSink;
use crate::sources::{Rotation, SourceList};

pub use error::{classify_curl_error, classify_http_status, FailureKind, FetchError};
pub use fetch::{CurlFetcher, Fetch, FetchOptions, DEFAULT_USER_AGENT};

/// Pause after a failed download before trying the next URL.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

const LOG_URL_MAX: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Fetching,
    Streaming(String),
    Backoff,
    Stopped,
}

/// Request bookkeeping for the final summary. Bytes live in the shared counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub requests: u64,
    pub completed: u64,
    pub failures: u64,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.requests += other.requests;
        self.completed += other.completed;
        self.failures += other.failures;
    }
}

pub struct Worker<F: Fetch> {
    id: usize,
    rotation: Rotation,
    sources: Arc<SourceList>,
    sink: ByteSink,
    cancel: CancelSignal,
    backoff: Duration,
    fetcher: F,
    stats: WorkerStats,
}

impl<F: Fetch> Worker<F> {
    pub fn new(
        id: usize,
        sources: Arc<SourceList>,
        sink: ByteSink,
        cancel: CancelSignal,
        fetcher: F,
    ) -> Self {
        let rotation = sources.rotation_for(id);
        Self {
            id,
            rotation,
            sources,
            sink,
            cancel,
            backoff: DEFAULT_BACKOFF,
            fetcher,
            stats: WorkerStats::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Runs until cancellation. Blocking; call from a dedicated thread.
    pub fn run(mut self) -> WorkerStats {
        tracing::debug!(worker = self.id, "worker started");
        let mut state = WorkerState::Fetching;
        while state != WorkerState::Stopped {
            state = self.step(state);
        }
        tracing::debug!(
            worker = self.id,
            requests = self.stats.requests,
            failures = self.stats.failures,
            "worker stopped"
        );
        self.stats
    }

    /// One transition of the state machine.
    pub fn step(&mut self, state: WorkerState) -> WorkerState {
        match state {
            WorkerState::Fetching => {
                if self.cancel.is_cancelled() {
                    return WorkerState::Stopped;
                }
                WorkerState::Streaming(self.rotation.next(&self.sources).to_string())
            }
            WorkerState::Streaming(url) => self.stream(&url),
            WorkerState::Backoff => {
                if self.cancel.wait_timeout(self.backoff) {
                    WorkerState::Stopped
                } else {
                    WorkerState::Fetching
                }
            }
            WorkerState::Stopped => WorkerState::Stopped,
        }
    }

    fn stream(&mut self, url: &str) -> WorkerState {
        tracing::info!(worker = self.id, url = %truncate_url(url), "starting download");
        self.stats.requests += 1;
        match self.fetcher.fetch(url, &self.sink, &self.cancel) {
            Ok(bytes) => {
                self.stats.completed += 1;
                tracing::debug!(worker = self.id, url = %truncate_url(url), bytes, "download finished");
                WorkerState::Fetching
            }
            Err(e) if e.is_cancellation() || self.cancel.is_cancelled() => {
                tracing::trace!(worker = self.id, "transfer stopped by cancellation");
                WorkerState::Fetching
            }
            Err(e) => {
                self.stats.failures += 1;
                tracing::warn!(
                    worker = self.id,
                    url = %truncate_url(url),
                    kind = ?e.kind(),
                    error = %e,
                    "download failed"
                );
                WorkerState::Backoff
            }
        }
    }
}

/// Shortens long URLs for log lines.
pub fn truncate_url(url: &str) -> String {
    if url.chars().count() <= LOG_URL_MAX {
        return url.to_string();
    }
    let head: String = url.chars().take(LOG_URL_MAX - 3).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::StopReason;
    use crate::sink::TrafficCounter;
    use crate::sources::SourceOrigin;
    use std::collections::VecDeque;
    use std::time::Instant;

    /// Replays scripted outcomes; `Ok(n)` feeds `n` bytes through the sink.
    struct Scripted {
        outcomes: VecDeque<Result<u64, FetchError>>,
        urls: Vec<String>,
        cancel_after: Option<usize>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<u64, FetchError>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                urls: Vec::new(),
                cancel_after: None,
            }
        }
    }

    impl Fetch for Scripted {
        fn fetch(&mut self, url: &str, sink: &ByteSink, cancel: &CancelSignal) -> Result<u64, FetchError> {
            self.urls.push(url.to_string());
            if self.cancel_after == Some(self.urls.len()) {
                cancel.cancel(StopReason::Interrupted);
            }
            match self.outcomes.pop_front() {
                Some(Ok(n)) => {
                    sink.consume(&vec![0u8; n as usize]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(FetchError::Cancelled),
            }
        }
    }

    fn list(urls: &[&str]) -> Arc<SourceList> {
        Arc::new(
            SourceList::from_urls(urls.iter().map(|s| s.to_string()).collect(), SourceOrigin::BuiltIn)
                .unwrap(),
        )
    }

    fn worker(fetcher: Scripted, cancel: &CancelSignal, counter: &TrafficCounter) -> Worker<Scripted> {
        Worker::new(
            1,
            list(&["http://a", "http://b"]),
            ByteSink::new(counter.clone()),
            cancel.clone(),
            fetcher,
        )
        .with_rotation(Rotation::starting_at(0))
        .with_backoff(Duration::from_millis(20))
    }

    #[test]
    fn fetching_when_cancelled_stops_without_request() {
        let cancel = CancelSignal::new();
        let counter = TrafficCounter::new();
        cancel.cancel(StopReason::Interrupted);
        let mut w = worker(Scripted::new(vec![Ok(10)]), &cancel, &counter);
        assert_eq!(w.step(WorkerState::Fetching), WorkerState::Stopped);
        assert!(w.fetcher.urls.is_empty());
    }

    #[test]
    fn success_returns_to_fetching_and_rotates() {
        let cancel = CancelSignal::new();
        let counter = TrafficCounter::new();
        let mut w = worker(Scripted::new(vec![Ok(10), Ok(5)]), &cancel, &counter);
        let s = w.step(WorkerState::Fetching);
        assert_eq!(s, WorkerState::Streaming("http://a".into()));
        assert_eq!(w.step(s), WorkerState::Fetching);
        let s = w.step(WorkerState::Fetching);
        assert_eq!(s, WorkerState::Streaming("http://b".into()));
        assert_eq!(w.step(s), WorkerState::Fetching);
        assert_eq!(counter.get(), 15);
        assert_eq!(w.stats.completed, 2);
    }

    #[test]
    fn failure_enters_backoff_then_fetching() {
        let cancel = CancelSignal::new();
        let counter = TrafficCounter::new();
        let mut w = worker(Scripted::new(vec![Err(FetchError::Source(404))]), &cancel, &counter);
        let s = w.step(WorkerState::Streaming("http://a".into()));
        assert_eq!(s, WorkerState::Backoff);
        let start = Instant::now();
        assert_eq!(w.step(s), WorkerState::Fetching);
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(w.stats.failures, 1);
    }

    #[test]
    fn error_during_cancellation_is_a_clean_stop() {
        let cancel = CancelSignal::new();
        let counter = TrafficCounter::new();
        let mut fetcher = Scripted::new(vec![Err(FetchError::Source(500))]);
        fetcher.cancel_after = Some(1);
        let mut w = worker(fetcher, &cancel, &counter);
        let s = w.step(WorkerState::Streaming("http://a".into()));
        assert_eq!(s, WorkerState::Fetching);
        assert_eq!(w.stats.failures, 0);
        assert_eq!(w.step(s), WorkerState::Stopped);
    }

    #[test]
    fn backoff_is_cut_short_by_cancellation() {
        let cancel = CancelSignal::new();
        let counter = TrafficCounter::new();
        let mut w = worker(Scripted::new(vec![]), &cancel, &counter).with_backoff(Duration::from_secs(30));
        let c = cancel.clone();
        let raiser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            c.cancel(StopReason::Interrupted);
        });
        let start = Instant::now();
        assert_eq!(w.step(WorkerState::Backoff), WorkerState::Stopped);
        assert!(start.elapsed() < Duration::from_secs(5));
        raiser.join().unwrap();
    }

    #[test]
    fn run_retries_until_cancelled() {
        let cancel = CancelSignal::new();
        let counter = TrafficCounter::new();
        let mut fetcher = Scripted::new(vec![
            Err(FetchError::Source(503)),
            Ok(100),
            Err(FetchError::Source(502)),
            Ok(50),
        ]);
        fetcher.cancel_after = Some(4);
        let stats = worker(fetcher, &cancel, &counter).run();
        assert_eq!(stats.requests, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failures, 2);
        assert_eq!(counter.get(), 150);
    }

    #[test]
    fn truncates_long_urls() {
        assert_eq!(truncate_url("http://a"), "http://a");
        let long = format!("http://example.com/{}", "x".repeat(100));
        let short = truncate_url(&long);
        assert_eq!(short.chars().count(), 60);
        assert!(short.ends_with("..."));
    }
}
