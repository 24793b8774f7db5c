//! Run orchestration: workers, stop monitor and reporter around one
//! cancellation signal.
//!
//! A run ends on the first of: interrupt (raised from outside through
//! `cancel_signal()`), the monitor firing, or the deadline expiring. The
//! signal is raised exactly once, then every thread is joined before the
//! summary is built. All three endings are successful runs; only startup
//! problems produce an `EngineError`.

mod stop;
mod summary;

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::DtConfig;
use crate::control::{CancelSignal, StopReason};
use crate::ifstats::{InterfaceStats, StatsError};
use crate::monitor::{StopMonitor, DEFAULT_MONITOR_INTERVAL};
use crate::reporter::{Reporter, DEFAULT_REPORT_INTERVAL};
use crate::sink::{ByteSink, TrafficCounter};
use crate::sources::SourceList;
use crate::units::{format_bytes, ParseError};
use crate::worker::{CurlFetcher, Fetch, FetchOptions, Worker, WorkerStats, DEFAULT_BACKOFF};

pub use stop::{resolve_stop_condition, ParityRequest, Resolution, StopCondition, StopRequest};
pub use summary::{FinalParity, RunSummary};

/// Startup failures. Nothing that happens once workers run is an error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ParseError),
    #[error("invalid setting: {0}")]
    Invalid(String),
    #[error("interface `{interface}` unavailable for parity mode: {source}")]
    InterfaceUnavailable {
        interface: String,
        #[source]
        source: StatsError,
    },
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("failed to start thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: usize,
    /// `None` = no wall-clock limit.
    pub deadline: Option<Duration>,
    pub stop: StopCondition,
    pub sources: Arc<SourceList>,
    pub fetch: FetchOptions,
    pub backoff: Duration,
    pub monitor_interval: Duration,
    pub report_interval: Duration,
    /// Print the progress line on stdout.
    pub show_progress: bool,
}

impl EngineConfig {
    pub fn new(workers: usize, stop: StopCondition, sources: Arc<SourceList>) -> Self {
        Self {
            workers,
            deadline: None,
            stop,
            sources,
            fetch: FetchOptions::default(),
            backoff: DEFAULT_BACKOFF,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
            show_progress: false,
        }
    }

    /// Settings from the config file; `workers` and `deadline` are set by the caller.
    pub fn from_config(cfg: &DtConfig, stop: StopCondition, sources: Arc<SourceList>) -> Self {
        Self {
            workers: cfg.workers,
            deadline: None,
            stop,
            sources,
            fetch: FetchOptions {
                user_agent: cfg.user_agent.clone(),
                buffer_size: cfg.buffer_size,
            },
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
            monitor_interval: Duration::from_millis(cfg.monitor_interval_ms),
            report_interval: Duration::from_millis(cfg.report_interval_ms),
            show_progress: true,
        }
    }

    /// Zero means no deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = (!deadline.is_zero()).then_some(deadline);
        self
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.workers == 0 {
            return Err(EngineError::NoWorkers);
        }
        if self.monitor_interval.is_zero() || self.monitor_interval >= Duration::from_secs(1) {
            return Err(EngineError::Invalid(format!(
                "monitor interval must be below one second (got {:?})",
                self.monitor_interval
            )));
        }
        if self.report_interval.is_zero() {
            return Err(EngineError::Invalid("report interval must be non-zero".to_string()));
        }
        Ok(())
    }
}

pub struct Engine {
    config: EngineConfig,
    stats: Arc<dyn InterfaceStats>,
    cancel: CancelSignal,
    counter: TrafficCounter,
}

impl Engine {
    pub fn new(config: EngineConfig, stats: Arc<dyn InterfaceStats>) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            stats,
            cancel: CancelSignal::new(),
            counter: TrafficCounter::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for raising an interrupt from outside the run.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn counter(&self) -> TrafficCounter {
        self.counter.clone()
    }

    /// Runs with one libcurl fetcher per worker. Blocks until the run ends.
    pub fn run(self) -> Result<RunSummary, EngineError> {
        let options = self.config.fetch.clone();
        self.run_with(move |_| CurlFetcher::new(options.clone()))
    }

    /// Runs with fetchers from `make_fetcher`, called once per worker on the
    /// worker's own thread.
    pub fn run_with<F, M>(self, make_fetcher: M) -> Result<RunSummary, EngineError>
    where
        F: Fetch,
        M: Fn(usize) -> F + Sync,
    {
        let Engine {
            config,
            stats,
            cancel,
            counter,
        } = self;
        let stats: &dyn InterfaceStats = stats.as_ref();
        let make_fetcher = &make_fetcher;
        let started = Instant::now();

        tracing::info!(
            workers = config.workers,
            deadline = ?config.deadline,
            stop = ?config.stop,
            sources = config.sources.len(),
            "run starting"
        );

        let (reason, bytes_at_signal, worker_stats) = thread::scope(|scope| {
            let mut spawn_error: Option<io::Error> = None;

            let mut workers = Vec::with_capacity(config.workers);
            for id in 1..=config.workers {
                let sources = Arc::clone(&config.sources);
                let sink = ByteSink::new(counter.clone());
                let cancel = cancel.clone();
                let backoff = config.backoff;
                let spawned = thread::Builder::new()
                    .name(format!("worker-{}", id))
                    .spawn_scoped(scope, move || {
                        Worker::new(id, sources, sink, cancel, make_fetcher(id))
                            .with_backoff(backoff)
                            .run()
                    });
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            let mut monitor = None;
            let monitor_mode = config.stop.monitor_mode().filter(|_| spawn_error.is_none());
            if let Some(mode) = monitor_mode {
                let monitor_task = StopMonitor::new(mode, counter.clone(), stats);
                let cancel = cancel.clone();
                let interval = config.monitor_interval;
                match thread::Builder::new()
                    .name("stop-monitor".to_string())
                    .spawn_scoped(scope, move || monitor_task.run(&cancel, interval))
                {
                    Ok(handle) => monitor = Some(handle),
                    Err(e) => spawn_error = Some(e),
                }
            }

            if spawn_error.is_none() && config.show_progress {
                let reporter = Reporter::new(
                    counter.clone(),
                    config.stop.progress_target(),
                    stats,
                    io::stdout(),
                    started,
                );
                let cancel = cancel.clone();
                let interval = config.report_interval;
                if let Err(e) = thread::Builder::new()
                    .name("reporter".to_string())
                    .spawn_scoped(scope, move || reporter.run(&cancel, interval))
                {
                    spawn_error = Some(e);
                }
            }

            if let Some(e) = spawn_error {
                cancel.cancel(StopReason::Interrupted);
                return Err(EngineError::Spawn(e));
            }

            let reason = match config.deadline {
                Some(deadline) => {
                    if !cancel.wait_timeout(deadline) {
                        cancel.cancel(StopReason::DeadlineReached);
                    }
                    cancel.reason().unwrap_or(StopReason::DeadlineReached)
                }
                None => cancel.wait(),
            };
            let mut bytes_at_signal = counter.get();
            tracing::info!(%reason, total_bytes = bytes_at_signal, "cancellation raised, waiting for workers");

            let mut totals = WorkerStats::default();
            for handle in workers {
                match handle.join() {
                    Ok(stats) => totals.merge(&stats),
                    Err(_) => tracing::error!("worker thread panicked"),
                }
            }
            if let Some(handle) = monitor {
                match handle.join() {
                    Ok(Some(at_signal)) => bytes_at_signal = at_signal,
                    Ok(None) => {}
                    Err(_) => tracing::error!("stop monitor thread panicked"),
                }
            }
            Ok((reason, bytes_at_signal, totals))
        })?;

        let elapsed = started.elapsed();
        let final_parity = match &config.stop {
            StopCondition::Parity {
                interface,
                offset,
                baseline,
            } => {
                let sample = stats.read(interface).ok();
                Some(FinalParity {
                    interface: interface.clone(),
                    gap: sample.map(|s| s.gap(*offset)),
                    received_during_run: sample.map(|s| s.delta_since(baseline).received_bytes),
                })
            }
            _ => None,
        };

        let summary = RunSummary {
            total_bytes: counter.get(),
            bytes_at_signal,
            elapsed,
            workers: config.workers,
            reason,
            worker_stats,
            final_parity,
        };
        tracing::info!(
            %reason,
            total = %format_bytes(summary.total_bytes),
            elapsed_secs = elapsed.as_secs_f64(),
            requests = worker_stats.requests,
            failures = worker_stats.failures,
            "run finished"
        );
        Ok(summary)
    }
}
