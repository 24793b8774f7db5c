use std::time::Duration;

use crate::control::StopReason;
use crate::worker::WorkerStats;

/// Parity state after the run, from one last counter read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalParity {
    pub interface: String,
    /// Remaining gap; `None` when the counters could not be read.
    pub gap: Option<u64>,
    /// Interface-level received bytes since the startup baseline, all traffic included.
    pub received_during_run: Option<u64>,
}

impl FinalParity {
    pub fn is_balanced(&self) -> bool {
        self.gap == Some(0)
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_bytes: u64,
    /// Counter value when cancellation was raised.
    pub bytes_at_signal: u64,
    pub elapsed: Duration,
    pub workers: usize,
    pub reason: StopReason,
    pub worker_stats: WorkerStats,
    pub final_parity: Option<FinalParity>,
}

impl RunSummary {
    /// Mean bytes/second over the whole run.
    pub fn average_rate(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.total_bytes as f64 / secs) as u64
    }

    /// Bytes that landed after the stop signal (chunks already in flight).
    pub fn overshoot(&self) -> u64 {
        self.total_bytes.saturating_sub(self.bytes_at_signal)
    }
}
