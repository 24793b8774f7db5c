//! Stop-condition monitor: polls the byte counter or live interface counters
//! and raises cancellation once the condition holds.

use std::time::Duration;

use crate::control::{CancelSignal, StopReason};
use crate::ifstats::InterfaceStats;
use crate::sink::TrafficCounter;

/// Default poll interval (must stay below one second).
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorMode {
    /// Fire once the shared counter reaches `limit`.
    ByteCap(u64),
    /// Fire once a fresh sample shows transmitted + offset - received <= 0.
    Parity { interface: String, offset: u64 },
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Continue,
    Stop(StopReason),
    /// Interface counters could not be read this time.
    Unreadable,
}

pub struct StopMonitor<'a, S: InterfaceStats + ?Sized> {
    mode: MonitorMode,
    counter: TrafficCounter,
    stats: &'a S,
}

impl<'a, S: InterfaceStats + ?Sized> StopMonitor<'a, S> {
    pub fn new(mode: MonitorMode, counter: TrafficCounter, stats: &'a S) -> Self {
        Self {
            mode,
            counter,
            stats,
        }
    }

    pub fn check(&self) -> Check {
        match &self.mode {
            MonitorMode::ByteCap(limit) => {
                if self.counter.get() >= *limit {
                    Check::Stop(StopReason::ByteCapReached)
                } else {
                    Check::Continue
                }
            }
            MonitorMode::Parity { interface, offset } => match self.stats.read(interface) {
                Ok(sample) if sample.is_balanced(*offset) => Check::Stop(StopReason::ParityReached),
                Ok(_) => Check::Continue,
                Err(e) => {
                    tracing::debug!(interface = %interface, error = %e, "parity poll failed");
                    Check::Unreadable
                }
            },
        }
    }

    /// Polls every `interval` until the condition fires or the run is
    /// cancelled by someone else. Returns the counter value at the moment
    /// this monitor raised the signal, or `None` if it did not.
    pub fn run(&self, cancel: &CancelSignal, interval: Duration) -> Option<u64> {
        let mut unreadable_streak = 0u32;
        loop {
            match self.check() {
                Check::Stop(reason) => {
                    if !cancel.cancel(reason) {
                        return None;
                    }
                    let total_bytes = self.counter.get();
                    tracing::info!(%reason, total_bytes, "stop condition met, cancelling run");
                    return Some(total_bytes);
                }
                Check::Unreadable => {
                    unreadable_streak += 1;
                    if unreadable_streak == 1 {
                        tracing::warn!("cannot read interface counters, parity check skipped until they recover");
                    }
                }
                Check::Continue => unreadable_streak = 0,
            }
            if cancel.wait_timeout(interval) {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifstats::{InterfaceSample, StatsError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out a fixed sequence of samples, repeating the last one.
    struct SequenceStats {
        samples: Mutex<VecDeque<Option<InterfaceSample>>>,
    }

    impl SequenceStats {
        fn new(samples: Vec<Option<(u64, u64)>>) -> Self {
            let samples = samples
                .into_iter()
                .map(|s| {
                    s.map(|(rx, tx)| InterfaceSample {
                        received_bytes: rx,
                        transmitted_bytes: tx,
                    })
                })
                .collect();
            Self {
                samples: Mutex::new(samples),
            }
        }
    }

    impl InterfaceStats for SequenceStats {
        fn read(&self, interface: &str) -> Result<InterfaceSample, StatsError> {
            let mut q = self.samples.lock().unwrap();
            let next = if q.len() > 1 { q.pop_front().flatten() } else { q.front().copied().flatten() };
            next.ok_or_else(|| StatsError::InterfaceNotFound(interface.to_string()))
        }
    }

    fn parity(offset: u64) -> MonitorMode {
        MonitorMode::Parity {
            interface: "eth0".into(),
            offset,
        }
    }

    #[test]
    fn byte_cap_fires_at_limit() {
        let counter = TrafficCounter::new();
        let stats = SequenceStats::new(vec![]);
        let monitor = StopMonitor::new(MonitorMode::ByteCap(1_000), counter.clone(), &stats);
        counter.add(999);
        assert_eq!(monitor.check(), Check::Continue);
        counter.add(1);
        assert_eq!(monitor.check(), Check::Stop(StopReason::ByteCapReached));
    }

    #[test]
    fn parity_uses_live_samples() {
        // Upload keeps growing while we download: gap moves with it.
        let stats = SequenceStats::new(vec![
            Some((500, 2_000)),
            Some((1_900, 2_500)),
            Some((2_600, 2_600)),
        ]);
        let monitor = StopMonitor::new(parity(0), TrafficCounter::new(), &stats);
        assert_eq!(monitor.check(), Check::Continue);
        assert_eq!(monitor.check(), Check::Continue);
        assert_eq!(monitor.check(), Check::Stop(StopReason::ParityReached));
    }

    #[test]
    fn parity_respects_offset_and_ignores_counter() {
        let stats = SequenceStats::new(vec![Some((3_000, 2_000))]);
        let counter = TrafficCounter::new();
        counter.add(u64::MAX / 2);
        let monitor = StopMonitor::new(parity(5_000), counter, &stats);
        assert_eq!(monitor.check(), Check::Continue);
    }

    #[test]
    fn unreadable_sample_does_not_stop() {
        let stats = SequenceStats::new(vec![None, Some((10, 5))]);
        let monitor = StopMonitor::new(parity(0), TrafficCounter::new(), &stats);
        assert_eq!(monitor.check(), Check::Unreadable);
        assert_eq!(monitor.check(), Check::Stop(StopReason::ParityReached));
    }

    #[test]
    fn run_cancels_once_condition_holds() {
        let counter = TrafficCounter::new();
        let stats = SequenceStats::new(vec![]);
        let cancel = CancelSignal::new();
        let c = counter.clone();
        let feeder = std::thread::spawn(move || {
            for _ in 0..10 {
                c.add(100);
                std::thread::sleep(Duration::from_millis(5));
            }
        });
        let monitor = StopMonitor::new(MonitorMode::ByteCap(1_000), counter.clone(), &stats);
        let at_signal = monitor.run(&cancel, Duration::from_millis(10));
        feeder.join().unwrap();
        assert_eq!(cancel.reason(), Some(StopReason::ByteCapReached));
        assert!(at_signal.unwrap() >= 1_000);
        assert!(counter.get() >= 1_000);
    }

    #[test]
    fn run_exits_when_cancelled_elsewhere() {
        let stats = SequenceStats::new(vec![Some((0, 1_000_000))]);
        let cancel = CancelSignal::new();
        cancel.cancel(StopReason::Interrupted);
        let monitor = StopMonitor::new(parity(0), TrafficCounter::new(), &stats);
        assert_eq!(monitor.run(&cancel, Duration::from_millis(10)), None);
        assert_eq!(cancel.reason(), Some(StopReason::Interrupted));
    }
}
