//! Rate sampling and the single overwritten progress line.
//!
//! Purely observational: the reporter reads the counter (and, in parity mode,
//! the interface counters) and writes text. Nothing here feeds back into
//! control flow; a failed interface read just drops the gap field.

use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::control::CancelSignal;
use crate::ifstats::InterfaceStats;
use crate::sink::TrafficCounter;
use crate::units::{format_bytes, format_elapsed, format_rate};

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// What the trailing progress field is measured against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressTarget {
    None,
    Cap(u64),
    Parity {
        interface: String,
        offset: u64,
        /// Gap computed at startup; sizes the percentage only.
        initial_gap: u64,
    },
}

/// Mode-dependent trailing field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressDetail {
    Percent(f64),
    Gap { remaining: u64, closed_pct: f64 },
    Balanced,
}

/// One rendered progress snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub rate: u64,
    pub total: u64,
    pub elapsed: Duration,
    pub detail: Option<ProgressDetail>,
}

impl fmt::Display for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rate: {:<12} | total: {:<10} | elapsed: {}",
            format_rate(self.rate),
            format_bytes(self.total),
            format_elapsed(self.elapsed)
        )?;
        match self.detail {
            Some(ProgressDetail::Percent(p)) => write!(f, " | progress: {:.1}%", p),
            Some(ProgressDetail::Gap {
                remaining,
                closed_pct,
            }) => write!(f, " | gap: {} ({:.1}% closed)", format_bytes(remaining), closed_pct),
            Some(ProgressDetail::Balanced) => write!(f, " | balanced"),
            None => Ok(()),
        }
    }
}

/// Turns successive counter readings into bytes/second.
#[derive(Debug, Clone)]
pub struct RateSampler {
    last_total: u64,
    last_at: Instant,
}

impl RateSampler {
    pub fn new(total: u64, at: Instant) -> Self {
        Self {
            last_total: total,
            last_at: at,
        }
    }

    /// Throughput since the previous sample.
    pub fn sample(&mut self, total: u64, at: Instant) -> u64 {
        let delta = total.saturating_sub(self.last_total);
        let secs = at.saturating_duration_since(self.last_at).as_secs_f64();
        self.last_total = total;
        self.last_at = at;
        if secs <= 0.0 {
            return 0;
        }
        (delta as f64 / secs) as u64
    }
}

pub struct Reporter<'a, S: InterfaceStats + ?Sized, W: Write> {
    counter: TrafficCounter,
    target: ProgressTarget,
    stats: &'a S,
    out: W,
    started: Instant,
}

impl<'a, S: InterfaceStats + ?Sized, W: Write> Reporter<'a, S, W> {
    pub fn new(counter: TrafficCounter, target: ProgressTarget, stats: &'a S, out: W, started: Instant) -> Self {
        Self {
            counter,
            target,
            stats,
            out,
            started,
        }
    }

    pub fn detail(&self, total: u64) -> Option<ProgressDetail> {
        match &self.target {
            ProgressTarget::None => None,
            ProgressTarget::Cap(0) => None,
            ProgressTarget::Cap(cap) => Some(ProgressDetail::Percent(total as f64 / *cap as f64 * 100.0)),
            ProgressTarget::Parity {
                interface,
                offset,
                initial_gap,
            } => {
                let sample = self.stats.read(interface).ok()?;
                let remaining = sample.gap(*offset);
                if remaining == 0 {
                    return Some(ProgressDetail::Balanced);
                }
                let closed_pct = if *initial_gap == 0 {
                    0.0
                } else {
                    initial_gap.saturating_sub(remaining) as f64 / *initial_gap as f64 * 100.0
                };
                Some(ProgressDetail::Gap {
                    remaining,
                    closed_pct,
                })
            }
        }
    }

    pub fn snapshot(&self, sampler: &mut RateSampler, now: Instant) -> ProgressLine {
        let total = self.counter.get();
        ProgressLine {
            rate: sampler.sample(total, now),
            total,
            elapsed: now.saturating_duration_since(self.started),
            detail: self.detail(total),
        }
    }

    /// Prints a line every `interval` until cancellation, then ends the line.
    pub fn run(mut self, cancel: &CancelSignal, interval: Duration) {
        let mut sampler = RateSampler::new(self.counter.get(), Instant::now());
        while !cancel.wait_timeout(interval) {
            let line = self.snapshot(&mut sampler, Instant::now());
            if let Err(e) = write!(self.out, "\r{}   ", line).and_then(|_| self.out.flush()) {
                tracing::debug!(error = %e, "progress output failed");
            }
        }
        if let Err(e) = writeln!(self.out).and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, "progress output failed");
        }
    }
}
