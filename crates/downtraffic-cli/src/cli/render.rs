//! Operator-facing text: startup banner, final boxed summary.

use downtraffic_core::engine::{EngineConfig, RunSummary, StopCondition};
use downtraffic_core::ifstats::InterfaceSample;
use downtraffic_core::units::{format_bytes, format_elapsed, format_rate};

/// Frames `lines` in an ASCII box sized to the widest line.
pub(crate) fn boxed(title: &str, lines: &[String]) -> String {
    let width = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0);
    let rule = format!("+{}+", "-".repeat(width + 2));
    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("| {:<width$} |\n", title, width = width));
    out.push_str(&rule);
    out.push('\n');
    for line in lines {
        out.push_str(&format!("| {:<width$} |\n", line, width = width));
    }
    out.push_str(&rule);
    out
}

fn describe_stop(stop: &StopCondition) -> String {
    let Some(budget) = stop.effective_cap() else {
        return "none (until interrupted)".to_string();
    };
    match (stop.interface(), stop) {
        (Some(interface), StopCondition::Parity { offset, .. }) if *offset > 0 => format!(
            "parity on {} (gap {}, offset {})",
            interface,
            format_bytes(budget),
            format_bytes(*offset)
        ),
        (Some(interface), _) => format!("parity on {} (gap {})", interface, format_bytes(budget)),
        (None, _) => format!("after {}", format_bytes(budget)),
    }
}

pub(crate) fn banner(cfg: &EngineConfig) -> String {
    let duration = match cfg.deadline {
        Some(d) => format_elapsed(d),
        None => "unlimited".to_string(),
    };
    let mut lines = vec![
        format!("workers:  {}", cfg.workers),
        format!("duration: {}", duration),
        format!("stop:     {}", describe_stop(&cfg.stop)),
        format!("sources:  {} URLs ({})", cfg.sources.len(), cfg.sources.origin()),
    ];
    if let StopCondition::Parity { baseline, .. } = &cfg.stop {
        lines.push(format!(
            "counters: rx {} / tx {}",
            format_bytes(baseline.received_bytes),
            format_bytes(baseline.transmitted_bytes)
        ));
    }
    boxed("downtraffic", &lines)
}

pub(crate) fn summary(s: &RunSummary) -> String {
    let mut lines = vec![
        format!("stopped:    {}", s.reason),
        format!("downloaded: {}", format_bytes(s.total_bytes)),
        format!("elapsed:    {}", format_elapsed(s.elapsed)),
        format!("avg rate:   {}", format_rate(s.average_rate())),
        format!("workers:    {}", s.workers),
        format!(
            "requests:   {} ({} completed, {} failed)",
            s.worker_stats.requests, s.worker_stats.completed, s.worker_stats.failures
        ),
    ];
    if let Some(parity) = &s.final_parity {
        let state = match parity.gap {
            Some(0) => "balanced".to_string(),
            Some(gap) => format!("{} remaining", format_bytes(gap)),
            None => "unknown (counters unreadable)".to_string(),
        };
        lines.push(format!("parity:     {} on {}", state, parity.interface));
        if let Some(rx) = parity.received_during_run {
            lines.push(format!("iface rx:   {} during run", format_bytes(rx)));
        }
    }
    boxed("download summary", &lines)
}

pub(crate) fn no_download_needed(interface: &str, sample: &InterfaceSample, offset: u64) -> String {
    let mut lines = vec![
        format!("interface:   {}", interface),
        format!("received:    {}", format_bytes(sample.received_bytes)),
        format!("transmitted: {}", format_bytes(sample.transmitted_bytes)),
    ];
    if offset > 0 {
        lines.push(format!("offset:      {}", format_bytes(offset)));
    }
    lines.push("received already covers transmitted, no download needed".to_string());
    boxed("parity", &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use downtraffic_core::control::StopReason;
    use downtraffic_core::engine::FinalParity;
    use downtraffic_core::sources::SourceList;
    use downtraffic_core::worker::WorkerStats;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn box_lines_share_width() {
        let text = boxed("t", &["short".to_string(), "a longer line".to_string()]);
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn banner_echoes_configuration() {
        let stop = StopCondition::ByteCap(10 * 1024 * 1024 * 1024);
        let cfg = EngineConfig::new(8, stop, Arc::new(SourceList::builtin()))
            .with_deadline(Duration::from_secs(3_600));
        let text = banner(&cfg);
        assert!(text.contains("workers:  8"));
        assert!(text.contains("duration: 01:00:00"));
        assert!(text.contains("after 10.00 GB"));
        assert!(text.contains("built-in list"));
    }

    #[test]
    fn banner_describes_parity_budget() {
        let stop = StopCondition::Parity {
            interface: "ens5".into(),
            offset: 1024 * 1024,
            baseline: InterfaceSample {
                received_bytes: 0,
                transmitted_bytes: 2 * 1024 * 1024,
            },
        };
        assert_eq!(describe_stop(&stop), "parity on ens5 (gap 3.00 MB, offset 1.00 MB)");

        let cfg = EngineConfig::new(2, stop, Arc::new(SourceList::builtin()));
        let text = banner(&cfg);
        assert!(text.contains("duration: unlimited"));
        assert!(text.contains("counters: rx 0 B / tx 2.00 MB"));
        assert_eq!(describe_stop(&StopCondition::Unbounded), "none (until interrupted)");
    }

    #[test]
    fn summary_includes_parity_state() {
        let s = RunSummary {
            total_bytes: 2 * 1024 * 1024,
            bytes_at_signal: 2 * 1024 * 1024,
            elapsed: Duration::from_secs(2),
            workers: 4,
            reason: StopReason::ParityReached,
            worker_stats: WorkerStats {
                requests: 3,
                completed: 2,
                failures: 1,
            },
            final_parity: Some(FinalParity {
                interface: "eth0".into(),
                gap: Some(0),
                received_during_run: Some(3 * 1024 * 1024),
            }),
        };
        let text = summary(&s);
        assert!(text.contains("stopped:    parity reached"));
        assert!(text.contains("avg rate:   1.00 MB/s"));
        assert!(text.contains("balanced on eth0"));
        assert!(text.contains("3 (2 completed, 1 failed)"));
        assert!(text.contains("iface rx:   3.00 MB during run"));
    }

    #[test]
    fn no_download_message() {
        let sample = InterfaceSample {
            received_bytes: 3_000,
            transmitted_bytes: 2_000,
        };
        let text = no_download_needed("ens3", &sample, 0);
        assert!(text.contains("no download needed"));
        assert!(text.contains("ens3"));
        assert!(!text.contains("offset"));
    }
}
