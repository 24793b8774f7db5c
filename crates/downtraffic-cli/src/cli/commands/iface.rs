//! `downtraffic iface [NAME]` – interface counters and parity gap.

use anyhow::{Context, Result};
use downtraffic_core::config;
use downtraffic_core::ifstats::{detect_interface, InterfaceStats, StatsReader};
use downtraffic_core::units::{format_bytes, parse_size};

pub fn run_iface(name: Option<&str>, offset: &str) -> Result<()> {
    let offset = parse_size(offset)?;
    let stats = StatsReader::for_host();
    let configured = match name {
        Some(_) => None,
        None => config::load_or_init()
            .map(|cfg| cfg.default_interface)
            .unwrap_or_else(|e| {
                tracing::debug!("config unavailable for iface: {:#}", e);
                None
            }),
    };
    let (interface, detected) = match name.map(str::to_string).or(configured) {
        Some(n) => (n, false),
        None => (detect_interface(&stats), true),
    };
    let sample = stats
        .read(&interface)
        .with_context(|| format!("reading counters for {}", interface))?;

    let mut present = stats.interfaces();
    present.sort();
    println!(
        "interface:   {}{}",
        interface,
        if detected { " (detected)" } else { "" }
    );
    println!("received:    {}", format_bytes(sample.received_bytes));
    println!("transmitted: {}", format_bytes(sample.transmitted_bytes));
    if offset > 0 {
        println!("offset:      {}", format_bytes(offset));
    }
    let gap = sample.gap(offset);
    if gap == 0 {
        println!("parity gap:  none (balanced)");
    } else {
        println!("parity gap:  {}", format_bytes(gap));
    }
    if !present.is_empty() {
        println!("present:     {}", present.join(", "));
    }
    Ok(())
}
