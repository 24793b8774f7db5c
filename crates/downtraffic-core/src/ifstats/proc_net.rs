//! Linux `/proc/net/dev` reader.
//!
//! Table rows look like `  eth0: 1234 56 0 0 0 0 0 0 7890 12 ...`. After the
//! interface name at least ten fields must follow; the 1st is received bytes
//! and the 9th transmitted bytes. Extra whitespace and columns are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use super::{InterfaceSample, InterfaceStats, StatsError};

const PROC_NET_DEV: &str = "/proc/net/dev";
const SYS_CLASS_NET: &str = "/sys/class/net";
const MIN_FIELDS: usize = 10;
const RX_BYTES_FIELD: usize = 0;
const TX_BYTES_FIELD: usize = 8;

#[derive(Debug, Clone)]
pub struct ProcNetDev {
    stats_path: PathBuf,
    class_net_dir: PathBuf,
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self::with_paths(PROC_NET_DEV, SYS_CLASS_NET)
    }
}

impl ProcNetDev {
    /// Reader over a custom table and interface directory (tests, containers
    /// with a bind-mounted host `/proc`).
    pub fn with_paths(stats_path: impl Into<PathBuf>, class_net_dir: impl Into<PathBuf>) -> Self {
        Self {
            stats_path: stats_path.into(),
            class_net_dir: class_net_dir.into(),
        }
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }

    pub fn is_readable(&self) -> bool {
        fs::File::open(&self.stats_path).is_ok()
    }

    fn read_table(&self) -> Result<String, StatsError> {
        fs::read_to_string(&self.stats_path).map_err(|e| {
            StatsError::Unavailable(format!("cannot read {}: {}", self.stats_path.display(), e))
        })
    }
}

impl InterfaceStats for ProcNetDev {
    fn read(&self, interface: &str) -> Result<InterfaceSample, StatsError> {
        let table = self.read_table()?;
        parse_proc_net_dev(&table, interface)
    }

    /// Entries of `/sys/class/net`, or the table's row names if that
    /// directory cannot be listed.
    fn interfaces(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(&self.class_net_dir) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|e| e.file_name().into_string().ok())
                .collect(),
            Err(_) => self
                .read_table()
                .map(|t| table_interfaces(&t))
                .unwrap_or_default(),
        };
        names.sort();
        names
    }
}

/// Finds `interface` in a `/proc/net/dev` style table.
pub fn parse_proc_net_dev(table: &str, interface: &str) -> Result<InterfaceSample, StatsError> {
    for line in table.lines() {
        let Some((name, counters)) = line.trim().split_once(':') else {
            continue;
        };
        if name.trim() != interface {
            continue;
        }
        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Err(StatsError::Malformed {
                interface: interface.to_string(),
                reason: format!("expected at least {} fields, got {}", MIN_FIELDS, fields.len()),
            });
        }
        let field = |index: usize, what: &str| {
            fields[index].parse::<u64>().map_err(|e| StatsError::Malformed {
                interface: interface.to_string(),
                reason: format!("{} `{}`: {}", what, fields[index], e),
            })
        };
        return Ok(InterfaceSample {
            received_bytes: field(RX_BYTES_FIELD, "received bytes")?,
            transmitted_bytes: field(TX_BYTES_FIELD, "transmitted bytes")?,
        });
    }
    Err(StatsError::InterfaceNotFound(interface.to_string()))
}

fn table_interfaces(table: &str) -> Vec<String> {
    table
        .lines()
        .filter_map(|line| line.trim().split_once(':'))
        .map(|(name, _)| name.trim())
        // header rows contain `|`, e.g. "Inter-|   Receive"
        .filter(|name| !name.is_empty() && !name.contains('|'))
        .map(str::to_string)
        .collect()
}
