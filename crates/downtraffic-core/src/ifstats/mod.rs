//! Network interface byte counters, used by parity mode.
//!
//! The engine only sees the `InterfaceStats` capability. On Linux it is backed
//! by the kernel's `/proc/net/dev` table (`ProcNetDev`); elsewhere the reader
//! is `StatsReader::Unavailable` and parity mode cannot start. Tests plug in
//! their own implementations.

mod detect;
mod proc_net;

pub use detect::{detect_interface, is_ignored_interface, FALLBACK_INTERFACE, PREFERRED_INTERFACES};
pub use proc_net::{parse_proc_net_dev, ProcNetDev};

/// Cumulative counters for one interface at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterfaceSample {
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

impl InterfaceSample {
    /// Bytes still to download until received catches up with transmitted + offset.
    /// Zero means parity is reached.
    pub fn gap(&self, offset: u64) -> u64 {
        self.transmitted_bytes
            .saturating_add(offset)
            .saturating_sub(self.received_bytes)
    }

    pub fn is_balanced(&self, offset: u64) -> bool {
        self.gap(offset) == 0
    }

    /// Per-direction growth since `earlier`.
    pub fn delta_since(&self, earlier: &InterfaceSample) -> InterfaceSample {
        InterfaceSample {
            received_bytes: self.received_bytes.saturating_sub(earlier.received_bytes),
            transmitted_bytes: self
                .transmitted_bytes
                .saturating_sub(earlier.transmitted_bytes),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("interface `{0}` not found in interface statistics")]
    InterfaceNotFound(String),
    #[error("interface statistics unavailable: {0}")]
    Unavailable(String),
    #[error("malformed statistics for `{interface}`: {reason}")]
    Malformed { interface: String, reason: String },
}

/// Read access to live interface counters.
pub trait InterfaceStats: Send + Sync {
    fn read(&self, interface: &str) -> Result<InterfaceSample, StatsError>;

    /// Interface names present on the host, in no particular order.
    fn interfaces(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Host capability: a live kernel reader, or nothing.
#[derive(Debug, Clone)]
pub enum StatsReader {
    Live(ProcNetDev),
    Unavailable,
}

impl StatsReader {
    /// Live reader when the kernel table is readable on this host.
    pub fn for_host() -> Self {
        if cfg!(target_os = "linux") {
            let live = ProcNetDev::default();
            if live.is_readable() {
                return StatsReader::Live(live);
            }
            tracing::debug!(path = %live.stats_path().display(), "interface statistics table not readable");
        }
        StatsReader::Unavailable
    }
}

impl InterfaceStats for StatsReader {
    fn read(&self, interface: &str) -> Result<InterfaceSample, StatsError> {
        match self {
            StatsReader::Live(reader) => reader.read(interface),
            StatsReader::Unavailable => Err(StatsError::Unavailable(
                "no kernel interface statistics on this platform".to_string(),
            )),
        }
    }

    fn interfaces(&self) -> Vec<String> {
        match self {
            StatsReader::Live(reader) => reader.interfaces(),
            StatsReader::Unavailable => Vec::new(),
        }
    }
}
