//! Best-effort choice of the host's main interface.

use super::InterfaceStats;

/// Common names of a VM / server uplink, most likely first.
pub const PREFERRED_INTERFACES: &[&str] =
    &["eth0", "ens3", "ens18", "ens192", "enp0s3", "enp1s0", "venet0"];

/// Returned when no candidate can be read.
pub const FALLBACK_INTERFACE: &str = "eth0";

const IGNORED_PREFIXES: &[&str] = &["docker", "br-", "veth", "virbr"];

/// Loopback, container bridges and virtual ethernet pairs.
pub fn is_ignored_interface(name: &str) -> bool {
    name == "lo" || IGNORED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Preferred names first, then every other non-virtual interface on the host;
/// the first one whose counters can be read wins. Never fails.
pub fn detect_interface<S: InterfaceStats + ?Sized>(stats: &S) -> String {
    let mut candidates: Vec<String> = PREFERRED_INTERFACES.iter().map(|s| s.to_string()).collect();
    for name in stats.interfaces() {
        if !is_ignored_interface(&name) && !candidates.contains(&name) {
            candidates.push(name);
        }
    }
    match candidates.into_iter().find(|c| stats.read(c).is_ok()) {
        Some(name) => {
            tracing::debug!(interface = %name, "detected interface");
            name
        }
        None => {
            tracing::warn!(
                interface = FALLBACK_INTERFACE,
                "no readable interface found, using fallback"
            );
            FALLBACK_INTERFACE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifstats::{InterfaceSample, StatsError};

    struct Host {
        present: Vec<&'static str>,
    }

    impl InterfaceStats for Host {
        fn read(&self, interface: &str) -> Result<InterfaceSample, StatsError> {
            if self.present.contains(&interface) {
                Ok(InterfaceSample::default())
            } else {
                Err(StatsError::InterfaceNotFound(interface.to_string()))
            }
        }

        fn interfaces(&self) -> Vec<String> {
            self.present.iter().map(|s| s.to_string()).collect()
        }
    }

    #[test]
    fn prefers_known_names() {
        let host = Host {
            present: vec!["docker0", "wlp2s0", "ens18"],
        };
        assert_eq!(detect_interface(&host), "ens18");
    }

    #[test]
    fn skips_virtual_interfaces() {
        let host = Host {
            present: vec!["lo", "docker0", "br-1a2b", "veth99", "virbr0", "wlp2s0"],
        };
        assert_eq!(detect_interface(&host), "wlp2s0");
    }

    #[test]
    fn falls_back_when_nothing_readable() {
        let host = Host {
            present: vec!["lo", "docker0"],
        };
        assert_eq!(detect_interface(&host), FALLBACK_INTERFACE);
    }

    #[test]
    fn ignored_patterns() {
        assert!(is_ignored_interface("lo"));
        assert!(is_ignored_interface("veth1234"));
        assert!(!is_ignored_interface("eth0"));
        assert!(!is_ignored_interface("bond0"));
    }
}
