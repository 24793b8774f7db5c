//! Resolving the effective stop condition before any worker starts.

use crate::ifstats::{detect_interface, InterfaceSample, InterfaceStats};
use crate::monitor::MonitorMode;
use crate::reporter::ProgressTarget;

use super::EngineError;

/// What ends a run besides an interrupt or the deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopCondition {
    Unbounded,
    ByteCap(u64),
    Parity {
        interface: String,
        offset: u64,
        /// Counters read at startup.
        baseline: InterfaceSample,
    },
}

impl StopCondition {
    /// Parity gap measured at startup; `None` outside parity mode.
    pub fn initial_gap(&self) -> Option<u64> {
        match self {
            StopCondition::Parity {
                offset, baseline, ..
            } => Some(baseline.gap(*offset)),
            _ => None,
        }
    }

    /// Byte budget implied by the condition, for display. Parity uses the
    /// startup gap; the live gap stays authoritative.
    pub fn effective_cap(&self) -> Option<u64> {
        match self {
            StopCondition::Unbounded => None,
            StopCondition::ByteCap(limit) => Some(*limit),
            StopCondition::Parity { .. } => self.initial_gap(),
        }
    }

    pub fn interface(&self) -> Option<&str> {
        match self {
            StopCondition::Parity { interface, .. } => Some(interface),
            _ => None,
        }
    }

    pub fn monitor_mode(&self) -> Option<MonitorMode> {
        match self {
            StopCondition::Unbounded => None,
            StopCondition::ByteCap(limit) => Some(MonitorMode::ByteCap(*limit)),
            StopCondition::Parity {
                interface, offset, ..
            } => Some(MonitorMode::Parity {
                interface: interface.clone(),
                offset: *offset,
            }),
        }
    }

    pub fn progress_target(&self) -> ProgressTarget {
        match self {
            StopCondition::Unbounded => ProgressTarget::None,
            StopCondition::ByteCap(limit) => ProgressTarget::Cap(*limit),
            StopCondition::Parity {
                interface,
                offset,
                baseline,
            } => ProgressTarget::Parity {
                interface: interface.clone(),
                offset: *offset,
                initial_gap: baseline.gap(*offset),
            },
        }
    }
}

/// Parity request as given by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParityRequest {
    /// `None` = auto-detect.
    pub interface: Option<String>,
    pub offset: u64,
}

/// Operator-facing stop options, before interface counters are read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopRequest {
    /// 0 = no cap.
    pub byte_cap: u64,
    pub parity: Option<ParityRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Run(StopCondition),
    /// Parity requested but received already covers transmitted + offset.
    AlreadyBalanced {
        interface: String,
        sample: InterfaceSample,
        offset: u64,
    },
}

/// Turns a request into a concrete condition. Parity wins over a byte cap.
pub fn resolve_stop_condition<S: InterfaceStats + ?Sized>(
    request: &StopRequest,
    stats: &S,
) -> Result<Resolution, EngineError> {
    let Some(parity) = &request.parity else {
        return Ok(Resolution::Run(if request.byte_cap == 0 {
            StopCondition::Unbounded
        } else {
            StopCondition::ByteCap(request.byte_cap)
        }));
    };

    if request.byte_cap > 0 {
        tracing::warn!(byte_cap = request.byte_cap, "parity mode ignores the byte cap");
    }

    let interface = match parity.interface.as_deref().filter(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => detect_interface(stats),
    };
    let baseline = stats
        .read(&interface)
        .map_err(|source| EngineError::InterfaceUnavailable {
            interface: interface.clone(),
            source,
        })?;

    let gap = baseline.gap(parity.offset);
    tracing::info!(
        interface = %interface,
        rx = baseline.received_bytes,
        tx = baseline.transmitted_bytes,
        offset = parity.offset,
        gap,
        "parity baseline"
    );
    if gap == 0 {
        return Ok(Resolution::AlreadyBalanced {
            interface,
            sample: baseline,
            offset: parity.offset,
        });
    }
    Ok(Resolution::Run(StopCondition::Parity {
        interface,
        offset: parity.offset,
        baseline,
    }))
}
