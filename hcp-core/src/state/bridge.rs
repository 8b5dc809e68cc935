//! State owned by the agent for its lifetime

use hcp_protocol::registers::IDENTIFICATION_WORDS;
use hcp_protocol::{DriveState, DriveStatus};

use crate::link::{LinkChange, LinkMonitor};

/// Everything the host may read, captured at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeSnapshot {
    /// Last good status; `state` is `Error` while the drive reports a fault
    pub status: DriveStatus,
    pub connected: bool,
    /// A status broadcast has been decoded at least once
    pub valid: bool,
}

impl BridgeSnapshot {
    /// Snapshot before the agent has run
    pub const EMPTY: Self = Self {
        status: DriveStatus::UNKNOWN,
        connected: false,
        valid: false,
    };
}

impl Default for BridgeSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Agent-side bridge state
///
/// Mutated only from the agent loop. The host sees it through
/// [`BridgeSnapshot`]s published whole.
#[derive(Debug, Clone)]
pub struct BridgeState {
    /// Last successfully decoded status
    status: Option<DriveStatus>,
    /// Drive answered the last poll with an exception
    fault: bool,
    link: LinkMonitor,
    identification: Option<[u16; IDENTIFICATION_WORDS]>,
}

impl BridgeState {
    pub fn new(disconnect_threshold: u8) -> Self {
        Self {
            status: None,
            fault: false,
            link: LinkMonitor::new(disconnect_threshold),
            identification: None,
        }
    }

    /// Store a freshly decoded status
    ///
    /// Returns true if it differs from the previous one.
    pub fn apply_status(&mut self, status: DriveStatus) -> bool {
        let changed = self.status != Some(status);
        self.status = Some(status);
        changed
    }

    /// Record whether the drive answered with an exception
    pub fn set_fault(&mut self, fault: bool) {
        self.fault = fault;
    }

    pub fn record_success(&mut self) -> LinkChange {
        self.link.record_success()
    }

    pub fn record_timeout(&mut self) -> LinkChange {
        self.link.record_timeout()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn link(&self) -> &LinkMonitor {
        &self.link
    }

    /// Status as the host should see it
    pub fn status(&self) -> DriveStatus {
        let status = self.status.unwrap_or(DriveStatus::UNKNOWN);
        if self.fault {
            status.with_state(DriveState::Error)
        } else {
            status
        }
    }

    pub fn set_identification(&mut self, words: [u16; IDENTIFICATION_WORDS]) {
        self.identification = Some(words);
    }

    /// Identification words from the last bus scan
    pub fn identification(&self) -> Option<[u16; IDENTIFICATION_WORDS]> {
        self.identification
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            status: self.status(),
            connected: self.is_connected(),
            valid: self.status.is_some(),
        }
    }
}
