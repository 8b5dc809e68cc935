//! Link monitor implementation
//!
//! Counts consecutive unanswered polls. The link is reported down once
//! the count reaches the threshold and comes back on the first answered
//! poll. Polling never stops while the link is down.

/// Connectivity transition caused by a poll outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkChange {
    Unchanged,
    Connected,
    Disconnected,
}

/// Consecutive-timeout tracker
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    /// Polls without a usable answer since the last good one
    consecutive_timeouts: u8,
    /// Timeouts that mark the link as down
    threshold: u8,
    connected: bool,
}

impl LinkMonitor {
    /// Create a monitor; the link starts out down
    pub fn new(threshold: u8) -> Self {
        Self {
            consecutive_timeouts: 0,
            threshold: threshold.max(1),
            connected: false,
        }
    }

    /// Record an answered poll
    pub fn record_success(&mut self) -> LinkChange {
        self.consecutive_timeouts = 0;
        if self.connected {
            LinkChange::Unchanged
        } else {
            self.connected = true;
            LinkChange::Connected
        }
    }

    /// Record a poll that went unanswered
    pub fn record_timeout(&mut self) -> LinkChange {
        self.consecutive_timeouts = self.consecutive_timeouts.saturating_add(1);
        if self.connected && self.consecutive_timeouts >= self.threshold {
            self.connected = false;
            LinkChange::Disconnected
        } else {
            LinkChange::Unchanged
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Get number of consecutive timeouts
    pub fn consecutive_timeouts(&self) -> u8 {
        self.consecutive_timeouts
    }
}
