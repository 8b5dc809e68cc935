//! Events that trigger phase transitions

use hcp_protocol::TransactionKind;

/// Events that can trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Cadence events
    /// Poll interval elapsed; start a transaction of this kind
    Begin(TransactionKind),

    // Transmit events
    /// Request bytes left the UART
    Transmitted,
    /// UART write failed
    TransmitFailed,

    // Response events
    /// A response matching the request arrived
    ResponseReceived,
    /// A response arrived but could not be used
    ResponseRejected,
    /// Response timeout elapsed
    DeadlineElapsed,

    /// Outcome recorded; ready for the next transaction
    Settled,
}

impl Event {
    /// Check if this event ends the wait for a response
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            Event::TransmitFailed
                | Event::ResponseReceived
                | Event::ResponseRejected
                | Event::DeadlineElapsed
        )
    }
}
