//! Transaction phase machine
//!
//! One transaction is in flight at a time. Every phase other than
//! `Idle` is left again within one response timeout.

use hcp_protocol::TransactionKind;

use super::events::Event;

/// Transaction phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Waiting for the next poll tick
    Idle,
    /// Request being written to the bus
    Sending(TransactionKind),
    /// Request sent, waiting for the drive
    AwaitingResponse(TransactionKind),
    /// Drive answered
    Completed(TransactionKind),
    /// Drive did not answer usefully
    TimedOut(TransactionKind),
}

impl Phase {
    /// Kind of the transaction in flight
    pub fn kind(&self) -> Option<TransactionKind> {
        match *self {
            Phase::Idle => None,
            Phase::Sending(kind)
            | Phase::AwaitingResponse(kind)
            | Phase::Completed(kind)
            | Phase::TimedOut(kind) => Some(kind),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn is_awaiting_response(&self) -> bool {
        matches!(self, Phase::AwaitingResponse(_))
    }

    /// Process an event and return the next phase
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use Phase::*;

        match (self, event) {
            (Idle, Begin(kind)) => Sending(kind),

            (Sending(kind), Transmitted) => AwaitingResponse(kind),
            (Sending(kind), TransmitFailed) => TimedOut(kind),

            (AwaitingResponse(kind), ResponseReceived) => Completed(kind),
            (AwaitingResponse(kind), ResponseRejected) => TimedOut(kind),
            (AwaitingResponse(kind), DeadlineElapsed) => TimedOut(kind),

            (Completed(_), Settled) => Idle,
            (TimedOut(_), Settled) => Idle,

            // Default: stay in current phase
            _ => self,
        }
    }
}
