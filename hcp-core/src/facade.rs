//! Host-facing bridge facade
//!
//! The integration layer talks to the bridge only through this type. It
//! never blocks and never touches the bus: it reads the last published
//! snapshot and writes the single action slot.

use hcp_protocol::{Action, ActionRequest, DriveStatus};

use crate::shared::SharedRegion;
use crate::state::BridgeSnapshot;

/// Host view of a running agent
#[derive(Debug, Clone, Copy)]
pub struct BridgeFacade<'r> {
    region: &'r SharedRegion,
}

impl<'r> BridgeFacade<'r> {
    pub fn new(region: &'r SharedRegion) -> Self {
        Self { region }
    }

    /// Queue an action code for the next poll
    ///
    /// Replaces any action not yet sent. Zero clears the slot.
    pub fn enqueue(&self, code: u16) {
        self.region.post_action(ActionRequest::new(code));
    }

    /// Queue a known action
    pub fn enqueue_action(&self, action: Action) {
        self.region.post_action(action.into());
    }

    /// Drop an action that has not been sent yet
    ///
    /// Returns the cancelled action, if there was one.
    pub fn cancel(&self) -> Option<ActionRequest> {
        let previous = self.region.take_action();
        previous.is_pending().then_some(previous)
    }

    /// Action waiting to be sent
    pub fn pending(&self) -> ActionRequest {
        self.region.pending_action()
    }

    /// Last status reported by the drive
    pub fn current_status(&self) -> DriveStatus {
        self.region.snapshot().status
    }

    pub fn is_connected(&self) -> bool {
        self.region.snapshot().connected
    }

    /// Status and connectivity read together
    pub fn snapshot(&self) -> BridgeSnapshot {
        self.region.snapshot()
    }

    /// Take the last action the drive asked the host to perform
    pub fn take_drive_request(&self) -> Option<u16> {
        self.region.take_drive_request()
    }
}
