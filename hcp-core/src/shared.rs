//! Cross-context shared region
//!
//! The one piece of state both execution contexts touch. It lives at a
//! fixed address in LP RAM when the coprocessor runs the bus, or in a
//! static on the application core otherwise. Every field is a 32-bit
//! atomic so both sides agree on the layout and no field is ever torn.
//!
//! ```text
//! offset  field          writer   reader
//! 0x00    magic          reset()  both
//! 0x04    status         agent    host   (packed BridgeSnapshot)
//! 0x08    action         host     agent  (0 = empty)
//! 0x0C    drive_request  agent    host   (0 = none)
//! ```
//!
//! Status word layout:
//!
//! ```text
//! bits 0-7    current position
//! bits 8-15   target position
//! bits 16-23  raw state code
//! bits 24-31  flags: light, connected, error, valid
//! ```

use portable_atomic::{AtomicU32, Ordering};

use hcp_protocol::{ActionRequest, DriveState, DriveStatus, StateCode};

use crate::state::BridgeSnapshot;

/// Layout marker ("HCP2")
pub const REGION_MAGIC: u32 = 0x4843_5032;

const FLAG_LIGHT: u8 = 0x01;
const FLAG_CONNECTED: u8 = 0x02;
const FLAG_ERROR: u8 = 0x04;
const FLAG_VALID: u8 = 0x08;

/// Packed form of [`BridgeSnapshot::EMPTY`]
const EMPTY_STATUS_WORD: u32 = 0x00FF_0000;

impl BridgeSnapshot {
    /// Pack into one status word
    pub fn to_word(&self) -> u32 {
        let mut flags = 0u8;
        if self.status.light_on {
            flags |= FLAG_LIGHT;
        }
        if self.connected {
            flags |= FLAG_CONNECTED;
        }
        if self.status.state == DriveState::Error {
            flags |= FLAG_ERROR;
        }
        if self.valid {
            flags |= FLAG_VALID;
        }
        u32::from_le_bytes([
            self.status.position,
            self.status.target,
            self.status.code.to_byte(),
            flags,
        ])
    }

    /// Unpack a status word
    pub fn from_word(word: u32) -> Self {
        let [position, target, code, flags] = word.to_le_bytes();
        let valid = flags & FLAG_VALID != 0;
        let mut status = if valid {
            DriveStatus::new(
                position,
                target,
                StateCode::from_byte(code),
                flags & FLAG_LIGHT != 0,
            )
        } else {
            DriveStatus::UNKNOWN
        };
        if flags & FLAG_ERROR != 0 {
            status = status.with_state(DriveState::Error);
        }
        Self {
            status,
            connected: flags & FLAG_CONNECTED != 0,
            valid,
        }
    }
}

/// State shared between the agent and the host
#[repr(C)]
#[derive(Debug)]
pub struct SharedRegion {
    magic: AtomicU32,
    status: AtomicU32,
    action: AtomicU32,
    drive_request: AtomicU32,
}

impl SharedRegion {
    /// Create an initialised region, for use in a `static`
    pub const fn new() -> Self {
        Self {
            magic: AtomicU32::new(REGION_MAGIC),
            status: AtomicU32::new(EMPTY_STATUS_WORD),
            action: AtomicU32::new(0),
            drive_request: AtomicU32::new(0),
        }
    }

    /// Clear all fields and stamp the layout marker
    ///
    /// Used when the region sits in memory nobody initialised.
    pub fn reset(&self) {
        self.status.store(EMPTY_STATUS_WORD, Ordering::Relaxed);
        self.action.store(0, Ordering::Relaxed);
        self.drive_request.store(0, Ordering::Relaxed);
        self.magic.store(REGION_MAGIC, Ordering::Release);
    }

    pub fn is_initialised(&self) -> bool {
        self.magic.load(Ordering::Acquire) == REGION_MAGIC
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: BridgeSnapshot) {
        self.status.store(snapshot.to_word(), Ordering::Release);
    }

    /// Read the published snapshot
    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot::from_word(self.status.load(Ordering::Acquire))
    }

    /// Put an action in the slot, replacing any unsent one
    ///
    /// Returns the action that was replaced.
    pub fn post_action(&self, request: ActionRequest) -> ActionRequest {
        let previous = self.action.swap(request.code() as u32, Ordering::AcqRel);
        ActionRequest::new(previous as u16)
    }

    /// Empty the slot, returning what it held
    pub fn take_action(&self) -> ActionRequest {
        ActionRequest::new(self.action.swap(0, Ordering::AcqRel) as u16)
    }

    /// Look at the slot without emptying it
    pub fn pending_action(&self) -> ActionRequest {
        ActionRequest::new(self.action.load(Ordering::Acquire) as u16)
    }

    /// Publish an action requested by the drive
    pub fn publish_drive_request(&self, code: u16) {
        self.drive_request.store(code as u32, Ordering::Release);
    }

    /// Take the last drive request, if any
    pub fn take_drive_request(&self) -> Option<u16> {
        match self.drive_request.swap(0, Ordering::AcqRel) as u16 {
            0 => None,
            code => Some(code),
        }
    }
}

impl Default for SharedRegion {
    fn default() -> Self {
        Self::new()
    }
}
