//! Door status as reported by the drive
//!
//! The drive publishes nine status registers in its broadcast. Only a
//! few carry meaning for the bridge:
//!
//! ```text
//! reg 1   target position (high byte) | current position (low byte)
//! reg 2   raw state code (high byte)
//! reg 6   bit 0x0010 = light on
//! ```

use crate::frame::Frame;
use crate::messages::{DecodeError, StatusBroadcast};
use crate::registers::{
    StateCode, LIGHT_BIT, POSITION_MAX, REG_LIGHT, REG_POSITION, REG_STATE, STATUS_REGISTER_COUNT,
};

/// Coarse door state exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveState {
    Idle,
    Opening,
    Closing,
    Error,
    Unknown,
}

impl DriveState {
    /// Map a raw drive state code to the coarse state
    ///
    /// Never fails: codes outside the known table are `Unknown`.
    pub fn from_code(code: StateCode) -> Self {
        match code {
            StateCode::Opening | StateCode::MoveHalf | StateCode::MoveVenting => DriveState::Opening,
            StateCode::Closing => DriveState::Closing,
            StateCode::Stopped
            | StateCode::Open
            | StateCode::Closed
            | StateCode::VentReached
            | StateCode::HalfOpenReached => DriveState::Idle,
            StateCode::Other(_) => DriveState::Unknown,
        }
    }

    /// Wire value used when packing the state for another context
    pub const fn to_u8(self) -> u8 {
        match self {
            DriveState::Idle => 0,
            DriveState::Opening => 1,
            DriveState::Closing => 2,
            DriveState::Error => 3,
            DriveState::Unknown => 4,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => DriveState::Idle,
            1 => DriveState::Opening,
            2 => DriveState::Closing,
            3 => DriveState::Error,
            _ => DriveState::Unknown,
        }
    }
}

/// Snapshot of the door as last reported by the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveStatus {
    /// Current position, 0 (closed) to 200 (open)
    pub position: u8,
    /// Position the drive is travelling to
    pub target: u8,
    pub state: DriveState,
    /// Raw state code the coarse state was derived from
    pub code: StateCode,
    pub light_on: bool,
}

impl DriveStatus {
    /// Status before anything has been heard from the drive
    pub const UNKNOWN: Self = Self {
        position: 0,
        target: 0,
        state: DriveState::Unknown,
        code: StateCode::Other(0xFF),
        light_on: false,
    };

    /// Build a status from a raw state code; positions are clamped
    pub fn new(position: u8, target: u8, code: StateCode, light_on: bool) -> Self {
        Self {
            position: position.min(POSITION_MAX),
            target: target.min(POSITION_MAX),
            state: DriveState::from_code(code),
            code,
            light_on,
        }
    }

    /// Interpret the nine status registers
    pub fn from_registers(registers: &[u16; STATUS_REGISTER_COUNT]) -> Self {
        let [target, position] = registers[REG_POSITION].to_be_bytes();
        let code = StateCode::from_byte(registers[REG_STATE].to_be_bytes()[0]);
        let light_on = registers[REG_LIGHT] & LIGHT_BIT != 0;
        Self::new(position, target, code, light_on)
    }

    /// Inverse of [`DriveStatus::from_registers`]; unused registers are zero
    pub fn to_registers(&self) -> [u16; STATUS_REGISTER_COUNT] {
        let mut registers = [0u16; STATUS_REGISTER_COUNT];
        registers[REG_POSITION] = u16::from_be_bytes([self.target, self.position]);
        registers[REG_STATE] = (self.code.to_byte() as u16) << 8;
        if self.light_on {
            registers[REG_LIGHT] = LIGHT_BIT;
        }
        registers
    }

    /// Same snapshot with a different coarse state
    pub fn with_state(self, state: DriveState) -> Self {
        Self { state, ..self }
    }

    /// Position as a percentage
    pub fn percent_open(&self) -> u8 {
        self.position / 2
    }
}

impl Default for DriveStatus {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Turns status broadcast frames into [`DriveStatus`] snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusDecoder;

impl StatusDecoder {
    /// Decode a status broadcast
    ///
    /// Rejects frames that are not broadcast writes to the status
    /// registers, or whose register layout is not the expected one.
    /// Unrecognised state codes are accepted.
    pub fn decode(frame: &Frame) -> Result<DriveStatus, DecodeError> {
        let broadcast = StatusBroadcast::from_frame(frame)?;
        Ok(DriveStatus::from_registers(&broadcast.registers))
    }
}
