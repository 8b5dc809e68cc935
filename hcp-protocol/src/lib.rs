//! HCP Drive Bus Protocol
//!
//! This crate defines the serial protocol between the bridge and a
//! garage/door drive controller. HCP is derived from Modbus RTU: frames
//! carry no start byte or length field, only an address, a function
//! code, a function-specific payload and a CRC16.
//!
//! # Frame Format
//!
//! ```text
//! ┌─────────┬──────────┬─────────────┬───────────┐
//! │ ADDRESS │ FUNCTION │ PAYLOAD     │ CRC16     │
//! │ 1B      │ 1B       │ 0–255B      │ 2B (LE)   │
//! └─────────┴──────────┴─────────────┴───────────┘
//! ```
//!
//! # Transactions
//!
//! - Bus scan / command poll: the bridge sends a combined read+write
//!   (function 0x17) to the drive and gets a register dump back. The
//!   write carries the pending host action code.
//! - Status broadcast: the drive writes its status registers (function
//!   0x10) to the broadcast address. Nobody answers.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod action;
pub mod frame;
pub mod messages;
pub mod registers;
pub mod status;

pub use action::{Action, ActionRequest};
pub use frame::{crc16, Frame, FrameError, FrameParser, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{DecodeError, Incoming, PollRequest, PollResponse, StatusBroadcast, TransactionKind};
pub use registers::StateCode;
pub use status::{DriveState, DriveStatus, StatusDecoder};
