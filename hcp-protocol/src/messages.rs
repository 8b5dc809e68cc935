//! Transaction message shapes for the HCP bus
//!
//! Messages fall into two directions:
//! - Bridge → Drive: bus scan and command poll requests
//! - Drive → Bridge: poll responses, exception responses and the
//!   unsolicited status broadcast

use heapless::Vec;

use crate::action::ActionRequest;
use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use crate::registers::{
    ADDRESS_BROADCAST, ADDRESS_DRIVE, ADDR_ACTION, ADDR_POLL, ADDR_STATUS, BUS_SCAN_READ_QTY,
    COMMAND_POLL_READ_QTY, EXCEPTION_FLAG, FUNC_READ_WRITE_MULTIPLE_REGISTERS,
    FUNC_WRITE_MULTIPLE_REGISTERS, IDENTIFICATION_WORDS, MAX_READ_QTY, REG_DRIVE_REQUEST,
    STATUS_REGISTER_COUNT,
};

/// Request payload: read addr, read qty, write addr, write qty, byte count, data
const POLL_REQUEST_PAYLOAD_LEN: usize = 2 + 2 + 2 + 2 + 1 + 2;

/// Status broadcast header: write addr, write qty, byte count
const STATUS_HEADER_LEN: usize = 5;

/// First identification word in a bus scan response
const IDENTIFICATION_START: usize = BUS_SCAN_READ_QTY as usize - IDENTIFICATION_WORDS;

/// Errors interpreting a frame with a valid checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Status broadcast with an unexpected register layout
    MalformedStatus,
    /// Poll or exception response with an unexpected layout
    MalformedResponse,
    /// Poll request with an unexpected layout
    MalformedRequest,
    /// Address/function pair the receiver does not handle
    UnexpectedFrame,
    /// Write addressed to a register block other than the expected one
    UnknownRegister,
}

/// The two request shapes the bridge sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionKind {
    /// First poll after start or after the link dropped
    BusScan,
    /// Steady-state poll
    CommandPoll,
}

impl TransactionKind {
    /// Number of registers read by this transaction
    pub const fn read_quantity(self) -> u16 {
        match self {
            TransactionKind::BusScan => BUS_SCAN_READ_QTY,
            TransactionKind::CommandPoll => COMMAND_POLL_READ_QTY,
        }
    }

    pub fn from_read_quantity(quantity: u16) -> Option<Self> {
        match quantity {
            BUS_SCAN_READ_QTY => Some(TransactionKind::BusScan),
            COMMAND_POLL_READ_QTY => Some(TransactionKind::CommandPoll),
            _ => None,
        }
    }
}

/// Combined read/write request carrying the pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollRequest {
    pub kind: TransactionKind,
    pub action: ActionRequest,
}

impl PollRequest {
    pub fn new(kind: TransactionKind, action: ActionRequest) -> Self {
        Self { kind, action }
    }

    /// Encode this request into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        // Payload: [read addr][read qty][write addr][write qty=1][2][action]
        let mut payload = [0u8; POLL_REQUEST_PAYLOAD_LEN];
        payload[0..2].copy_from_slice(&ADDR_POLL.to_be_bytes());
        payload[2..4].copy_from_slice(&self.kind.read_quantity().to_be_bytes());
        payload[4..6].copy_from_slice(&ADDR_ACTION.to_be_bytes());
        payload[6..8].copy_from_slice(&1u16.to_be_bytes());
        payload[8] = 2;
        payload[9..11].copy_from_slice(&self.action.code().to_be_bytes());

        Frame::new(ADDRESS_DRIVE, FUNC_READ_WRITE_MULTIPLE_REGISTERS, &payload)
    }

    /// Parse a request as seen by the drive
    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        if frame.address != ADDRESS_DRIVE || frame.function != FUNC_READ_WRITE_MULTIPLE_REGISTERS {
            return Err(DecodeError::UnexpectedFrame);
        }
        let p = &frame.payload;
        if p.len() != POLL_REQUEST_PAYLOAD_LEN {
            return Err(DecodeError::MalformedRequest);
        }

        let read_addr = u16::from_be_bytes([p[0], p[1]]);
        let read_qty = u16::from_be_bytes([p[2], p[3]]);
        let write_addr = u16::from_be_bytes([p[4], p[5]]);
        let write_qty = u16::from_be_bytes([p[6], p[7]]);
        if read_addr != ADDR_POLL || write_addr != ADDR_ACTION {
            return Err(DecodeError::UnknownRegister);
        }
        if write_qty != 1 || p[8] != 2 {
            return Err(DecodeError::MalformedRequest);
        }
        let kind =
            TransactionKind::from_read_quantity(read_qty).ok_or(DecodeError::MalformedRequest)?;

        Ok(Self {
            kind,
            action: ActionRequest::new(u16::from_be_bytes([p[9], p[10]])),
        })
    }
}

/// Register dump returned by the drive for a poll request
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollResponse {
    pub kind: TransactionKind,
    pub registers: Vec<u16, MAX_READ_QTY>,
}

impl PollResponse {
    /// Parse the response to a request of the given kind
    pub fn from_frame(frame: &Frame, kind: TransactionKind) -> Result<Self, DecodeError> {
        if frame.address != ADDRESS_DRIVE || frame.function != FUNC_READ_WRITE_MULTIPLE_REGISTERS {
            return Err(DecodeError::UnexpectedFrame);
        }
        let expected = kind.read_quantity() as usize * 2;
        let Some((&byte_count, data)) = frame.payload.split_first() else {
            return Err(DecodeError::MalformedResponse);
        };
        if byte_count as usize != expected || data.len() != expected {
            return Err(DecodeError::MalformedResponse);
        }

        let mut registers = Vec::new();
        for pair in data.chunks_exact(2) {
            registers
                .push(u16::from_be_bytes([pair[0], pair[1]]))
                .map_err(|_| DecodeError::MalformedResponse)?;
        }
        Ok(Self { kind, registers })
    }

    /// Encode as the drive would answer
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        payload
            .push((self.registers.len() * 2) as u8)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        for register in &self.registers {
            payload
                .extend_from_slice(&register.to_be_bytes())
                .map_err(|_| FrameError::PayloadTooLarge)?;
        }
        Frame::new(ADDRESS_DRIVE, FUNC_READ_WRITE_MULTIPLE_REGISTERS, &payload)
    }

    /// Drive-side transaction counter
    pub fn sync_counter(&self) -> u8 {
        self.high_byte(0)
    }

    /// Last command code the drive latched
    pub fn command_echo(&self) -> u8 {
        self.high_byte(1)
    }

    /// Action the drive asks the host to perform, if any
    ///
    /// Only command polls carry this register.
    pub fn drive_request(&self) -> Option<u16> {
        if self.kind != TransactionKind::CommandPoll {
            return None;
        }
        self.registers
            .get(REG_DRIVE_REQUEST)
            .copied()
            .filter(|&value| value != 0)
    }

    /// Drive identification words from a bus scan
    pub fn identification(&self) -> &[u16] {
        match self.kind {
            TransactionKind::BusScan => self.registers.get(IDENTIFICATION_START..).unwrap_or(&[]),
            TransactionKind::CommandPoll => &[],
        }
    }

    fn high_byte(&self, index: usize) -> u8 {
        self.registers.get(index).map_or(0, |r| r.to_be_bytes()[0])
    }
}

/// Unsolicited status write from the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusBroadcast {
    pub registers: [u16; STATUS_REGISTER_COUNT],
}

impl StatusBroadcast {
    pub fn new(registers: [u16; STATUS_REGISTER_COUNT]) -> Self {
        Self { registers }
    }

    /// Parse a broadcast write to the status registers
    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        if frame.address != ADDRESS_BROADCAST || frame.function != FUNC_WRITE_MULTIPLE_REGISTERS {
            return Err(DecodeError::UnexpectedFrame);
        }
        let p = &frame.payload;
        if p.len() < STATUS_HEADER_LEN {
            return Err(DecodeError::MalformedStatus);
        }
        if u16::from_be_bytes([p[0], p[1]]) != ADDR_STATUS {
            return Err(DecodeError::UnknownRegister);
        }

        let quantity = u16::from_be_bytes([p[2], p[3]]) as usize;
        let byte_count = p[4] as usize;
        let data = &p[STATUS_HEADER_LEN..];
        if quantity != STATUS_REGISTER_COUNT
            || byte_count != STATUS_REGISTER_COUNT * 2
            || data.len() != byte_count
        {
            return Err(DecodeError::MalformedStatus);
        }

        let mut registers = [0u16; STATUS_REGISTER_COUNT];
        for (register, pair) in registers.iter_mut().zip(data.chunks_exact(2)) {
            *register = u16::from_be_bytes([pair[0], pair[1]]);
        }
        Ok(Self { registers })
    }

    /// Encode as the drive would send it
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut payload = [0u8; STATUS_HEADER_LEN + STATUS_REGISTER_COUNT * 2];
        payload[0..2].copy_from_slice(&ADDR_STATUS.to_be_bytes());
        payload[2..4].copy_from_slice(&(STATUS_REGISTER_COUNT as u16).to_be_bytes());
        payload[4] = (STATUS_REGISTER_COUNT * 2) as u8;
        for (i, register) in self.registers.iter().enumerate() {
            let at = STATUS_HEADER_LEN + i * 2;
            payload[at..at + 2].copy_from_slice(&register.to_be_bytes());
        }
        Frame::new(ADDRESS_BROADCAST, FUNC_WRITE_MULTIPLE_REGISTERS, &payload)
    }
}

/// A frame received by the bridge, sorted by what it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming<'a> {
    /// Drive status broadcast
    Broadcast(&'a Frame),
    /// Answer to the outstanding poll
    Response(&'a Frame),
    /// Modbus exception answer with its exception code
    Exception(u8),
}

impl<'a> Incoming<'a> {
    pub fn classify(frame: &'a Frame) -> Result<Self, DecodeError> {
        match (frame.address, frame.function) {
            (ADDRESS_BROADCAST, FUNC_WRITE_MULTIPLE_REGISTERS) => Ok(Incoming::Broadcast(frame)),
            (ADDRESS_DRIVE, FUNC_READ_WRITE_MULTIPLE_REGISTERS) => Ok(Incoming::Response(frame)),
            (ADDRESS_DRIVE, f) if f == FUNC_READ_WRITE_MULTIPLE_REGISTERS | EXCEPTION_FLAG => {
                match frame.payload.as_slice() {
                    [code] => Ok(Incoming::Exception(*code)),
                    _ => Err(DecodeError::MalformedResponse),
                }
            }
            _ => Err(DecodeError::UnexpectedFrame),
        }
    }
}
