//! Frame encoding and decoding for the HCP bus.
//!
//! Frame format:
//! - ADDRESS (1 byte): 0x02 for the bridge, 0x00 for broadcasts
//! - FUNCTION (1 byte): Modbus function code
//! - PAYLOAD (0-255 bytes): function-specific data
//! - CRC16 (2 bytes): Modbus CRC over ADDRESS, FUNCTION and PAYLOAD,
//!   low byte first

use heapless::Vec;

use crate::registers::{
    ADDRESS_BROADCAST, ADDRESS_DRIVE, EXCEPTION_FLAG, FUNC_READ_WRITE_MULTIPLE_REGISTERS,
    FUNC_WRITE_MULTIPLE_REGISTERS,
};

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Smallest frame the decoder accepts (ADDRESS + FUNCTION + 1 + CRC)
pub const MIN_FRAME_SIZE: usize = 5;

/// Maximum complete frame size (ADDRESS + FUNCTION + MAX_PAYLOAD + CRC)
pub const MAX_FRAME_SIZE: usize = 1 + 1 + MAX_PAYLOAD_SIZE + 2;

const CRC_SEED: u16 = 0xFFFF;
const CRC_POLY: u16 = 0xA001;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Too few bytes to form a frame
    Truncated,
    /// CRC over the frame body does not match the trailing CRC
    ChecksumMismatch,
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Modbus CRC16 (reflected polynomial 0xA001, seed 0xFFFF)
///
/// The low byte of the result goes on the wire first.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC_SEED;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Bus address
    pub address: u8,
    /// Function code
    pub function: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given address, function and payload
    pub fn new(address: u8, function: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            address,
            function,
            payload: payload_vec,
        })
    }

    /// Number of bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        2 + self.payload.len() + 2
    }

    /// Returns true if this is a Modbus exception response
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_FLAG != 0
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let body_len = frame_len - 2;
        buffer[0] = self.address;
        buffer[1] = self.function;
        buffer[2..body_len].copy_from_slice(&self.payload);

        let crc = crc16(&buffer[..body_len]);
        buffer[body_len..frame_len].copy_from_slice(&crc.to_le_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode a complete frame, verifying its CRC
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < MIN_FRAME_SIZE {
            return Err(FrameError::Truncated);
        }
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let body_len = bytes.len() - 2;
        let received = u16::from_le_bytes([bytes[body_len], bytes[body_len + 1]]);
        if crc16(&bytes[..body_len]) != received {
            return Err(FrameError::ChecksumMismatch);
        }

        Self::new(bytes[0], bytes[1], &bytes[2..body_len])
    }
}

/// Expected wire length of a frame starting at the head of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameLength {
    /// Head byte(s) cannot start any frame the bridge receives
    Implausible,
    /// Header not complete yet
    NeedMore,
    /// Full frame length in bytes
    Known(usize),
}

/// Work out how long a received frame is from its header
///
/// Only the frames the bridge can receive are recognised: status
/// broadcasts, read/write responses and exception responses.
fn frame_length(buf: &[u8]) -> FrameLength {
    let Some(&address) = buf.first() else {
        return FrameLength::NeedMore;
    };
    if address != ADDRESS_BROADCAST && address != ADDRESS_DRIVE {
        return FrameLength::Implausible;
    }
    let Some(&function) = buf.get(1) else {
        return FrameLength::NeedMore;
    };

    let total = match (address, function) {
        (ADDRESS_BROADCAST, FUNC_WRITE_MULTIPLE_REGISTERS) => match buf.get(6) {
            Some(&count) => 7 + count as usize + 2,
            None => return FrameLength::NeedMore,
        },
        (ADDRESS_DRIVE, FUNC_READ_WRITE_MULTIPLE_REGISTERS) => match buf.get(2) {
            Some(&count) => 3 + count as usize + 2,
            None => return FrameLength::NeedMore,
        },
        (ADDRESS_DRIVE, f) if f == FUNC_READ_WRITE_MULTIPLE_REGISTERS | EXCEPTION_FLAG => 5,
        _ => return FrameLength::Implausible,
    };

    if total > MAX_FRAME_SIZE {
        FrameLength::Implausible
    } else {
        FrameLength::Known(total)
    }
}

/// Streaming parser for frames received from the bus
///
/// The bus gives no alignment guarantee: the parser may start listening
/// in the middle of a frame or see noise between frames. Bytes that
/// cannot begin a frame are dropped, and every plausible start in the
/// buffer is tried whenever a byte arrives.
#[derive(Debug, Clone, Default)]
pub struct FrameParser {
    buffer: Vec<u8, MAX_FRAME_SIZE>,
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Drop all buffered bytes
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting to complete a frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Discard a partial frame after an inter-frame gap
    ///
    /// Returns `Err(Truncated)` if there were buffered bytes.
    pub fn flush(&mut self) -> Result<(), FrameError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.buffer.clear();
        Err(FrameError::Truncated)
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err(ChecksumMismatch)`
    /// when the frame at the head of the buffer failed its CRC. The
    /// parser keeps resynchronising after an error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if self.buffer.is_full() {
            self.buffer.remove(0);
        }
        // Cannot fail: there is room after the removal above
        let _ = self.buffer.push(byte);
        self.discard_implausible_prefix();

        // A frame can only complete on the byte just received
        let mut head_mismatch = false;
        for start in 0..self.buffer.len() {
            let candidate = &self.buffer[start..];
            if frame_length(candidate) != FrameLength::Known(candidate.len()) {
                continue;
            }
            match Frame::decode(candidate) {
                Ok(frame) => {
                    self.buffer.clear();
                    return Ok(Some(frame));
                }
                Err(_) if start == 0 => head_mismatch = true,
                Err(_) => {}
            }
        }

        if head_mismatch {
            self.buffer.remove(0);
            self.discard_implausible_prefix();
            return Err(FrameError::ChecksumMismatch);
        }
        Ok(None)
    }

    fn discard_implausible_prefix(&mut self) {
        while !self.buffer.is_empty() && frame_length(&self.buffer) == FrameLength::Implausible {
            self.buffer.remove(0);
        }
    }
}
