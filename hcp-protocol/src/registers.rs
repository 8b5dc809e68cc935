//! Bus addresses, function codes and the drive register map

/// Broadcast address used by the drive for status writes
pub const ADDRESS_BROADCAST: u8 = 0x00;
/// Bus address of the bridge as seen by the drive
pub const ADDRESS_DRIVE: u8 = 0x02;

/// Write multiple registers (status broadcast)
pub const FUNC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
/// Read/write multiple registers (bus scan and command poll)
pub const FUNC_READ_WRITE_MULTIPLE_REGISTERS: u8 = 0x17;
/// Set on the function code of a Modbus exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Base of the status registers written by the drive broadcast
pub const ADDR_STATUS: u16 = 0x9D31;
/// Register that receives the host action code
pub const ADDR_ACTION: u16 = 0x9C41;
/// Base of the registers read by bus scan and command poll
pub const ADDR_POLL: u16 = 0x9CB9;

/// Number of registers in a status broadcast
pub const STATUS_REGISTER_COUNT: usize = 9;
/// Registers read by the first transaction after start
pub const BUS_SCAN_READ_QTY: u16 = 5;
/// Registers read by every steady-state poll
pub const COMMAND_POLL_READ_QTY: u16 = 8;
/// Largest read quantity the bridge ever requests
pub const MAX_READ_QTY: usize = COMMAND_POLL_READ_QTY as usize;

/// Status register holding target (high byte) and current (low byte) position
pub const REG_POSITION: usize = 1;
/// Status register holding the drive state code in its high byte
pub const REG_STATE: usize = 2;
/// Status register holding the light flag
pub const REG_LIGHT: usize = 6;
/// Light-on bit within [`REG_LIGHT`]
pub const LIGHT_BIT: u16 = 0x0010;

/// Poll response register carrying a drive-originated action request
pub const REG_DRIVE_REQUEST: usize = 2;
/// Identification words at the end of a bus scan response
pub const IDENTIFICATION_WORDS: usize = BUS_SCAN_READ_QTY as usize - 2;

/// Highest position value; positions are percent × 2
pub const POSITION_MAX: u8 = 200;

/// Raw drive state codes as reported in the status broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateCode {
    Stopped,
    Opening,
    Closing,
    MoveHalf,
    MoveVenting,
    VentReached,
    Open,
    Closed,
    HalfOpenReached,
    /// Code not in the known table
    Other(u8),
}

impl StateCode {
    /// Parse a state code from its wire byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => StateCode::Stopped,
            0x01 => StateCode::Opening,
            0x02 => StateCode::Closing,
            0x05 => StateCode::MoveHalf,
            0x09 => StateCode::MoveVenting,
            0x0A => StateCode::VentReached,
            0x20 => StateCode::Open,
            0x40 => StateCode::Closed,
            0x80 => StateCode::HalfOpenReached,
            other => StateCode::Other(other),
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            StateCode::Stopped => 0x00,
            StateCode::Opening => 0x01,
            StateCode::Closing => 0x02,
            StateCode::MoveHalf => 0x05,
            StateCode::MoveVenting => 0x09,
            StateCode::VentReached => 0x0A,
            StateCode::Open => 0x20,
            StateCode::Closed => 0x40,
            StateCode::HalfOpenReached => 0x80,
            StateCode::Other(byte) => byte,
        }
    }

    /// Returns true while the door is travelling
    pub fn is_moving(&self) -> bool {
        matches!(
            self,
            StateCode::Opening | StateCode::Closing | StateCode::MoveHalf | StateCode::MoveVenting
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_roundtrip() {
        for byte in [0x00, 0x01, 0x02, 0x05, 0x09, 0x0A, 0x20, 0x40, 0x80] {
            let code = StateCode::from_byte(byte);
            assert!(!matches!(code, StateCode::Other(_)));
            assert_eq!(code.to_byte(), byte);
        }
    }

    #[test]
    fn test_unknown_code_preserved() {
        assert_eq!(StateCode::from_byte(0x33), StateCode::Other(0x33));
        assert_eq!(StateCode::Other(0x33).to_byte(), 0x33);
    }

    #[test]
    fn test_is_moving() {
        assert!(StateCode::MoveVenting.is_moving());
        assert!(!StateCode::Closed.is_moving());
        assert!(!StateCode::Other(0x01).is_moving());
    }
}
