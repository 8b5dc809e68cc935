//! Bridge error type
//!
//! Every failure the agent loop can observe, flattened into one `Copy`
//! enum. None of them stop the loop.

use hcp_protocol::{DecodeError, FrameError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Partial frame dropped
    Truncated,
    /// Frame failed its CRC
    ChecksumMismatch,
    /// Status broadcast with an unexpected register layout
    MalformedStatus,
    /// Response that does not fit the outstanding request
    MalformedResponse,
    /// No response within the response timeout
    ResponseTimeout,
    /// UART read or write failed
    Transport,
}

impl From<FrameError> for BridgeError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Truncated => BridgeError::Truncated,
            FrameError::ChecksumMismatch => BridgeError::ChecksumMismatch,
            // Only reachable when building outgoing frames
            FrameError::PayloadTooLarge | FrameError::BufferTooSmall => BridgeError::Transport,
        }
    }
}

impl From<DecodeError> for BridgeError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MalformedStatus | DecodeError::UnknownRegister => {
                BridgeError::MalformedStatus
            }
            DecodeError::MalformedResponse
            | DecodeError::MalformedRequest
            | DecodeError::UnexpectedFrame => BridgeError::MalformedResponse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_errors() {
        assert_eq!(BridgeError::from(FrameError::Truncated), BridgeError::Truncated);
        assert_eq!(
            BridgeError::from(FrameError::ChecksumMismatch),
            BridgeError::ChecksumMismatch
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            BridgeError::from(DecodeError::UnknownRegister),
            BridgeError::MalformedStatus
        );
        assert_eq!(
            BridgeError::from(DecodeError::UnexpectedFrame),
            BridgeError::MalformedResponse
        );
    }
}
