//! Host actions and their register codes

/// Commands the host can send to the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    Open,
    Close,
    Stop,
    HalfOpen,
    Vent,
    ToggleLight,
}

impl Action {
    /// Register value written to the action register
    pub const fn code(self) -> u16 {
        match self {
            Action::Open => 0x0010,
            Action::Close => 0x0020,
            Action::Stop => 0x0040,
            Action::ToggleLight => 0x0200,
            Action::HalfOpen => 0x0400,
            Action::Vent => 0x4000,
        }
    }

    /// Look up the action for a register value
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0010 => Some(Action::Open),
            0x0020 => Some(Action::Close),
            0x0040 => Some(Action::Stop),
            0x0200 => Some(Action::ToggleLight),
            0x0400 => Some(Action::HalfOpen),
            0x4000 => Some(Action::Vent),
            _ => None,
        }
    }
}

/// A raw action code awaiting transmission; zero means no action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionRequest(pub u16);

impl ActionRequest {
    /// The empty request
    pub const NONE: Self = Self(0);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u16 {
        self.0
    }

    pub const fn is_pending(self) -> bool {
        self.0 != 0
    }

    /// Decode the code against the known action table
    pub fn action(self) -> Option<Action> {
        Action::from_code(self.0)
    }
}

impl From<Action> for ActionRequest {
    fn from(action: Action) -> Self {
        Self(action.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Action; 6] = [
        Action::Open,
        Action::Close,
        Action::Stop,
        Action::HalfOpen,
        Action::Vent,
        Action::ToggleLight,
    ];

    #[test]
    fn test_codes_are_disjoint_bits() {
        let mut seen = 0u16;
        for action in ALL {
            let code = action.code();
            assert_eq!(code.count_ones(), 1);
            assert_eq!(seen & code, 0);
            seen |= code;
        }
    }

    #[test]
    fn test_code_lookup() {
        for action in ALL {
            assert_eq!(Action::from_code(action.code()), Some(action));
        }
        assert_eq!(Action::from_code(0x0000), None);
        assert_eq!(Action::from_code(0x0011), None);
    }

    #[test]
    fn test_request_pending() {
        assert!(!ActionRequest::NONE.is_pending());
        let request = ActionRequest::from(Action::Close);
        assert!(request.is_pending());
        assert_eq!(request.code(), 0x0020);
        assert_eq!(request.action(), Some(Action::Close));
        assert_eq!(ActionRequest::new(0x1234).action(), None);
    }
}
