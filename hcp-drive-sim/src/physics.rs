//! Door movement model

use hcp_protocol::registers::POSITION_MAX;
use hcp_protocol::{Action, DriveStatus, StateCode};

/// Half-open stop position
pub const HALF_OPEN_POSITION: u8 = 100;
/// Vent stop position
pub const VENT_POSITION: u8 = 20;

/// A door that travels one position unit per `ms_per_unit`
#[derive(Debug, Clone)]
pub struct DoorPhysics {
    pub position: u8,
    pub target: u8,
    pub light_on: bool,
    /// Last move was a vent request
    pub venting: bool,
    ms_per_unit: u32,
    /// Time carried over between advances
    carry_ms: u32,
}

impl DoorPhysics {
    /// Closed door
    pub fn new(ms_per_unit: u32) -> Self {
        Self {
            position: 0,
            target: 0,
            light_on: false,
            venting: false,
            ms_per_unit: ms_per_unit.max(1),
            carry_ms: 0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.position != self.target
    }

    /// Move the door for `elapsed_ms`
    pub fn advance(&mut self, elapsed_ms: u32) {
        if !self.is_moving() {
            self.carry_ms = 0;
            return;
        }
        self.carry_ms += elapsed_ms;
        while self.carry_ms >= self.ms_per_unit && self.is_moving() {
            self.carry_ms -= self.ms_per_unit;
            if self.position < self.target {
                self.position += 1;
            } else {
                self.position -= 1;
            }
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Open => self.move_to(POSITION_MAX, false),
            Action::Close => self.move_to(0, false),
            Action::Stop => self.target = self.position,
            Action::HalfOpen => self.move_to(HALF_OPEN_POSITION, false),
            Action::Vent => self.move_to(VENT_POSITION, true),
            Action::ToggleLight => self.light_on = !self.light_on,
        }
    }

    fn move_to(&mut self, target: u8, venting: bool) {
        self.target = target;
        self.venting = venting;
    }

    /// State code the drive would report right now
    pub fn state_code(&self) -> StateCode {
        if self.is_moving() {
            return match (self.target > self.position, self.target) {
                (true, VENT_POSITION) if self.venting => StateCode::MoveVenting,
                (true, HALF_OPEN_POSITION) => StateCode::MoveHalf,
                (true, _) => StateCode::Opening,
                (false, _) => StateCode::Closing,
            };
        }
        match self.position {
            POSITION_MAX => StateCode::Open,
            0 => StateCode::Closed,
            VENT_POSITION if self.venting => StateCode::VentReached,
            HALF_OPEN_POSITION => StateCode::HalfOpenReached,
            _ => StateCode::Stopped,
        }
    }

    pub fn status(&self) -> DriveStatus {
        DriveStatus::new(self.position, self.target, self.state_code(), self.light_on)
    }
}
