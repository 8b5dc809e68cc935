//! Drive-side responder
//!
//! Answers the bridge the way a real drive does: a bus scan gets the
//! identification block, a command poll gets the sync registers and an
//! optional drive-originated request. Status broadcasts go out on a
//! fixed interval whenever the drive is not silenced.

use hcp_protocol::registers::{
    ADDRESS_DRIVE, BUS_SCAN_READ_QTY, EXCEPTION_FLAG, FUNC_READ_WRITE_MULTIPLE_REGISTERS,
};
use hcp_protocol::{
    Action, DriveStatus, Frame, PollRequest, PollResponse, StatusBroadcast, TransactionKind,
};

use crate::bus::SimBus;
use crate::physics::DoorPhysics;

/// Identification words returned by a bus scan
pub const IDENTIFICATION: [u16; 3] = [0x0430, 0x10FF, 0xA845];

/// Default status broadcast interval
pub const DEFAULT_BROADCAST_INTERVAL_MS: u32 = 250;

/// Low byte of the second response register per transaction kind
const fn echo_tag(kind: TransactionKind) -> u16 {
    match kind {
        TransactionKind::BusScan => BUS_SCAN_READ_QTY,
        TransactionKind::CommandPoll => 0x0001,
    }
}

/// A simulated drive on the far end of a [`SimBus`]
#[derive(Debug)]
pub struct SimulatedDrive {
    bus: SimBus,
    door: DoorPhysics,
    sync_counter: u8,
    /// Number of actions latched so far, echoed in every response
    command_counter: u8,
    silent: bool,
    exception: Option<u8>,
    garbage: Vec<u8>,
    drive_request: u16,
    broadcast_interval_ms: u32,
    last_broadcast_ms: Option<u32>,
    last_service_ms: u32,
    requests: Vec<PollRequest>,
    rejected_requests: usize,
}

impl SimulatedDrive {
    pub fn new(bus: SimBus) -> Self {
        let now = bus.now_ms();
        Self {
            bus,
            door: DoorPhysics::new(10),
            sync_counter: 0,
            command_counter: 0,
            silent: false,
            exception: None,
            garbage: Vec::new(),
            drive_request: 0,
            broadcast_interval_ms: DEFAULT_BROADCAST_INTERVAL_MS,
            last_broadcast_ms: None,
            last_service_ms: now,
            requests: Vec::new(),
            rejected_requests: 0,
        }
    }

    pub fn with_door(mut self, door: DoorPhysics) -> Self {
        self.door = door;
        self
    }

    pub fn with_broadcast_interval(mut self, interval_ms: u32) -> Self {
        self.broadcast_interval_ms = interval_ms;
        self
    }

    pub fn door(&self) -> &DoorPhysics {
        &self.door
    }

    pub fn door_mut(&mut self) -> &mut DoorPhysics {
        &mut self.door
    }

    pub fn status(&self) -> DriveStatus {
        self.door.status()
    }

    /// Apply an action directly, as a wall button would
    pub fn press(&mut self, action: Action) {
        self.door.handle_action(action);
    }

    /// Stop answering and broadcasting
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// Answer every request with this Modbus exception code
    pub fn set_exception(&mut self, code: Option<u8>) {
        self.exception = code;
    }

    /// Bytes prepended to the next frame the drive sends
    pub fn inject_garbage(&mut self, bytes: &[u8]) {
        self.garbage.extend_from_slice(bytes);
    }

    /// Ask the host for an action in the next command poll response
    pub fn request_action(&mut self, code: u16) {
        self.drive_request = code;
    }

    /// Every well-formed request seen so far
    pub fn requests(&self) -> &[PollRequest] {
        &self.requests
    }

    /// Requests that arrived with a non-zero action
    pub fn actions_received(&self) -> Vec<u16> {
        self.requests
            .iter()
            .filter(|request| request.action.is_pending())
            .map(|request| request.action.code())
            .collect()
    }

    /// Requests that could not be parsed
    pub fn rejected_requests(&self) -> usize {
        self.rejected_requests
    }

    /// Run the drive up to the bus clock: move the door, answer any
    /// request the bridge has written and broadcast when due
    pub fn service(&mut self) {
        let now = self.bus.now_ms();
        self.door.advance(now.wrapping_sub(self.last_service_ms));
        self.last_service_ms = now;

        let written = self.bus.take_from_bridge();
        if !written.is_empty() {
            if let Some(reply) = self.handle_request(&written) {
                self.send(&reply);
            }
        }

        let due = self
            .last_broadcast_ms
            .map_or(true, |last| now.wrapping_sub(last) >= self.broadcast_interval_ms);
        if due && !self.silent {
            self.last_broadcast_ms = Some(now);
            let bytes = self.broadcast_bytes();
            self.send(&bytes);
        }
    }

    /// Encoded status broadcast for the current door state
    pub fn broadcast_bytes(&self) -> Vec<u8> {
        let frame = StatusBroadcast::new(self.door.status().to_registers()).to_frame();
        frame
            .and_then(|frame| frame.encode_to_vec())
            .map(|bytes| bytes.to_vec())
            .unwrap_or_default()
    }

    /// Parse one request and build the encoded reply
    ///
    /// Returns `None` when the drive stays silent or the bytes are not a
    /// request it understands.
    pub fn handle_request(&mut self, bytes: &[u8]) -> Option<Vec<u8>> {
        let request = Frame::decode(bytes)
            .ok()
            .and_then(|frame| PollRequest::from_frame(&frame).ok());
        let Some(request) = request else {
            self.rejected_requests += 1;
            return None;
        };
        self.requests.push(request);

        if self.silent {
            return None;
        }
        if let Some(code) = self.exception {
            let frame = Frame::new(
                ADDRESS_DRIVE,
                FUNC_READ_WRITE_MULTIPLE_REGISTERS | EXCEPTION_FLAG,
                &[code],
            )
            .ok()?;
            return frame.encode_to_vec().ok().map(|bytes| bytes.to_vec());
        }

        if let Some(action) = request.action.action() {
            self.door.handle_action(action);
            self.command_counter = self.command_counter.wrapping_add(1);
        }
        self.sync_counter = self.sync_counter.wrapping_add(1);

        let response = self.response_for(request.kind);
        let frame = response.to_frame().ok()?;
        frame.encode_to_vec().ok().map(|bytes| bytes.to_vec())
    }

    fn response_for(&mut self, kind: TransactionKind) -> PollResponse {
        let head = [
            (self.sync_counter as u16) << 8,
            (self.command_counter as u16) << 8 | echo_tag(kind),
        ];
        let mut response = PollResponse {
            kind,
            registers: heapless::Vec::new(),
        };
        let registers = &mut response.registers;
        let _ = registers.extend_from_slice(&head);
        match kind {
            TransactionKind::BusScan => {
                let _ = registers.extend_from_slice(&IDENTIFICATION);
            }
            TransactionKind::CommandPoll => {
                let request = core::mem::take(&mut self.drive_request);
                let _ = registers.push(request);
                while registers.len() < kind.read_quantity() as usize {
                    let _ = registers.push(0);
                }
            }
        }
        response
    }

    fn send(&mut self, bytes: &[u8]) {
        if !self.garbage.is_empty() {
            let garbage = core::mem::take(&mut self.garbage);
            self.bus.push_to_bridge(&garbage);
        }
        self.bus.push_to_bridge(bytes);
    }
}
