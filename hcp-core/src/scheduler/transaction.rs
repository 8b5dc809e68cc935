//! Master-side transaction scheduler
//!
//! Runs one transaction at a time: a bus scan while the drive has not
//! answered yet, command polls once it has. Status broadcasts are
//! accepted whenever they arrive and never affect the poll cadence or
//! the link counter.
//!
//! All timestamps are free-running milliseconds compared with
//! `wrapping_sub`.

use heapless::Vec;

use hcp_protocol::registers::IDENTIFICATION_WORDS;
use hcp_protocol::{
    ActionRequest, DriveStatus, Frame, FrameParser, Incoming, PollRequest, PollResponse,
    StatusDecoder, TransactionKind, MAX_FRAME_SIZE,
};

use crate::config::TimingConfig;
use crate::error::BridgeError;
use crate::link::LinkChange;
use crate::state::{BridgeSnapshot, BridgeState, Event, Phase};

/// Maximum events reported per call
pub const MAX_EVENTS: usize = 16;

/// Events collected while servicing the bus
pub type Events = Vec<SchedulerEvent, MAX_EVENTS>;

/// Notable things that happened on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerEvent {
    /// Request handed to the UART
    Sent {
        kind: TransactionKind,
        action: ActionRequest,
    },
    /// Drive answered the outstanding request
    Completed(TransactionKind),
    /// Outstanding request got no usable answer
    TimedOut(TransactionKind),
    /// Status broadcast decoded and different from the last one
    StatusUpdated(DriveStatus),
    /// Status broadcast could not be decoded; previous status kept
    StatusRejected(BridgeError),
    /// Response did not fit the outstanding request
    ResponseRejected(BridgeError),
    /// Bytes discarded while looking for a frame
    FrameDropped(BridgeError),
    /// Response arrived with no request outstanding
    LateResponse,
    /// Drive identification from a bus scan
    Identified([u16; IDENTIFICATION_WORDS]),
    /// Drive asks the host to perform an action
    DriveRequest(u16),
    /// Drive answered with a Modbus exception
    DriveFault(u8),
    Connected,
    Disconnected,
}

fn push(events: &mut Events, event: SchedulerEvent) {
    // A full queue only loses the notification, state is already updated
    let _ = events.push(event);
}

/// Transaction scheduler
///
/// Owns the bridge state. Knows nothing about the UART: the agent
/// moves bytes in and out and reports when a request has been sent.
#[derive(Debug)]
pub struct TransactionScheduler {
    phase: Phase,
    parser: FrameParser,
    state: BridgeState,
    timing: TimingConfig,
    /// When the last transaction began; `None` before the first one
    last_poll_ms: Option<u32>,
    /// When the outstanding request finished transmitting
    sent_at_ms: u32,
    /// When bytes were last received
    last_rx_ms: u32,
}

impl TransactionScheduler {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            phase: Phase::Idle,
            parser: FrameParser::new(),
            state: BridgeState::new(timing.disconnect_threshold),
            timing,
            last_poll_ms: None,
            sent_at_ms: 0,
            last_rx_ms: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        self.state.snapshot()
    }

    /// Kind of the next transaction
    ///
    /// Bus scans continue until the drive answers one.
    pub fn next_kind(&self) -> TransactionKind {
        if self.state.is_connected() {
            TransactionKind::CommandPoll
        } else {
            TransactionKind::BusScan
        }
    }

    /// Whether a new transaction should start now
    pub fn is_due(&self, now_ms: u32) -> bool {
        self.phase.is_idle()
            && self
                .last_poll_ms
                .map_or(true, |last| now_ms.wrapping_sub(last) >= self.timing.poll_interval_ms)
    }

    /// Start a transaction if one is due
    ///
    /// `take_action` is called only when a request is actually built, so
    /// the pending action leaves its slot exactly when it is embedded.
    /// Returns the encoded request; the caller must then report
    /// [`transmitted`](Self::transmitted) or
    /// [`transmit_failed`](Self::transmit_failed).
    pub fn begin_if_due(
        &mut self,
        now_ms: u32,
        take_action: impl FnOnce() -> ActionRequest,
        events: &mut Events,
    ) -> Result<Option<Vec<u8, MAX_FRAME_SIZE>>, BridgeError> {
        if !self.is_due(now_ms) {
            return Ok(None);
        }

        let kind = self.next_kind();
        let action = take_action();
        self.phase = self.phase.transition(Event::Begin(kind));
        self.last_poll_ms = Some(now_ms);

        let request = PollRequest::new(kind, action);
        match request.to_frame().and_then(|frame| frame.encode_to_vec()) {
            Ok(bytes) => {
                trace!("sending {} action {=u16:#x}", kind, action.code());
                push(events, SchedulerEvent::Sent { kind, action });
                Ok(Some(bytes))
            }
            Err(err) => {
                self.transmit_failed(events);
                Err(err.into())
            }
        }
    }

    /// The request has left the UART; start the response timer
    pub fn transmitted(&mut self, now_ms: u32) {
        self.phase = self.phase.transition(Event::Transmitted);
        self.sent_at_ms = now_ms;
    }

    /// The request could not be written; counts as a timeout
    pub fn transmit_failed(&mut self, events: &mut Events) {
        warn!("request transmit failed");
        self.phase = self.phase.transition(Event::TransmitFailed);
        self.resolve_timeout(events);
    }

    /// Process bytes read from the UART
    pub fn on_bytes(&mut self, now_ms: u32, bytes: &[u8], events: &mut Events) {
        if bytes.is_empty() {
            return;
        }
        self.flush_stale(now_ms, events);
        self.last_rx_ms = now_ms;

        for &byte in bytes {
            match self.parser.feed(byte) {
                Ok(Some(frame)) => self.on_frame(&frame, events),
                Ok(None) => {}
                Err(err) => {
                    warn!("frame dropped: {}", err);
                    push(events, SchedulerEvent::FrameDropped(err.into()));
                }
            }
        }
    }

    /// Expire the outstanding request and stale partial frames
    pub fn check_timeouts(&mut self, now_ms: u32, events: &mut Events) {
        self.flush_stale(now_ms, events);

        if self.phase.is_awaiting_response()
            && now_ms.wrapping_sub(self.sent_at_ms) >= self.timing.response_timeout_ms
        {
            debug!("response timeout");
            self.phase = self.phase.transition(Event::DeadlineElapsed);
            self.resolve_timeout(events);
        }
    }

    /// Drop a partial frame once the bus has been silent long enough
    fn flush_stale(&mut self, now_ms: u32, events: &mut Events) {
        if self.parser.pending() == 0
            || now_ms.wrapping_sub(self.last_rx_ms) < self.timing.frame_gap_ms
        {
            return;
        }
        if let Err(err) = self.parser.flush() {
            warn!("partial frame dropped: {}", err);
            push(events, SchedulerEvent::FrameDropped(err.into()));
        }
    }

    fn on_frame(&mut self, frame: &Frame, events: &mut Events) {
        match Incoming::classify(frame) {
            Ok(Incoming::Broadcast(frame)) => self.on_broadcast(frame, events),
            Ok(Incoming::Response(frame)) => self.on_response(frame, events),
            Ok(Incoming::Exception(code)) => self.on_exception(code, events),
            Err(err) => {
                warn!("unexpected frame: {}", err);
                push(events, SchedulerEvent::FrameDropped(err.into()));
            }
        }
    }

    fn on_broadcast(&mut self, frame: &Frame, events: &mut Events) {
        match StatusDecoder::decode(frame) {
            Ok(status) => {
                debug!("status {}", status);
                if self.state.apply_status(status) {
                    push(events, SchedulerEvent::StatusUpdated(status));
                }
            }
            Err(err) => {
                warn!("malformed status broadcast: {}", err);
                push(events, SchedulerEvent::StatusRejected(err.into()));
            }
        }
    }

    fn on_response(&mut self, frame: &Frame, events: &mut Events) {
        let Phase::AwaitingResponse(kind) = self.phase else {
            debug!("ignoring response with no request outstanding");
            push(events, SchedulerEvent::LateResponse);
            return;
        };

        match PollResponse::from_frame(frame, kind) {
            Ok(response) => self.complete(&response, events),
            Err(err) => {
                warn!("malformed {} response: {}", kind, err);
                push(events, SchedulerEvent::ResponseRejected(err.into()));
                self.phase = self.phase.transition(Event::ResponseRejected);
                self.resolve_timeout(events);
            }
        }
    }

    fn on_exception(&mut self, code: u8, events: &mut Events) {
        if !self.phase.is_awaiting_response() {
            push(events, SchedulerEvent::LateResponse);
            return;
        }

        warn!("drive exception {=u8}", code);
        self.state.set_fault(true);
        push(events, SchedulerEvent::DriveFault(code));
        self.phase = self.phase.transition(Event::ResponseReceived);
        self.record_success(events);
        self.phase = self.phase.transition(Event::Settled);
    }

    fn complete(&mut self, response: &PollResponse, events: &mut Events) {
        self.phase = self.phase.transition(Event::ResponseReceived);
        self.state.set_fault(false);
        self.record_success(events);

        match response.kind {
            TransactionKind::BusScan => {
                let mut words = [0u16; IDENTIFICATION_WORDS];
                for (word, value) in words.iter_mut().zip(response.identification()) {
                    *word = *value;
                }
                info!(
                    "drive identification {=u16:#06x} {=u16:#06x} {=u16:#06x}",
                    words[0],
                    words[1],
                    words[2]
                );
                self.state.set_identification(words);
                push(events, SchedulerEvent::Identified(words));
            }
            TransactionKind::CommandPoll => {
                if let Some(code) = response.drive_request() {
                    info!("drive requests action {=u16:#06x}", code);
                    push(events, SchedulerEvent::DriveRequest(code));
                }
            }
        }

        trace!("{} completed, sync {=u8}", response.kind, response.sync_counter());
        push(events, SchedulerEvent::Completed(response.kind));
        self.phase = self.phase.transition(Event::Settled);
    }

    fn record_success(&mut self, events: &mut Events) {
        if self.state.record_success() == LinkChange::Connected {
            info!("drive connected");
            push(events, SchedulerEvent::Connected);
        }
    }

    fn resolve_timeout(&mut self, events: &mut Events) {
        if let Some(kind) = self.phase.kind() {
            push(events, SchedulerEvent::TimedOut(kind));
        }
        if self.state.record_timeout() == LinkChange::Disconnected {
            info!("drive disconnected");
            push(events, SchedulerEvent::Disconnected);
        }
        self.phase = self.phase.transition(Event::Settled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcp_protocol::{Action, DriveState, StateCode, StatusBroadcast};

    const TIMING: TimingConfig = TimingConfig {
        poll_interval_ms: 500,
        response_timeout_ms: 200,
        disconnect_threshold: 3,
        turnaround_ms: 2,
        frame_gap_ms: 10,
    };

    fn encode(frame: Frame) -> std::vec::Vec<u8> {
        frame.encode_to_vec().unwrap().to_vec()
    }

    fn response_bytes(kind: TransactionKind, registers: &[u16]) -> std::vec::Vec<u8> {
        let response = PollResponse {
            kind,
            registers: Vec::from_slice(registers).unwrap(),
        };
        encode(response.to_frame().unwrap())
    }

    fn scan_response() -> std::vec::Vec<u8> {
        response_bytes(TransactionKind::BusScan, &[0x0000, 0x0005, 0x0430, 0x10FF, 0xA845])
    }

    fn poll_response(request: u16) -> std::vec::Vec<u8> {
        response_bytes(TransactionKind::CommandPoll, &[0x0100, 0x0001, request, 0, 0, 0, 0, 0])
    }

    fn broadcast(status: DriveStatus) -> std::vec::Vec<u8> {
        encode(StatusBroadcast::new(status.to_registers()).to_frame().unwrap())
    }

    /// Begin and transmit a transaction at `now`
    fn send(sched: &mut TransactionScheduler, now: u32, events: &mut Events) -> std::vec::Vec<u8> {
        let bytes = sched
            .begin_if_due(now, || ActionRequest::NONE, events)
            .unwrap()
            .expect("transaction due");
        sched.transmitted(now);
        bytes.to_vec()
    }

    fn connected() -> TransactionScheduler {
        let mut sched = TransactionScheduler::new(TIMING);
        let mut events = Events::new();
        send(&mut sched, 0, &mut events);
        sched.on_bytes(5, &scan_response(), &mut events);
        assert!(sched.state().is_connected());
        sched
    }

    #[test]
    fn test_first_transaction_is_bus_scan() {
        let mut sched = TransactionScheduler::new(TIMING);
        let mut events = Events::new();

        assert!(sched.is_due(0));
        let bytes = send(&mut sched, 0, &mut events);
        assert_eq!(
            &bytes[..],
            &[0x02, 0x17, 0x9C, 0xB9, 0x00, 0x05, 0x9C, 0x41, 0x00, 0x01, 0x02, 0x00, 0x00, 0x16, 0xEC]
        );
        assert_eq!(sched.phase(), Phase::AwaitingResponse(TransactionKind::BusScan));
    }

    #[test]
    fn test_scan_response_connects_and_identifies() {
        let mut sched = TransactionScheduler::new(TIMING);
        let mut events = Events::new();
        send(&mut sched, 0, &mut events);

        events.clear();
        sched.on_bytes(5, &scan_response(), &mut events);

        assert_eq!(sched.phase(), Phase::Idle);
        assert!(events.contains(&SchedulerEvent::Connected));
        assert!(events.contains(&SchedulerEvent::Identified([0x0430, 0x10FF, 0xA845])));
        assert!(events.contains(&SchedulerEvent::Completed(TransactionKind::BusScan)));
        assert_eq!(sched.state().identification(), Some([0x0430, 0x10FF, 0xA845]));
        assert_eq!(sched.next_kind(), TransactionKind::CommandPoll);
    }

    #[test]
    fn test_cadence() {
        let mut sched = connected();
        let mut events = Events::new();

        assert!(!sched.is_due(499));
        let mut taken = false;
        let result = sched.begin_if_due(
            499,
            || {
                taken = true;
                ActionRequest::NONE
            },
            &mut events,
        );
        assert_eq!(result, Ok(None));
        assert!(!taken);

        let bytes = send(&mut sched, 500, &mut events);
        assert_eq!(bytes[5], 0x08);
    }

    #[test]
    fn test_action_embedded_in_request() {
        let mut sched = connected();
        let mut events = Events::new();

        let bytes = sched
            .begin_if_due(500, || Action::Close.into(), &mut events)
            .unwrap()
            .unwrap();
        assert_eq!(&bytes[11..13], &[0x00, 0x20]);
        assert!(events.contains(&SchedulerEvent::Sent {
            kind: TransactionKind::CommandPoll,
            action: Action::Close.into(),
        }));
    }

    #[test]
    fn test_response_timeout() {
        let mut sched = connected();
        let mut events = Events::new();
        send(&mut sched, 500, &mut events);

        sched.check_timeouts(699, &mut events);
        assert!(sched.phase().is_awaiting_response());

        events.clear();
        sched.check_timeouts(700, &mut events);
        assert_eq!(sched.phase(), Phase::Idle);
        assert_eq!(events[0], SchedulerEvent::TimedOut(TransactionKind::CommandPoll));
        assert_eq!(sched.state().link().consecutive_timeouts(), 1);
        assert!(sched.state().is_connected());
    }

    #[test]
    fn test_disconnect_after_threshold() {
        let mut sched = connected();
        let mut events = Events::new();

        for i in 1..=3u32 {
            send(&mut sched, i * 500, &mut events);
            sched.check_timeouts(i * 500 + 200, &mut events);
        }
        assert!(!sched.state().is_connected());
        assert!(events.contains(&SchedulerEvent::Disconnected));

        // Keeps polling, with bus scans again
        assert_eq!(sched.next_kind(), TransactionKind::BusScan);
        send(&mut sched, 2000, &mut events);
        events.clear();
        sched.on_bytes(2005, &scan_response(), &mut events);
        assert!(sched.state().is_connected());
        assert!(events.contains(&SchedulerEvent::Connected));
    }

    #[test]
    fn test_checksum_mismatch_keeps_waiting() {
        let mut sched = connected();
        let mut events = Events::new();
        send(&mut sched, 500, &mut events);

        let mut corrupted = poll_response(0);
        corrupted[4] ^= 0x01;
        events.clear();
        sched.on_bytes(505, &corrupted, &mut events);

        assert!(events.contains(&SchedulerEvent::FrameDropped(BridgeError::ChecksumMismatch)));
        assert!(sched.phase().is_awaiting_response());

        sched.check_timeouts(700, &mut events);
        assert!(events.contains(&SchedulerEvent::TimedOut(TransactionKind::CommandPoll)));
    }

    #[test]
    fn test_malformed_response_counts_as_timeout() {
        let mut sched = connected();
        let mut events = Events::new();
        send(&mut sched, 500, &mut events);

        // Bus scan sized answer to a command poll
        events.clear();
        sched.on_bytes(505, &scan_response(), &mut events);
        assert_eq!(sched.phase(), Phase::Idle);
        assert!(events.contains(&SchedulerEvent::ResponseRejected(BridgeError::MalformedResponse)));
        assert_eq!(sched.state().link().consecutive_timeouts(), 1);
    }

    #[test]
    fn test_drive_request_reported() {
        let mut sched = connected();
        let mut events = Events::new();
        send(&mut sched, 500, &mut events);

        events.clear();
        sched.on_bytes(505, &poll_response(0x0010), &mut events);
        assert!(events.contains(&SchedulerEvent::DriveRequest(0x0010)));
    }

    #[test]
    fn test_exception_sets_error_state() {
        let mut sched = connected();
        let mut events = Events::new();
        send(&mut sched, 500, &mut events);

        let exception = encode(Frame::new(0x02, 0x97, &[0x04]).unwrap());
        sched.on_bytes(505, &exception, &mut events);
        assert!(events.contains(&SchedulerEvent::DriveFault(0x04)));
        assert_eq!(sched.snapshot().status.state, DriveState::Error);
        assert!(sched.state().is_connected());

        send(&mut sched, 1000, &mut events);
        sched.on_bytes(1005, &poll_response(0), &mut events);
        assert_ne!(sched.snapshot().status.state, DriveState::Error);
    }

    #[test]
    fn test_broadcast_any_phase() {
        let mut sched = connected();
        let mut events = Events::new();
        let status = DriveStatus::new(50, 200, StateCode::Opening, true);

        // While idle
        sched.on_bytes(100, &broadcast(status), &mut events);
        assert!(events.contains(&SchedulerEvent::StatusUpdated(status)));

        // While awaiting a response: phase, cadence and counter unaffected
        send(&mut sched, 500, &mut events);
        let moved = DriveStatus::new(60, 200, StateCode::Opening, true);
        sched.on_bytes(505, &broadcast(moved), &mut events);
        assert!(sched.phase().is_awaiting_response());
        assert_eq!(sched.snapshot().status, moved);
        assert_eq!(sched.state().link().consecutive_timeouts(), 0);
    }

    #[test]
    fn test_unchanged_broadcast_not_reported() {
        let mut sched = connected();
        let mut events = Events::new();
        let status = DriveStatus::new(0, 0, StateCode::Closed, false);

        sched.on_bytes(100, &broadcast(status), &mut events);
        events.clear();
        sched.on_bytes(200, &broadcast(status), &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_status_keeps_last_good() {
        let mut sched = connected();
        let mut events = Events::new();
        let status = DriveStatus::new(120, 200, StateCode::Opening, false);
        sched.on_bytes(100, &broadcast(status), &mut events);

        // Eight registers instead of nine
        let mut payload = [0u8; 5 + 16];
        payload[..5].copy_from_slice(&[0x9D, 0x31, 0x00, 0x08, 0x10]);
        let bad = encode(Frame::new(0x00, 0x10, &payload).unwrap());

        events.clear();
        sched.on_bytes(200, &bad, &mut events);
        assert_eq!(events[0], SchedulerEvent::StatusRejected(BridgeError::MalformedStatus));
        assert_eq!(sched.snapshot().status, status);
    }

    #[test]
    fn test_late_response_ignored() {
        let mut sched = connected();
        let mut events = Events::new();
        send(&mut sched, 500, &mut events);
        sched.check_timeouts(700, &mut events);

        events.clear();
        sched.on_bytes(750, &poll_response(0), &mut events);
        assert_eq!(&events[..], &[SchedulerEvent::LateResponse]);
        assert_eq!(sched.state().link().consecutive_timeouts(), 1);
    }

    #[test]
    fn test_partial_frame_flushed_after_gap() {
        let mut sched = connected();
        let mut events = Events::new();
        let bytes = broadcast(DriveStatus::new(10, 0, StateCode::Closing, false));

        sched.on_bytes(100, &bytes[..8], &mut events);
        assert!(events.is_empty());

        sched.check_timeouts(110, &mut events);
        assert_eq!(&events[..], &[SchedulerEvent::FrameDropped(BridgeError::Truncated)]);

        // The tail alone is not a frame
        events.clear();
        sched.on_bytes(111, &bytes[8..], &mut events);
        assert!(!events
            .iter()
            .any(|event| matches!(event, SchedulerEvent::StatusUpdated(_))));
    }

    #[test]
    fn test_transmit_failure_counts_as_timeout() {
        let mut sched = connected();
        let mut events = Events::new();
        sched
            .begin_if_due(500, || ActionRequest::NONE, &mut events)
            .unwrap();
        sched.transmit_failed(&mut events);

        assert_eq!(sched.phase(), Phase::Idle);
        assert_eq!(sched.state().link().consecutive_timeouts(), 1);
    }

    #[test]
    fn test_clock_wraparound() {
        let mut sched = TransactionScheduler::new(TIMING);
        let mut events = Events::new();
        let start = u32::MAX - 100;
        send(&mut sched, start, &mut events);

        sched.check_timeouts(start.wrapping_add(199), &mut events);
        assert!(sched.phase().is_awaiting_response());
        sched.check_timeouts(start.wrapping_add(200), &mut events);
        assert_eq!(sched.phase(), Phase::Idle);
        assert!(sched.is_due(start.wrapping_add(500)));
        assert!(!sched.is_due(start.wrapping_add(499)));
    }
}
