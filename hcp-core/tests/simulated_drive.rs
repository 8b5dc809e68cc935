//! End-to-end runs of the agents against the simulated drive

use hcp_core::{
    CoreMode, HalCapabilities, HighPerformanceAgent, LowPowerAgent, SchedulerEvent, SharedRegion,
    TimingConfig,
};
use hcp_drive_sim::{SimBus, SimClock, SimPin, SimUart, SimWake, SimulatedDrive};
use hcp_protocol::{Action, ActionRequest, DriveState, StateCode, TransactionKind};

type SimCaps = HalCapabilities<SimUart, SimPin, SimClock, SimWake>;

fn caps(bus: &SimBus) -> SimCaps {
    HalCapabilities::new(bus.uart(), bus.de_pin(), bus.clock(), bus.wake(), 2)
}

fn leak_region() -> &'static SharedRegion {
    Box::leak(Box::new(SharedRegion::new()))
}

struct Bench {
    bus: SimBus,
    drive: SimulatedDrive,
    agent: HighPerformanceAgent<'static, SimCaps>,
}

impl Bench {
    fn new() -> Self {
        Self::on_bus(SimBus::new())
    }

    fn on_bus(bus: SimBus) -> Self {
        let drive = SimulatedDrive::new(bus.clone());
        let agent = HighPerformanceAgent::with_defaults(caps(&bus), leak_region());
        Self { bus, drive, agent }
    }

    /// Advance the bench in 1 ms steps, collecting scheduler events
    fn run_for(&mut self, ms: u32) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        let end = self.bus.now_ms().wrapping_add(ms);
        while (end.wrapping_sub(self.bus.now_ms()) as i32) > 0 {
            events.extend(self.agent.poll());
            self.drive.service();
            self.bus.advance(1);
        }
        events
    }

    fn connected(mut self) -> Self {
        self.run_for(100);
        assert!(self.agent.facade().is_connected());
        self
    }
}

#[test]
fn test_first_transaction_is_bus_scan() {
    let mut bench = Bench::new();
    bench.run_for(10);

    let requests = bench.drive.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, TransactionKind::BusScan);
    assert_eq!(requests[0].action, ActionRequest::NONE);
}

#[test]
fn test_connects_and_reports_status() {
    let mut bench = Bench::new();
    let events = bench.run_for(100);

    assert!(events.contains(&SchedulerEvent::Connected));
    assert!(events.contains(&SchedulerEvent::Identified([0x0430, 0x10FF, 0xA845])));

    let snapshot = bench.agent.facade().snapshot();
    assert!(snapshot.connected);
    assert!(snapshot.valid);
    assert_eq!(snapshot.status.state, DriveState::Idle);
    assert_eq!(snapshot.status.code, StateCode::Closed);

    // Steady state uses command polls
    bench.run_for(1000);
    assert!(bench.drive.requests()[1..]
        .iter()
        .all(|request| request.kind == TransactionKind::CommandPoll));
}

#[test]
fn test_open_door_end_to_end() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    facade.enqueue_action(Action::Open);
    assert_eq!(facade.pending(), ActionRequest::from(Action::Open));

    bench.run_for(700);
    assert_eq!(bench.drive.actions_received(), vec![0x0010]);
    assert_eq!(facade.pending(), ActionRequest::NONE);
    assert_eq!(facade.current_status().state, DriveState::Opening);

    bench.run_for(2500);
    let status = facade.current_status();
    assert_eq!(status.state, DriveState::Idle);
    assert_eq!(status.code, StateCode::Open);
    assert_eq!(status.position, 200);
    assert_eq!(status.percent_open(), 100);

    // Sent exactly once
    assert_eq!(bench.drive.actions_received(), vec![0x0010]);
}

#[test]
fn test_enqueue_is_idempotent() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    facade.enqueue_action(Action::ToggleLight);
    facade.enqueue_action(Action::ToggleLight);
    bench.run_for(700);

    assert_eq!(bench.drive.actions_received(), vec![0x0200]);
    assert!(facade.current_status().light_on);
}

#[test]
fn test_last_enqueue_wins() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    facade.enqueue_action(Action::Open);
    facade.enqueue_action(Action::HalfOpen);
    bench.run_for(700);

    assert_eq!(bench.drive.actions_received(), vec![0x0400]);
    assert_eq!(bench.drive.door().target, 100);
}

#[test]
fn test_drive_request_reaches_host() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();
    bench.drive.request_action(0x0010);

    let events = bench.run_for(700);
    assert!(events.contains(&SchedulerEvent::DriveRequest(0x0010)));
    assert_eq!(facade.take_drive_request(), Some(0x0010));
    assert_eq!(facade.take_drive_request(), None);

    // Not folded into the host's own action slot
    assert_eq!(facade.pending(), ActionRequest::NONE);
    assert!(bench.drive.actions_received().is_empty());
}

#[test]
fn test_disconnect_and_recovery() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();
    bench.drive.press(Action::ToggleLight);
    bench.run_for(500);
    let last_good = facade.current_status();
    assert!(last_good.light_on);

    bench.drive.set_silent(true);
    let events = bench.run_for(2200);
    assert!(!facade.is_connected());
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, SchedulerEvent::Disconnected))
            .count(),
        1
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, SchedulerEvent::StatusUpdated(_))));

    // Status is held, not cleared
    assert_eq!(facade.current_status(), last_good);
    assert!(facade.snapshot().valid);

    // Back to bus scans while the drive is missing
    bench.run_for(1000);
    let last = bench.drive.requests().last().copied();
    assert_eq!(last.map(|request| request.kind), Some(TransactionKind::BusScan));

    bench.drive.set_silent(false);
    let events = bench.run_for(700);
    assert!(events.contains(&SchedulerEvent::Connected));
    assert!(facade.is_connected());
}

#[test]
fn test_transmit_failures_disconnect() {
    let mut bench = Bench::new().connected();
    bench.bus.set_fail_writes(true);

    let events = bench.run_for(1700);
    assert!(events.contains(&SchedulerEvent::Disconnected));
    assert!(!bench.agent.facade().is_connected());

    bench.bus.set_fail_writes(false);
    bench.run_for(700);
    assert!(bench.agent.facade().is_connected());
}

#[test]
fn test_unanswered_action_is_not_resent() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    bench.drive.set_silent(true);
    facade.enqueue_action(Action::Open);
    bench.run_for(700);

    // Taken off the slot by the transmission, not by the response
    assert_eq!(bench.drive.actions_received(), vec![0x0010]);
    assert_eq!(facade.pending(), ActionRequest::NONE);

    bench.run_for(500);
    assert_eq!(bench.drive.actions_received(), vec![0x0010]);
    assert_eq!(facade.pending(), ActionRequest::NONE);
}

#[test]
fn test_action_lost_on_failed_transmit() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    bench.bus.set_fail_writes(true);
    facade.enqueue_action(Action::Open);
    bench.run_for(700);
    assert_eq!(facade.pending(), ActionRequest::NONE);

    bench.bus.set_fail_writes(false);
    bench.run_for(1000);
    assert!(facade.is_connected());
    assert!(bench.drive.actions_received().is_empty());
    assert_eq!(facade.pending(), ActionRequest::NONE);
}

#[test]
fn test_drive_exception_reports_error() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    bench.drive.set_exception(Some(0x04));
    let events = bench.run_for(700);
    assert!(events.contains(&SchedulerEvent::DriveFault(0x04)));
    assert_eq!(facade.current_status().state, DriveState::Error);
    assert!(facade.is_connected());

    bench.drive.set_exception(None);
    bench.run_for(700);
    assert_eq!(facade.current_status().state, DriveState::Idle);
}

#[test]
fn test_resyncs_after_line_noise() {
    let mut bench = Bench::new().connected();
    let facade = bench.agent.facade();

    bench.drive.inject_garbage(&[0xFF, 0x02, 0x17, 0x99, 0x00]);
    bench.drive.press(Action::ToggleLight);
    bench.run_for(700);

    assert!(facade.current_status().light_on);
    assert!(facade.is_connected());
}

#[test]
fn test_direction_pin_brackets_every_write() {
    let mut bench = Bench::new();
    bench.run_for(2000);

    assert!(bench.drive.requests().len() >= 4);
    assert_eq!(bench.bus.writes_while_listening(), 0);
    assert!(!bench.bus.is_de_high());
    assert_eq!(bench.drive.rejected_requests(), 0);
}

#[test]
fn test_survives_clock_wraparound() {
    let mut bench = Bench::on_bus(SimBus::starting_at(u32::MAX - 300));
    bench.run_for(2100);

    assert!(bench.agent.facade().is_connected());
    assert!(bench.drive.requests().len() >= 5);
}

#[test]
fn test_high_performance_never_wakes() {
    let mut bench = Bench::new().connected();
    bench.drive.press(Action::Open);
    bench.run_for(1000);
    assert_eq!(bench.bus.wake_count(), 0);
}

#[test]
fn test_low_power_wakes_on_transitions_only() {
    let bus = SimBus::new();
    let mut drive = SimulatedDrive::new(bus.clone());
    let region = leak_region();
    let timing = TimingConfig::for_mode(CoreMode::LowPower);
    let mut agent = LowPowerAgent::new(caps(&bus), timing, region);

    fn run(
        bus: &SimBus,
        agent: &mut LowPowerAgent<'static, SimCaps>,
        drive: &mut SimulatedDrive,
        ms: u32,
    ) {
        for _ in 0..ms {
            agent.step();
            drive.service();
            bus.advance(1);
        }
    }

    run(&bus, &mut agent, &mut drive, 100);
    assert!(region.snapshot().connected);
    let after_connect = bus.wake_count();
    assert!(after_connect >= 1);

    // Door starts moving: one wake for Idle -> Opening
    drive.press(Action::Open);
    run(&bus, &mut agent, &mut drive, 300);
    assert_eq!(bus.wake_count(), after_connect + 1);
    assert_eq!(region.snapshot().status.state, DriveState::Opening);

    // Position updates while moving do not wake the host
    let position = region.snapshot().status.position;
    run(&bus, &mut agent, &mut drive, 500);
    assert!(region.snapshot().status.position > position);
    assert_eq!(bus.wake_count(), after_connect + 1);
}
