//! High-performance agent wired to the host function table

use core::fmt::Write;

use heapless::String;

use hcp_core::{
    BridgeFacade, HalCapabilities, HighPerformanceAgent, SchedulerEvent, SharedRegion,
    TimingConfig,
};
use hcp_hal::NoWake;

use crate::hal::{HcpHalC, HostClock, HostDirectionPin, HostUart};

/// Longest log line handed to the host
pub const LOG_LINE_LEN: usize = 96;

/// Capabilities built from the host table
pub type HostCapabilities = HalCapabilities<HostUart, HostDirectionPin, HostClock, NoWake>;

/// Agent plus the host logger
pub struct HpBridge<'r> {
    agent: HighPerformanceAgent<'r, HostCapabilities>,
    table: HcpHalC,
}

impl<'r> HpBridge<'r> {
    pub fn new(table: HcpHalC, timing: TimingConfig, region: &'r SharedRegion) -> Self {
        let caps = HalCapabilities::new(
            HostUart::new(table),
            HostDirectionPin::new(table),
            HostClock::new(table),
            NoWake,
            timing.turnaround_ms,
        );
        let bridge = Self {
            agent: HighPerformanceAgent::new(caps, timing, region),
            table,
        };
        bridge.log(format_args!(
            "hcp: bridge started, poll every {} ms",
            timing.poll_interval_ms
        ));
        bridge
    }

    /// Service the bus once and log what happened
    pub fn poll(&mut self) {
        for event in self.agent.poll() {
            self.log_event(&event);
        }
    }

    pub fn facade(&self) -> BridgeFacade<'r> {
        self.agent.facade()
    }

    fn log_event(&self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::Connected => self.log(format_args!("hcp: drive connected")),
            SchedulerEvent::Disconnected => self.log(format_args!("hcp: drive disconnected")),
            SchedulerEvent::Identified([a, b, c]) => self.log(format_args!(
                "hcp: drive id {:04x} {:04x} {:04x}",
                a, b, c
            )),
            SchedulerEvent::DriveRequest(code) => {
                self.log(format_args!("hcp: drive requests action {:#06x}", code))
            }
            SchedulerEvent::DriveFault(code) => {
                self.log(format_args!("hcp: drive exception {:#04x}", code))
            }
            SchedulerEvent::Sent { action, .. } if action.is_pending() => {
                self.log(format_args!("hcp: sent action {:#06x}", action.code()))
            }
            SchedulerEvent::StatusRejected(err)
            | SchedulerEvent::ResponseRejected(err)
            | SchedulerEvent::FrameDropped(err) => {
                self.log(format_args!("hcp: frame discarded: {:?}", err))
            }
            // Routine traffic
            _ => {}
        }
    }

    fn log(&self, args: core::fmt::Arguments<'_>) {
        let Some(log) = self.table.log else {
            return;
        };
        let mut line = String::<LOG_LINE_LEN>::new();
        // Overlong lines are cut, not dropped
        let _ = line.write_fmt(args);
        log(self.table.ctx, line.as_ptr(), line.len());
    }
}
