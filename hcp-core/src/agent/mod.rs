//! Execution agents
//!
//! One scheduler core, two deployments. The low-power agent runs on the
//! coprocessor and wakes the application core only when something the
//! host cares about changes. The high-performance agent runs on the
//! application core, polled by the host's own task.
//!
//! Both own the UART through a [`Capabilities`] implementation and share
//! state with the host only through a [`SharedRegion`].

pub mod capabilities;
pub mod high_performance;
pub mod low_power;

pub use capabilities::{Capabilities, HalCapabilities};
pub use high_performance::HighPerformanceAgent;
pub use low_power::LowPowerAgent;

use crate::config::TimingConfig;
use crate::facade::BridgeFacade;
use crate::scheduler::{Events, SchedulerEvent, TransactionScheduler};
use crate::shared::SharedRegion;
use crate::state::BridgeSnapshot;

/// Bytes read from the UART per read call
pub const RX_CHUNK_SIZE: usize = 64;

/// Read calls per step; enough for the largest frame
const MAX_READS_PER_STEP: usize = 5;

/// When the agent wakes the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakePolicy {
    /// Host shares the agent's context
    Never,
    /// Coarse door state change, connectivity flip, or drive request
    OnTransition,
}

impl WakePolicy {
    pub fn should_wake(
        self,
        before: &BridgeSnapshot,
        after: &BridgeSnapshot,
        events: &[SchedulerEvent],
    ) -> bool {
        match self {
            WakePolicy::Never => false,
            WakePolicy::OnTransition => {
                before.status.state != after.status.state
                    || before.connected != after.connected
                    || events
                        .iter()
                        .any(|event| matches!(event, SchedulerEvent::DriveRequest(_)))
            }
        }
    }
}

/// Scheduler driven over a capability set
#[derive(Debug)]
pub struct AgentCore<'r, C> {
    caps: C,
    scheduler: TransactionScheduler,
    region: &'r SharedRegion,
    /// Last snapshot written to the region
    published: BridgeSnapshot,
    wake: WakePolicy,
}

impl<'r, C: Capabilities> AgentCore<'r, C> {
    pub fn new(caps: C, timing: TimingConfig, region: &'r SharedRegion, wake: WakePolicy) -> Self {
        let scheduler = TransactionScheduler::new(timing);
        let published = scheduler.snapshot();
        region.publish(published);
        Self {
            caps,
            scheduler,
            region,
            published,
            wake,
        }
    }

    /// Run one iteration of the agent loop
    ///
    /// Never blocks beyond a single request transmission.
    pub fn step(&mut self) -> Events {
        let mut events = Events::new();

        self.receive(&mut events);

        let now = self.caps.now_ms();
        self.scheduler.check_timeouts(now, &mut events);

        let region = self.region;
        match self
            .scheduler
            .begin_if_due(now, || region.take_action(), &mut events)
        {
            Ok(Some(request)) => match self.caps.transmit(&request) {
                Ok(()) => self.scheduler.transmitted(self.caps.now_ms()),
                Err(err) => {
                    warn!("uart write failed: {}", err);
                    self.scheduler.transmit_failed(&mut events);
                }
            },
            Ok(None) => {}
            Err(err) => warn!("request not built: {}", err),
        }

        self.publish(&events);
        events
    }

    fn receive(&mut self, events: &mut Events) {
        let mut buf = [0u8; RX_CHUNK_SIZE];
        for _ in 0..MAX_READS_PER_STEP {
            match self.caps.receive(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let now = self.caps.now_ms();
                    self.scheduler.on_bytes(now, &buf[..n], events);
                    if n < buf.len() {
                        break;
                    }
                }
                Err(err) => {
                    warn!("uart read failed: {}", err);
                    break;
                }
            }
        }
    }

    fn publish(&mut self, events: &Events) {
        for event in events {
            if let SchedulerEvent::DriveRequest(code) = event {
                self.region.publish_drive_request(*code);
            }
        }

        let snapshot = self.scheduler.snapshot();
        let wake = self.wake.should_wake(&self.published, &snapshot, events);
        if snapshot != self.published {
            self.region.publish(snapshot);
            self.published = snapshot;
        }
        if wake {
            trace!("waking host");
            self.caps.wake_host();
        }
    }

    pub fn pause_ms(&mut self, ms: u32) {
        self.caps.pause_ms(ms);
    }

    pub fn scheduler(&self) -> &TransactionScheduler {
        &self.scheduler
    }

    pub fn capabilities(&self) -> &C {
        &self.caps
    }

    pub fn capabilities_mut(&mut self) -> &mut C {
        &mut self.caps
    }

    pub fn region(&self) -> &'r SharedRegion {
        self.region
    }

    pub fn facade(&self) -> BridgeFacade<'r> {
        BridgeFacade::new(self.region)
    }
}
