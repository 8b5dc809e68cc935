//! Low-power agent
//!
//! Runs on the coprocessor while the application core sleeps. The
//! shared region usually sits in memory nobody initialised, so it is
//! reset on start unless it already carries the layout marker.

use crate::config::{CoreMode, TimingConfig};
use crate::scheduler::Events;
use crate::shared::SharedRegion;

use super::{AgentCore, Capabilities, WakePolicy};

/// Pause between loop iterations
pub const LOOP_PAUSE_MS: u32 = 1;

pub struct LowPowerAgent<'r, C> {
    core: AgentCore<'r, C>,
}

impl<'r, C: Capabilities> LowPowerAgent<'r, C> {
    pub fn new(caps: C, timing: TimingConfig, region: &'r SharedRegion) -> Self {
        if !region.is_initialised() {
            region.reset();
        }
        info!("low-power agent starting, poll every {=u32} ms", timing.poll_interval_ms);
        Self {
            core: AgentCore::new(caps, timing, region, WakePolicy::OnTransition),
        }
    }

    /// Agent with the low-power timing defaults
    pub fn with_defaults(caps: C, region: &'r SharedRegion) -> Self {
        Self::new(caps, TimingConfig::for_mode(CoreMode::LowPower), region)
    }

    /// Run one loop iteration
    pub fn step(&mut self) -> Events {
        self.core.step()
    }

    /// Run forever
    pub fn run(mut self) -> ! {
        loop {
            self.core.step();
            self.core.pause_ms(LOOP_PAUSE_MS);
        }
    }

    pub fn core(&self) -> &AgentCore<'r, C> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut AgentCore<'r, C> {
        &mut self.core
    }
}
