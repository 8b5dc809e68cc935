//! High-performance agent
//!
//! Runs on the application core next to the host. The host calls
//! [`HighPerformanceAgent::poll`] from its own loop and reads state
//! through the facade in between; nobody needs waking.

use crate::config::{CoreMode, TimingConfig};
use crate::facade::BridgeFacade;
use crate::scheduler::Events;
use crate::shared::SharedRegion;

use super::{AgentCore, Capabilities, WakePolicy};

pub struct HighPerformanceAgent<'r, C> {
    core: AgentCore<'r, C>,
}

impl<'r, C: Capabilities> HighPerformanceAgent<'r, C> {
    pub fn new(caps: C, timing: TimingConfig, region: &'r SharedRegion) -> Self {
        info!("high-performance agent starting, poll every {=u32} ms", timing.poll_interval_ms);
        Self {
            core: AgentCore::new(caps, timing, region, WakePolicy::Never),
        }
    }

    /// Agent with the high-performance timing defaults
    pub fn with_defaults(caps: C, region: &'r SharedRegion) -> Self {
        Self::new(caps, TimingConfig::for_mode(CoreMode::HighPerformance), region)
    }

    /// Service the bus once; call this often (every few ms)
    pub fn poll(&mut self) -> Events {
        self.core.step()
    }

    pub fn facade(&self) -> BridgeFacade<'r> {
        self.core.facade()
    }

    pub fn core(&self) -> &AgentCore<'r, C> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut AgentCore<'r, C> {
        &mut self.core
    }
}
