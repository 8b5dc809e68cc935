//! Board-agnostic core logic for the HCP drive bridge
//!
//! This crate contains all bridge logic that does not depend on a
//! specific chip:
//!
//! - Transaction scheduler (bus scan, command poll, action injection)
//! - Transaction phase machine and link health monitoring
//! - Cross-context shared region and the host facade
//! - Execution agents for the low-power and application cores
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This must go first so the macros are visible to the other modules
mod fmt;

pub mod agent;
pub mod config;
pub mod error;
pub mod facade;
pub mod link;
pub mod scheduler;
pub mod shared;
pub mod state;

pub use agent::{Capabilities, HalCapabilities, HighPerformanceAgent, LowPowerAgent, WakePolicy};
pub use config::{BridgeConfig, ChipVariant, ConfigError, CoreMode, PinConfig, TimingConfig};
pub use error::BridgeError;
pub use facade::BridgeFacade;
pub use scheduler::{Events, SchedulerEvent, TransactionScheduler};
pub use shared::SharedRegion;
pub use state::{BridgeSnapshot, BridgeState, Phase};
