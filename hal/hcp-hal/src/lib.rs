//! HCP Bridge Hardware Abstraction Layer
//!
//! This crate defines the hardware capabilities the bridge needs from a
//! chip: a UART, a direction pin for the RS-485 transceiver, a millisecond
//! clock and (optionally) a way to wake the application core. The same
//! protocol engine then runs on either execution context.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  hcp-core (scheduler, agents, facade)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  hcp-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  LP core      │       │  HP core      │
//! │  (esp-lp-hal) │       │  (C ABI HAL)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - RS-485 driver enable (DE) pin
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`clock::Clock`] - Millisecond time source and delay
//! - [`wake::WakeSignal`] - Wake the application core from the coprocessor

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod gpio;
pub mod uart;
pub mod wake;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use gpio::OutputPin;
pub use uart::{Uart, UartConfig, UartRx, UartTx};
pub use wake::{NoWake, WakeSignal};
