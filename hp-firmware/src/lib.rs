//! HCP bridge for the application core
//!
//! Static library linked into the host firmware. The host hands over a
//! table of C function pointers for the UART, direction pin, clock and
//! logger, then calls [`ffi::hcp_hp_poll`] from one of its tasks every
//! few milliseconds. Between polls it reads state and queues actions
//! through the other `hcp_*` calls, which never block.
//!
//! When the bridge runs on the low-power coprocessor instead, the host
//! calls [`ffi::hcp_lp_attach`] with the address of the coprocessor's
//! shared region and uses the same calls without ever polling.

#![cfg_attr(not(test), no_std)]

#[cfg(not(test))]
use panic_halt as _;

pub mod bridge;
pub mod ffi;
pub mod hal;

pub use bridge::HpBridge;
pub use ffi::HcpStatus;
pub use hal::HcpHalC;
