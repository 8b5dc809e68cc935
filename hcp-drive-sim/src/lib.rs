//! Simulated HCP drive
//!
//! Host-side stand-in for a garage door drive: door physics, a
//! responder that answers bus scans and command polls, and periodic
//! status broadcasts. The bridge side connects through [`SimBus`],
//! whose handles implement the `hcp-hal` traits over in-memory byte
//! queues and a manual clock.
//!
//! ```text
//! bridge ──SimUart──► to_drive  ──► SimulatedDrive
//! bridge ◄──SimUart── to_bridge ◄── SimulatedDrive
//! ```

pub mod bus;
pub mod drive;
pub mod physics;

pub use bus::{SimBus, SimClock, SimPin, SimUart, SimWake};
pub use drive::SimulatedDrive;
pub use physics::DoorPhysics;
