//! Transaction state machine and bridge state
//!
//! The transaction phase is explicit, finite, and deterministic.

pub mod bridge;
pub mod events;
pub mod machine;

pub use bridge::{BridgeSnapshot, BridgeState};
pub use events::Event;
pub use machine::Phase;
