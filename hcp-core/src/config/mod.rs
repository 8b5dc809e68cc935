//! Configuration types
//!
//! Supplied once at startup by the integration layer and never changed
//! while an agent runs.

pub mod hardware;
pub mod types;

pub use hardware::*;
pub use types::*;
