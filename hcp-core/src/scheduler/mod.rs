//! Transaction scheduler
//!
//! Decides when to poll the drive, builds the request, and turns the
//! bytes coming back into state updates and events.

pub mod transaction;

pub use transaction::{Events, SchedulerEvent, TransactionScheduler, MAX_EVENTS};
