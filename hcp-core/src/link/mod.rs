//! Link health
//!
//! Tracks whether the drive is answering polls.

pub mod monitor;

pub use monitor::{LinkChange, LinkMonitor};
