//! Cross-context wake signal
//!
//! A coprocessor uses this to rouse the sleeping application core when
//! something the host cares about has changed.

/// Wakes the application core
pub trait WakeSignal {
    /// Raise the wake request
    fn wake(&mut self);
}

/// Wake signal for agents that share a context with the host
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWake;

impl WakeSignal for NoWake {
    fn wake(&mut self) {}
}
