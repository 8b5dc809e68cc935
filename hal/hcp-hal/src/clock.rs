//! Time source abstraction

/// Millisecond clock
///
/// Timestamps are free-running and wrap at `u32::MAX`; callers compare
/// them with `wrapping_sub`.
pub trait Clock {
    /// Current timestamp in milliseconds
    fn now_ms(&self) -> u32;

    /// Busy-wait or sleep for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}
