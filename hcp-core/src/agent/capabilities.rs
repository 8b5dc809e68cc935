//! What an execution context must provide to run the scheduler

use hcp_hal::{Clock, OutputPin, UartConfig, UartRx, UartTx, WakeSignal};

use crate::error::BridgeError;

/// Capability set an agent runs on
pub trait Capabilities {
    /// Write a whole request to the bus
    ///
    /// Returns once the last byte is on the wire and the bus has been
    /// released for the response.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), BridgeError>;

    /// Read whatever bytes have arrived, without waiting
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, BridgeError>;

    /// Free-running millisecond timestamp
    fn now_ms(&self) -> u32;

    /// Give up the CPU for `ms` milliseconds
    fn pause_ms(&mut self, ms: u32);

    /// Ask the application core to wake up
    fn wake_host(&mut self) {}
}

/// Capabilities assembled from HAL trait implementations
///
/// Drives the RS-485 direction pin around every transmission. DE goes
/// high for the request and stays high until the last character has left
/// the wire, then for the turnaround time, then drops to listen.
///
/// A UART that returns once the bytes sit in its FIFO is fine: the hold
/// covers the remaining wire time at the configured character time.
#[derive(Debug)]
pub struct HalCapabilities<U, P, K, W> {
    uart: U,
    de: P,
    clock: K,
    wake: W,
    turnaround_ms: u32,
    char_time_us: u32,
}

impl<U, P, K, W> HalCapabilities<U, P, K, W>
where
    U: UartTx + UartRx,
    P: OutputPin,
    K: Clock,
    W: WakeSignal,
{
    pub fn new(uart: U, mut de: P, clock: K, wake: W, turnaround_ms: u32) -> Self {
        // Start out listening
        de.set_low();
        Self {
            uart,
            de,
            clock,
            wake,
            turnaround_ms,
            char_time_us: UartConfig::hcp().char_time_us(),
        }
    }

    /// Use the character time of a non-default line configuration
    pub fn with_uart_config(mut self, config: &UartConfig) -> Self {
        self.char_time_us = config.char_time_us();
        self
    }

    /// Milliseconds `len` characters occupy on the wire, rounded up
    fn wire_time_ms(&self, len: usize) -> u32 {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        len.saturating_mul(self.char_time_us).div_ceil(1000)
    }

    pub fn uart(&self) -> &U {
        &self.uart
    }

    pub fn de_pin(&self) -> &P {
        &self.de
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }
}

impl<U, P, K, W> Capabilities for HalCapabilities<U, P, K, W>
where
    U: UartTx + UartRx,
    P: OutputPin,
    K: Clock,
    W: WakeSignal,
{
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), BridgeError> {
        self.de.set_high();
        let started = self.clock.now_ms();
        let result = self
            .uart
            .write_blocking(bytes)
            .and_then(|()| self.uart.flush());
        let hold = match result {
            Ok(()) => {
                let elapsed = self.clock.now_ms().wrapping_sub(started);
                self.wire_time_ms(bytes.len()).saturating_sub(elapsed)
            }
            Err(_) => 0,
        };
        self.clock.delay_ms(hold.saturating_add(self.turnaround_ms));
        self.de.set_low();
        result.map_err(|_| BridgeError::Transport)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, BridgeError> {
        self.uart
            .read_available(buf)
            .map_err(|_| BridgeError::Transport)
    }

    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    fn pause_ms(&mut self, ms: u32) {
        self.clock.delay_ms(ms);
    }

    fn wake_host(&mut self) {
        self.wake.wake();
    }
}
