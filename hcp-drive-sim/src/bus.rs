//! In-memory RS-485 bus with a manual clock
//!
//! All handles share one [`SimBus`] state, so a test can hold the bus
//! while the bridge owns the UART, pin, clock and wake handles.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use hcp_hal::{Clock, OutputPin, UartRx, UartTx, WakeSignal};

#[derive(Debug, Default)]
struct BusInner {
    now_ms: u32,
    to_drive: VecDeque<u8>,
    to_bridge: VecDeque<u8>,
    de_high: bool,
    /// Bytes written while the direction pin was low
    writes_while_listening: usize,
    fail_writes: bool,
    wakes: u32,
}

/// Shared bus state
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    inner: Rc<RefCell<BusInner>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock somewhere other than zero
    pub fn starting_at(now_ms: u32) -> Self {
        let bus = Self::new();
        bus.inner.borrow_mut().now_ms = now_ms;
        bus
    }

    pub fn uart(&self) -> SimUart {
        SimUart { bus: self.clone() }
    }

    pub fn de_pin(&self) -> SimPin {
        SimPin { bus: self.clone() }
    }

    pub fn clock(&self) -> SimClock {
        SimClock { bus: self.clone() }
    }

    pub fn wake(&self) -> SimWake {
        SimWake { bus: self.clone() }
    }

    pub fn now_ms(&self) -> u32 {
        self.inner.borrow().now_ms
    }

    pub fn advance(&self, ms: u32) {
        let mut inner = self.inner.borrow_mut();
        inner.now_ms = inner.now_ms.wrapping_add(ms);
    }

    /// Drain everything the bridge has written
    pub fn take_from_bridge(&self) -> Vec<u8> {
        self.inner.borrow_mut().to_drive.drain(..).collect()
    }

    /// Queue bytes for the bridge to read
    pub fn push_to_bridge(&self, bytes: &[u8]) {
        self.inner.borrow_mut().to_bridge.extend(bytes);
    }

    pub fn pending_to_bridge(&self) -> usize {
        self.inner.borrow().to_bridge.len()
    }

    pub fn is_de_high(&self) -> bool {
        self.inner.borrow().de_high
    }

    pub fn writes_while_listening(&self) -> usize {
        self.inner.borrow().writes_while_listening
    }

    /// Make every bridge write fail until cleared
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    pub fn wake_count(&self) -> u32 {
        self.inner.borrow().wakes
    }
}

/// Error returned by [`SimUart`] writes while failures are injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFailed;

/// Bridge end of the bus
#[derive(Debug, Clone)]
pub struct SimUart {
    bus: SimBus,
}

impl UartTx for SimUart {
    type Error = WriteFailed;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), WriteFailed> {
        let mut inner = self.bus.inner.borrow_mut();
        if inner.fail_writes {
            return Err(WriteFailed);
        }
        if !inner.de_high {
            inner.writes_while_listening += data.len();
        }
        inner.to_drive.extend(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriteFailed> {
        Ok(())
    }
}

impl UartRx for SimUart {
    type Error = core::convert::Infallible;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut inner = self.bus.inner.borrow_mut();
        let count = buf.len().min(inner.to_bridge.len());
        for (slot, byte) in buf.iter_mut().zip(inner.to_bridge.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

/// RS-485 driver-enable line
#[derive(Debug, Clone)]
pub struct SimPin {
    bus: SimBus,
}

impl OutputPin for SimPin {
    fn set_high(&mut self) {
        self.bus.inner.borrow_mut().de_high = true;
    }

    fn set_low(&mut self) {
        self.bus.inner.borrow_mut().de_high = false;
    }

    fn is_set_high(&self) -> bool {
        self.bus.is_de_high()
    }
}

/// Clock that only moves when told to; delays advance it
#[derive(Debug, Clone)]
pub struct SimClock {
    bus: SimBus,
}

impl Clock for SimClock {
    fn now_ms(&self) -> u32 {
        self.bus.now_ms()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.bus.advance(ms);
    }
}

/// Counts host wake-ups
#[derive(Debug, Clone)]
pub struct SimWake {
    bus: SimBus,
}

impl WakeSignal for SimWake {
    fn wake(&mut self) {
        self.bus.inner.borrow_mut().wakes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_cross_the_bus() {
        let bus = SimBus::new();
        let mut uart = bus.uart();
        let mut de = bus.de_pin();

        de.set_high();
        uart.write_blocking(&[1, 2, 3]).unwrap();
        de.set_low();
        assert_eq!(bus.take_from_bridge(), vec![1, 2, 3]);
        assert_eq!(bus.writes_while_listening(), 0);

        bus.push_to_bridge(&[4, 5, 6]);
        let mut buf = [0u8; 2];
        assert_eq!(uart.read_available(&mut buf).unwrap(), 2);
        assert_eq!(buf, [4, 5]);
        assert_eq!(uart.read_available(&mut buf).unwrap(), 1);
        assert_eq!(uart.read_available(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_without_de_is_counted() {
        let bus = SimBus::new();
        bus.uart().write_blocking(&[0xAA; 4]).unwrap();
        assert_eq!(bus.writes_while_listening(), 4);
    }

    #[test]
    fn test_injected_write_failure() {
        let bus = SimBus::new();
        bus.set_fail_writes(true);
        assert_eq!(bus.uart().write_blocking(&[1]), Err(WriteFailed));
        assert!(bus.take_from_bridge().is_empty());
    }

    #[test]
    fn test_clock_and_wake() {
        let bus = SimBus::starting_at(u32::MAX - 1);
        let mut clock = bus.clock();
        clock.delay_ms(3);
        assert_eq!(clock.now_ms(), 1);

        bus.wake().wake();
        bus.wake().wake();
        assert_eq!(bus.wake_count(), 2);
    }
}
