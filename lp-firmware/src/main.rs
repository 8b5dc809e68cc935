//! HCP bridge on the ESP32-C6 low-power core
//!
//! Owns the drive UART and the RS-485 direction pin while the
//! application core sleeps. State goes to the host through the shared
//! region at [`SHARED_REGION_ADDR`]; the host is woken only when
//! something it cares about changes.

#![no_std]
#![no_main]

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin as _;
use esp_lp_hal::delay::Delay;
use esp_lp_hal::gpio::Output;
use esp_lp_hal::prelude::*;
use esp_lp_hal::uart::LpUart;
use panic_halt as _;

use hcp_core::{BridgeConfig, ChipVariant, CoreMode, HalCapabilities, LowPowerAgent, SharedRegion};
use hcp_hal::{Clock, OutputPin, UartRx, UartTx, WakeSignal};

/// Shared region address in LP SRAM; the host attaches to the same one
pub const SHARED_REGION_ADDR: usize = 0x5000_3000;

/// RS-485 driver-enable GPIO
const FLOW_CONTROL_PIN: u8 = 2;

/// LP UART with the `hcp-hal` traits
struct LpUartPort {
    uart: LpUart,
}

/// The LP UART reported an error
#[derive(Debug, Clone, Copy)]
struct LpUartError;

impl UartTx for LpUartPort {
    type Error = LpUartError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), LpUartError> {
        let mut rest = data;
        while !rest.is_empty() {
            let written = self.uart.write_bytes(rest).map_err(|_| LpUartError)?;
            rest = &rest[written.min(rest.len())..];
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LpUartError> {
        // Spin until the shift register is empty
        while self.uart.flush_tx().is_err() {}
        Ok(())
    }
}

impl UartRx for LpUartPort {
    type Error = LpUartError;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LpUartError> {
        let mut count = 0;
        while count < buf.len() {
            match self.uart.read_byte() {
                Ok(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        Ok(count)
    }
}

/// Direction pin on an LP GPIO
struct DirectionPin<const PIN: u8> {
    pin: Output<PIN>,
    high: bool,
}

impl<const PIN: u8> OutputPin for DirectionPin<PIN> {
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
        self.high = true;
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Millisecond clock advanced by the agent's own delays
///
/// The LP core has no free-running timer we can read cheaply; every
/// wait the agent makes goes through `delay_ms`, so summing them tracks
/// time closely enough for poll cadence and timeouts.
struct LoopClock {
    now_ms: u32,
}

impl Clock for LoopClock {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }

    fn delay_ms(&mut self, ms: u32) {
        Delay.delay_ms(ms);
        self.now_ms = self.now_ms.wrapping_add(ms);
    }
}

/// Wakes the application core
struct HpWake;

impl WakeSignal for HpWake {
    fn wake(&mut self) {
        esp_lp_hal::wake_hp_core();
    }
}

#[entry]
fn main() -> ! {
    let config = BridgeConfig::for_chip(Some(CoreMode::LowPower), ChipVariant::Esp32C6)
        .unwrap_or_default();

    // SAFETY: this binary is the only user of the LP UART and GPIO
    let uart = unsafe { esp_lp_hal::uart::conjure() };
    let Some(pin) = (unsafe { esp_lp_hal::gpio::conjure_output::<FLOW_CONTROL_PIN>() }) else {
        panic!("direction pin unavailable");
    };

    // SAFETY: the address is reserved in LP SRAM for the region, and the
    // region is made only of atomics
    let region: &'static SharedRegion = unsafe { &*(SHARED_REGION_ADDR as *const SharedRegion) };

    let caps = HalCapabilities::new(
        LpUartPort { uart },
        DirectionPin { pin, high: false },
        LoopClock { now_ms: 0 },
        HpWake,
        config.timing.turnaround_ms,
    )
    .with_uart_config(&config.uart);

    LowPowerAgent::new(caps, config.timing, region).run()
}
