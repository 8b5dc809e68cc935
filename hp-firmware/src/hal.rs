//! Host-provided hardware access
//!
//! The host firmware owns the UART and the direction pin. It passes
//! them in as a table of C function pointers sharing one context
//! pointer; the wrappers below turn that table into `hcp-hal` drivers.

use core::ffi::c_void;

use hcp_hal::{Clock, OutputPin, UartRx, UartTx};

/// Function table supplied by the host
///
/// Every function receives `ctx` as its first argument. `log` may be
/// null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HcpHalC {
    pub ctx: *mut c_void,
    /// Read up to `len` bytes without blocking; returns the count or a
    /// negative error
    pub read_uart: extern "C" fn(ctx: *mut c_void, buf: *mut u8, len: usize) -> i32,
    /// Write `len` bytes and wait until they are sent; returns the count
    /// written or a negative error
    pub write_uart: extern "C" fn(ctx: *mut c_void, buf: *const u8, len: usize) -> i32,
    /// Drive the RS-485 direction pin, true to transmit
    pub set_tx_enable: extern "C" fn(ctx: *mut c_void, enable: bool),
    pub now_ms: extern "C" fn(ctx: *mut c_void) -> u32,
    pub sleep_ms: extern "C" fn(ctx: *mut c_void, ms: u32),
    /// Emit one log line (not NUL-terminated)
    pub log: Option<extern "C" fn(ctx: *mut c_void, msg: *const u8, len: usize)>,
}

/// Errors reported by the host UART functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostUartError {
    /// Host returned a negative status
    Failed(i32),
    /// Fewer bytes written than requested
    ShortWrite { written: usize, expected: usize },
}

/// UART half of the host table
#[derive(Debug, Clone, Copy)]
pub struct HostUart(HcpHalC);

impl HostUart {
    pub fn new(table: HcpHalC) -> Self {
        Self(table)
    }
}

impl UartTx for HostUart {
    type Error = HostUartError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), HostUartError> {
        let written = (self.0.write_uart)(self.0.ctx, data.as_ptr(), data.len());
        let written = usize::try_from(written).map_err(|_| HostUartError::Failed(written))?;
        if written != data.len() {
            return Err(HostUartError::ShortWrite {
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), HostUartError> {
        // write_uart only returns once the bytes are out
        Ok(())
    }
}

impl UartRx for HostUart {
    type Error = HostUartError;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HostUartError> {
        let read = (self.0.read_uart)(self.0.ctx, buf.as_mut_ptr(), buf.len());
        let read = usize::try_from(read).map_err(|_| HostUartError::Failed(read))?;
        Ok(read.min(buf.len()))
    }
}

/// Direction pin half of the host table
#[derive(Debug, Clone, Copy)]
pub struct HostDirectionPin {
    table: HcpHalC,
    high: bool,
}

impl HostDirectionPin {
    pub fn new(table: HcpHalC) -> Self {
        Self { table, high: false }
    }
}

impl OutputPin for HostDirectionPin {
    fn set_high(&mut self) {
        (self.table.set_tx_enable)(self.table.ctx, true);
        self.high = true;
    }

    fn set_low(&mut self) {
        (self.table.set_tx_enable)(self.table.ctx, false);
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Clock half of the host table
#[derive(Debug, Clone, Copy)]
pub struct HostClock(HcpHalC);

impl HostClock {
    pub fn new(table: HcpHalC) -> Self {
        Self(table)
    }
}

impl Clock for HostClock {
    fn now_ms(&self) -> u32 {
        (self.0.now_ms)(self.0.ctx)
    }

    fn delay_ms(&mut self, ms: u32) {
        (self.0.sleep_ms)(self.0.ctx, ms);
    }
}
