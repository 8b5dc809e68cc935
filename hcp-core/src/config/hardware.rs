//! Hardware configuration types
//!
//! Chip selection and pin assignment for the bus transceiver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Chips the bridge is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChipVariant {
    Esp32,
    Esp32S2,
    Esp32S3,
    Esp32C3,
    Esp32C6,
    Esp32H2,
}

impl ChipVariant {
    /// Whether the chip has a low-power RISC-V core with its own UART
    pub const fn has_lp_core(self) -> bool {
        matches!(self, ChipVariant::Esp32C6)
    }
}

/// Which execution context runs the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoreMode {
    /// Coprocessor owns the UART; the application core may sleep
    LowPower,
    /// Application core owns the UART
    HighPerformance,
}

/// Transceiver pin assignment (GPIO numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// UART TX
    pub tx: u8,
    /// UART RX
    pub rx: u8,
    /// RS-485 driver enable, if the transceiver needs one
    pub flow_control: Option<u8>,
}

impl PinConfig {
    /// Create a pin config for a transceiver with automatic direction
    pub const fn new(tx: u8, rx: u8) -> Self {
        Self {
            tx,
            rx,
            flow_control: None,
        }
    }

    /// Add a driver enable pin
    pub const fn with_flow_control(self, pin: u8) -> Self {
        Self {
            flow_control: Some(pin),
            ..self
        }
    }
}

impl Default for PinConfig {
    /// LP UART pins on the ESP32-C6, DE on GPIO2
    fn default() -> Self {
        Self::new(5, 4).with_flow_control(2)
    }
}
