//! Configuration type definitions

use hcp_hal::UartConfig;

use super::hardware::{ChipVariant, CoreMode, PinConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default time to wait for a poll response
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 200;

/// Default consecutive timeouts before the link is reported down
pub const DEFAULT_DISCONNECT_THRESHOLD: u8 = 3;

/// Default time the driver enable stays asserted after the last byte
pub const DEFAULT_TURNAROUND_MS: u32 = 2;

/// Default bus silence after which a partial frame is discarded
pub const DEFAULT_FRAME_GAP_MS: u32 = 10;

/// Default poll interval for the low-power agent
pub const LOW_POWER_POLL_INTERVAL_MS: u32 = 1000;

/// Default poll interval for the high-performance agent
pub const HIGH_PERFORMANCE_POLL_INTERVAL_MS: u32 = 500;

/// Configuration validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Low-power mode requested on a chip without a coprocessor
    LowPowerUnsupported,
    /// Poll interval of zero
    ZeroPollInterval,
    /// Response timeout not shorter than the poll interval
    TimeoutExceedsInterval,
    /// Disconnect threshold of zero
    ZeroDisconnectThreshold,
    /// UART line settings differ from what the drive speaks
    UnsupportedUart,
    /// Driver enable pin shares a UART pin
    PinConflict,
}

/// Bus timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Time between poll transactions
    pub poll_interval_ms: u32,
    /// Time to wait for a poll response
    pub response_timeout_ms: u32,
    /// Consecutive timeouts before the link is reported down
    pub disconnect_threshold: u8,
    /// Driver enable hold time after transmitting
    pub turnaround_ms: u32,
    /// Bus silence that ends a partial frame
    pub frame_gap_ms: u32,
}

impl TimingConfig {
    /// Timing defaults for an agent running in `mode`
    pub const fn for_mode(mode: CoreMode) -> Self {
        let poll_interval_ms = match mode {
            CoreMode::LowPower => LOW_POWER_POLL_INTERVAL_MS,
            CoreMode::HighPerformance => HIGH_PERFORMANCE_POLL_INTERVAL_MS,
        };
        Self {
            poll_interval_ms,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            disconnect_threshold: DEFAULT_DISCONNECT_THRESHOLD,
            turnaround_ms: DEFAULT_TURNAROUND_MS,
            frame_gap_ms: DEFAULT_FRAME_GAP_MS,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.response_timeout_ms >= self.poll_interval_ms {
            return Err(ConfigError::TimeoutExceedsInterval);
        }
        if self.disconnect_threshold == 0 {
            return Err(ConfigError::ZeroDisconnectThreshold);
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::for_mode(CoreMode::LowPower)
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeConfig {
    /// Execution context that owns the bus
    pub mode: CoreMode,
    pub timing: TimingConfig,
    #[cfg_attr(feature = "serde", serde(skip, default = "UartConfig::hcp"))]
    pub uart: UartConfig,
    pub pins: PinConfig,
}

impl BridgeConfig {
    /// Defaults for the given mode
    pub fn new(mode: CoreMode) -> Self {
        Self {
            mode,
            timing: TimingConfig::for_mode(mode),
            uart: UartConfig::hcp(),
            pins: PinConfig::default(),
        }
    }

    /// Configuration for `chip`, honouring an explicit mode request
    pub fn for_chip(requested: Option<CoreMode>, chip: ChipVariant) -> Result<Self, ConfigError> {
        let mode = Self::resolve_mode(requested, chip)?;
        Ok(Self::new(mode))
    }

    /// Pick the execution context
    ///
    /// Without a request the coprocessor is used whenever the chip has
    /// one.
    pub fn resolve_mode(
        requested: Option<CoreMode>,
        chip: ChipVariant,
    ) -> Result<CoreMode, ConfigError> {
        match requested {
            Some(CoreMode::LowPower) if !chip.has_lp_core() => {
                Err(ConfigError::LowPowerUnsupported)
            }
            Some(mode) => Ok(mode),
            None if chip.has_lp_core() => Ok(CoreMode::LowPower),
            None => Ok(CoreMode::HighPerformance),
        }
    }

    /// Check the configuration against the target chip
    pub fn validate(&self, chip: ChipVariant) -> Result<(), ConfigError> {
        if self.mode == CoreMode::LowPower && !chip.has_lp_core() {
            return Err(ConfigError::LowPowerUnsupported);
        }
        self.timing.validate()?;
        if self.uart != UartConfig::hcp() {
            return Err(ConfigError::UnsupportedUart);
        }
        if let Some(de) = self.pins.flow_control {
            if de == self.pins.tx || de == self.pins.rx {
                return Err(ConfigError::PinConflict);
            }
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(CoreMode::LowPower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcp_hal::uart::Parity;

    #[test]
    fn test_mode_defaults() {
        assert_eq!(TimingConfig::for_mode(CoreMode::LowPower).poll_interval_ms, 1000);
        assert_eq!(TimingConfig::for_mode(CoreMode::HighPerformance).poll_interval_ms, 500);

        let timing = TimingConfig::default();
        assert_eq!(timing.response_timeout_ms, 200);
        assert_eq!(timing.disconnect_threshold, 3);
    }

    #[test]
    fn test_resolve_mode() {
        assert_eq!(
            BridgeConfig::resolve_mode(None, ChipVariant::Esp32C6),
            Ok(CoreMode::LowPower)
        );
        assert_eq!(
            BridgeConfig::resolve_mode(None, ChipVariant::Esp32),
            Ok(CoreMode::HighPerformance)
        );
        assert_eq!(
            BridgeConfig::resolve_mode(Some(CoreMode::HighPerformance), ChipVariant::Esp32C6),
            Ok(CoreMode::HighPerformance)
        );
        assert_eq!(
            BridgeConfig::resolve_mode(Some(CoreMode::LowPower), ChipVariant::Esp32S3),
            Err(ConfigError::LowPowerUnsupported)
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::for_chip(None, ChipVariant::Esp32C6).unwrap();
        assert_eq!(config.validate(ChipVariant::Esp32C6), Ok(()));

        let config = BridgeConfig::for_chip(None, ChipVariant::Esp32).unwrap();
        assert_eq!(config.mode, CoreMode::HighPerformance);
        assert_eq!(config.validate(ChipVariant::Esp32), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_timing() {
        let mut config = BridgeConfig::new(CoreMode::HighPerformance);
        config.timing.poll_interval_ms = 0;
        assert_eq!(config.validate(ChipVariant::Esp32), Err(ConfigError::ZeroPollInterval));

        config.timing.poll_interval_ms = 150;
        assert_eq!(
            config.validate(ChipVariant::Esp32),
            Err(ConfigError::TimeoutExceedsInterval)
        );

        config.timing.poll_interval_ms = 500;
        config.timing.disconnect_threshold = 0;
        assert_eq!(
            config.validate(ChipVariant::Esp32),
            Err(ConfigError::ZeroDisconnectThreshold)
        );
    }

    #[test]
    fn test_validate_rejects_uart_and_pins() {
        let mut config = BridgeConfig::new(CoreMode::HighPerformance);
        config.uart.parity = Parity::None;
        assert_eq!(config.validate(ChipVariant::Esp32), Err(ConfigError::UnsupportedUart));

        let mut config = BridgeConfig::new(CoreMode::HighPerformance);
        config.pins = PinConfig::new(17, 16).with_flow_control(16);
        assert_eq!(config.validate(ChipVariant::Esp32), Err(ConfigError::PinConflict));
    }

    #[test]
    fn test_validate_rejects_lp_on_unsupported_chip() {
        let config = BridgeConfig::new(CoreMode::LowPower);
        assert_eq!(
            config.validate(ChipVariant::Esp32C3),
            Err(ConfigError::LowPowerUnsupported)
        );
    }
}
