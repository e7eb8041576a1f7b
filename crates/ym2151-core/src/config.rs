//! Chip interface configuration

use serde::{Deserialize, Serialize};

use crate::{Result, Ym2151Error, YM_CLOCK_HZ};

/// Host CPU clock the chip is prerendered against (Commander X16: 8 MHz)
pub const DEFAULT_CPU_CLOCK_HZ: u32 = 8_000_000;

/// Configuration for [`crate::Ym2151`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    /// YM2151 master clock in Hz
    pub clock_hz: u32,
    /// CPU clock driving [`crate::Ym2151::prerender`], in Hz
    pub cpu_clock_hz: u32,
    /// Drop (instead of queue) writes issued during a busy window
    pub strict_busy: bool,
    /// Forward the chip's IRQ output to the host
    pub irq_enabled: bool,
}

impl Default for ChipConfig {
    fn default() -> Self {
        ChipConfig {
            clock_hz: YM_CLOCK_HZ,
            cpu_clock_hz: DEFAULT_CPU_CLOCK_HZ,
            strict_busy: false,
            irq_enabled: false,
        }
    }
}

impl ChipConfig {
    /// Check that the clocks give a usable native sample rate
    pub fn validate(&self) -> Result<()> {
        if crate::native_sample_rate(self.clock_hz) == 0 {
            return Err(Ym2151Error::ConfigError(format!(
                "YM2151 clock {} Hz is too low",
                self.clock_hz
            )));
        }
        if self.cpu_clock_hz == 0 {
            return Err(Ym2151Error::ConfigError(
                "CPU clock must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
