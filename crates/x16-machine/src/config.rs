//! Machine configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use ym2151::ChipConfig;

use crate::error::{MachineError, Result};

/// Highest supported warp factor
pub const MAX_WARP_FACTOR: u8 = 9;

/// Highest CPU clock whose rate in Hz still fits a `u32`
pub const MAX_CPU_MHZ: u32 = u32::MAX / 1_000_000;

/// Settings consumed by [`crate::Machine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// CPU clock in MHz
    pub cpu_mhz: u32,
    /// Warp factor at startup (0 = real time, up to 9)
    pub warp_factor: u8,
    /// Step the serial bus
    pub enable_serial: bool,
    /// Forward the YM2151 IRQ output to the CPU
    pub ym_irq: bool,
    /// Drop YM2151 writes issued while the chip is busy
    pub ym_strict: bool,
    /// Dump the machine when the CPU reaches the halt address
    pub save_on_exit: bool,
    /// Include CPU registers in dumps
    pub dump_cpu: bool,
    /// Include main RAM in dumps
    pub dump_ram: bool,
    /// Include banked RAM in dumps
    pub dump_bank: bool,
    /// Include video memory in dumps
    pub dump_vram: bool,
    /// Directory receiving `dump.bin` / `dump-N.bin`
    pub dump_dir: PathBuf,
    /// Host audio sample rate in Hz
    pub audio_sample_rate: u32,
    /// Frames per host audio buffer
    pub audio_buffer_frames: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            cpu_mhz: 8,
            warp_factor: 0,
            enable_serial: false,
            ym_irq: false,
            ym_strict: false,
            save_on_exit: true,
            dump_cpu: true,
            dump_ram: true,
            dump_bank: true,
            dump_vram: false,
            dump_dir: PathBuf::from("."),
            audio_sample_rate: 48_000,
            audio_buffer_frames: 512,
        }
    }
}

impl MachineConfig {
    /// Reject settings the machine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cpu_mhz == 0 {
            return Err(MachineError::Config("CPU clock must be non-zero".into()));
        }
        if self.cpu_mhz > MAX_CPU_MHZ {
            return Err(MachineError::Config(format!(
                "CPU clock {} MHz out of range (1-{MAX_CPU_MHZ})",
                self.cpu_mhz
            )));
        }
        if self.warp_factor > MAX_WARP_FACTOR {
            return Err(MachineError::Config(format!(
                "warp factor {} out of range (0-{MAX_WARP_FACTOR})",
                self.warp_factor
            )));
        }
        if self.audio_sample_rate == 0 || self.audio_buffer_frames == 0 {
            return Err(MachineError::Config(
                "audio sample rate and buffer size must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// CPU clock in Hz (saturates above [`MAX_CPU_MHZ`], which `validate` rejects)
    pub fn cpu_clock_hz(&self) -> u32 {
        self.cpu_mhz.saturating_mul(1_000_000)
    }

    /// YM2151 settings derived from this configuration
    pub fn chip_config(&self) -> ChipConfig {
        ChipConfig {
            cpu_clock_hz: self.cpu_clock_hz(),
            strict_busy: self.ym_strict,
            irq_enabled: self.ym_irq,
            ..ChipConfig::default()
        }
    }
}
